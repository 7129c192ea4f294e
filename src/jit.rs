//! JIT host: owns the codegen module, submits it to Cranelift, manages the
//! on-disk object cache keyed by tree shape and codegen parameters, and
//! resolves evaluator symbols to callable addresses (§4.7).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use cranelift_codegen::isa::TargetIsa;
use cranelift_module::Module;
use cranelift_object::{ObjectBuilder, ObjectModule};
use once_cell::sync::OnceCell;

use crate::codegen::{self, evaluator_roots};
use crate::driver::CompiledTree;
use crate::error::Error;
use crate::tree::DecisionTree;

/// Parameters governing compilation: `featureCount`, `functionDepth`,
/// `switchDepth`, and the directory the object cache lives in (§6, §9.2).
#[derive(Clone, Debug)]
pub struct JitConfig {
    pub feature_count: usize,
    pub function_depth: u32,
    pub switch_depth: u32,
    pub cache_dir: PathBuf,
}

impl JitConfig {
    /// Builds a config caching in the current directory. Panics on
    /// Misconfiguration (§7): `function_depth`/`switch_depth` must be
    /// positive and `function_depth` must be a multiple of `switch_depth`.
    pub fn new(feature_count: usize, function_depth: u32, switch_depth: u32) -> Self {
        Self::with_cache_dir(feature_count, function_depth, switch_depth, PathBuf::from("."))
    }

    pub fn with_cache_dir(
        feature_count: usize,
        function_depth: u32,
        switch_depth: u32,
        cache_dir: PathBuf,
    ) -> Self {
        assert!(feature_count > 0, "feature_count must be positive");
        assert!(function_depth > 0, "function_depth must be positive");
        assert!(switch_depth > 0, "switch_depth must be positive");
        assert!(
            switch_depth <= 6,
            "switchDepth {switch_depth} would need a {}-bit condition vector; the widest \
             supported word is 64 bits (switchDepth <= 6)",
            (1u32 << switch_depth) - 1
        );
        assert_eq!(
            function_depth % switch_depth,
            0,
            "functionDepth {function_depth} must be a multiple of switchDepth {switch_depth}"
        );
        Self {
            feature_count,
            function_depth,
            switch_depth,
            cache_dir,
        }
    }

    fn tree_file_name(&self, depth: u32) -> String {
        format!("tree_d{depth}_f{}.t", self.feature_count)
    }

    fn obj_file_name(&self, depth: u32) -> String {
        format!(
            "tree_d{depth}_f{}_fd{}_sd{}.o",
            self.feature_count, self.function_depth, self.switch_depth
        )
    }
}

/// Resolves (and memoizes, per §5/§9.3) the host's native target ISA.
/// Process-wide native-target initialization is expensive and must not be
/// re-entered concurrently; repeated lookups reuse the same description.
fn native_isa() -> Arc<dyn TargetIsa> {
    static NATIVE_ISA: OnceCell<Arc<dyn TargetIsa>> = OnceCell::new();
    NATIVE_ISA
        .get_or_init(|| {
            let mut flag_builder = cranelift_codegen::settings::builder();
            flag_builder
                .set("is_pic", "true")
                .expect("is_pic is a valid cranelift setting");
            let isa_builder = cranelift_native::builder()
                .unwrap_or_else(|msg| panic!("host machine is not supported by Cranelift: {msg}"));
            isa_builder
                .finish(cranelift_codegen::settings::Flags::new(flag_builder))
                .unwrap_or_else(|err| panic!("failed to construct target ISA: {err}"))
        })
        .clone()
}

/// Owns the compile-time machinery. [`JitHost::compile`] is the sole entry
/// point; it produces a [`CompiledTree`] holding the resolved evaluators.
pub struct JitHost;

impl JitHost {
    /// Compiles `tree` under `config`, consulting (and, on a miss,
    /// populating) the on-disk object cache described in §4.7/§6.
    pub fn compile(tree: &DecisionTree, config: &JitConfig) -> Result<CompiledTree, Error> {
        let tree_file = config.cache_dir.join(config.tree_file_name(tree.depth()));
        let obj_file = config.cache_dir.join(config.obj_file_name(tree.depth()));

        let obj_path = match Self::validate_cache(&tree_file, &obj_file, tree) {
            Ok(()) => {
                log::info!("object cache hit: {}", obj_file.display());
                obj_file
            }
            Err(reason) => {
                log::info!("object cache miss ({reason}); recompiling");
                let bytes = Self::emit_object(tree, config)?;
                match Self::write_cache(&tree_file, &obj_file, tree, &bytes) {
                    Ok(()) => obj_file,
                    Err(err) => {
                        log::warn!("{err}; proceeding without a persisted cache entry");
                        Self::spill_to_temp(&bytes)?
                    }
                }
            }
        };

        let library_path = Self::link_shared_object(&obj_path)?;
        // Safety: the shared object was just produced by our own emitter and
        // contains no destructors or side-effecting initializers.
        let library = unsafe {
            libloading::Library::new(&library_path).map_err(|source| Error::SymbolResolution {
                symbol: library_path.display().to_string(),
                source,
            })?
        };

        let mut evaluators = HashMap::new();
        for root in evaluator_roots(tree.depth(), config.function_depth) {
            let symbol = codegen::evaluator_symbol(root);
            let name = format!("{symbol}\0");
            // Safety: the symbol's signature matches the evaluator ABI
            // (§6): `extern "C" fn(*const f32) -> i64`, emitted by us.
            let raw_fn: unsafe extern "C" fn(*const f32) -> i64 = unsafe {
                let sym = library
                    .get::<unsafe extern "C" fn(*const f32) -> i64>(name.as_bytes())
                    .map_err(|source| Error::SymbolResolution {
                        symbol: symbol.clone(),
                        source,
                    })?;
                *sym
            };
            evaluators.insert(root, raw_fn);
        }

        log::info!(
            "compiled {} evaluators for tree of depth {}",
            evaluators.len(),
            tree.depth()
        );

        Ok(CompiledTree::new(
            tree.num_internal(),
            tree.num_total(),
            library,
            evaluators,
        ))
    }

    /// Returns `Ok(())` if a valid cache entry is present, or the
    /// [`Error::CacheMiss`]/[`Error::CacheStale`] describing why it isn't
    /// (§7). Both are recoverable: the caller falls back to recompiling.
    fn validate_cache(tree_file: &Path, obj_file: &Path, tree: &DecisionTree) -> Result<(), Error> {
        if !obj_file.exists() {
            return Err(Error::CacheMiss {
                path: obj_file.to_path_buf(),
            });
        }
        let recorded = fs::read(tree_file).map_err(|_| Error::CacheStale {
            path: tree_file.to_path_buf(),
        })?;
        if recorded != tree.fingerprint() {
            return Err(Error::CacheStale {
                path: tree_file.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Builds the codegen module fresh from the in-memory tree and emits it
    /// as a native object (§4.7).
    fn emit_object(tree: &DecisionTree, config: &JitConfig) -> Result<Vec<u8>, Error> {
        let isa = native_isa();
        let builder = ObjectBuilder::new(
            isa,
            "dtree-jit-module",
            cranelift_module::default_libcall_names(),
        )
        .map_err(|err| Error::LinkFailed(format!("failed to construct object module: {err}")))?;
        let mut module = ObjectModule::new(builder);

        codegen::emit_all_evaluators(&mut module, tree, config.function_depth, config.switch_depth)
            .map_err(|err| Error::LinkFailed(format!("codegen failed: {err}")))?;

        let product = module.finish();
        product
            .emit()
            .map_err(|err| Error::LinkFailed(format!("failed to emit object bytes: {err}")))
    }

    fn write_cache(
        tree_file: &Path,
        obj_file: &Path,
        tree: &DecisionTree,
        bytes: &[u8],
    ) -> Result<(), Error> {
        fs::write(tree_file, tree.fingerprint()).map_err(|source| Error::CacheIoError {
            path: tree_file.to_path_buf(),
            source,
        })?;
        fs::write(obj_file, bytes).map_err(|source| Error::CacheIoError {
            path: obj_file.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    fn spill_to_temp(bytes: &[u8]) -> Result<PathBuf, Error> {
        let path = std::env::temp_dir().join(format!(
            "dtree-jit-{}-{}.o",
            std::process::id(),
            bytes.len()
        ));
        fs::write(&path, bytes).map_err(|source| Error::CacheIoError {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Links `obj_path` into a loadable shared object via the system C
    /// compiler (overridable with `CC`), returning the shared object's path.
    fn link_shared_object(obj_path: &Path) -> Result<PathBuf, Error> {
        let dylib_path = obj_path.with_extension(std::env::consts::DLL_EXTENSION);
        let compiler = std::env::var("CC").unwrap_or_else(|_| "cc".to_string());

        log::debug!("linking {} -> {}", obj_path.display(), dylib_path.display());
        let status = Command::new(&compiler)
            .arg("-shared")
            .arg("-o")
            .arg(&dylib_path)
            .arg(obj_path)
            .status()
            .map_err(|err| Error::LinkFailed(format!("failed to invoke `{compiler}`: {err}")))?;

        if !status.success() {
            return Err(Error::LinkFailed(format!("`{compiler}` exited with {status}")));
        }
        Ok(dylib_path)
    }
}
