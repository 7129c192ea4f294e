//! Recoverable error conditions.
//!
//! Only the recoverable kinds from the error policy table are represented
//! here. Misconfiguration, JIT-unavailable, and verification failures are
//! fatal by design and are raised as `panic!`/`assert!` at the point of
//! violation instead of being threaded through a `Result` -- the subsystem
//! is meant for embedding in a trusted benchmark or inference driver, not
//! for surfacing user-facing diagnostics.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The object cache file for this tree shape and parameter set does not
    /// exist. Recover by recompiling from the in-memory tree.
    #[error("object cache miss: {path:?} not found")]
    CacheMiss { path: PathBuf },

    /// The object cache file exists but its companion tree file does not
    /// describe the same tree, or is otherwise unreadable. Recover by
    /// recompiling from the in-memory tree.
    #[error("object cache stale or unreadable: {path:?}")]
    CacheStale { path: PathBuf },

    /// Writing the freshly compiled object (or its tree descriptor) to disk
    /// failed. Recover by proceeding with the in-memory compilation; future
    /// runs will simply recompile.
    #[error("object cache write failed for {path:?}: {source}")]
    CacheIoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The system linker could not turn the cached or freshly emitted object
    /// into a loadable shared object.
    #[error("failed to link compiled object into a shared object: {0}")]
    LinkFailed(String),

    /// A compiled evaluator symbol could not be resolved from the linked
    /// shared object.
    #[error("failed to resolve symbol {symbol}: {source}")]
    SymbolResolution {
        symbol: String,
        #[source]
        source: libloading::Error,
    },
}
