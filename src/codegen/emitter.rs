//! Per-function IR construction: condition-vector assembly (§4.4), switch and
//! nested dispatch (§4.5), and the top-level per-subtree emitter (§4.6).

use cranelift_codegen::ir::condcodes::FloatCC;
use cranelift_codegen::ir::{
    types, AbiParam, Function, InstBuilder, MemFlags, Signature, TrapCode, UserFuncName,
};
use cranelift_codegen::isa::CallConv;
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext, Switch, Variable};
use cranelift_module::{FuncId, Linkage, Module, ModuleError};

use crate::bitmap::build_leaf_descriptors;
use crate::index::bit_offset_to_global_index;
use crate::tree::{level_of, Comparator, DecisionTree, Op};
use crate::variants::enumerate_variants;

use super::evaluator_symbol;

const EVAL_RESULT: Variable = Variable::from_u32(0);

/// Declares and defines the evaluator function rooted at `root`, which
/// descends `function_depth` levels via `function_depth / switch_depth`
/// nested condition-vector switches of `switch_depth` levels each.
pub(super) fn emit_subtree_evaluation(
    module: &mut dyn Module,
    tree: &DecisionTree,
    root: u64,
    function_depth: u32,
    switch_depth: u32,
) -> Result<FuncId, ModuleError> {
    let pointer_type = module.target_config().pointer_type();

    let mut sig = Signature::new(CallConv::SystemV);
    sig.params.push(AbiParam::new(pointer_type));
    sig.returns.push(AbiParam::new(types::I64));

    let symbol = evaluator_symbol(root);
    let func_id = module.declare_function(&symbol, Linkage::Export, &sig)?;

    let mut func = Function::with_name_signature(UserFuncName::user(0, func_id.as_u32()), sig);

    let mut ln_sig = Signature::new(CallConv::SystemV);
    ln_sig.params.push(AbiParam::new(types::F32));
    ln_sig.returns.push(AbiParam::new(types::F32));
    let ln_func_id = module.declare_function("logf", Linkage::Import, &ln_sig)?;

    let mut builder_ctx = FunctionBuilderContext::new();
    {
        let mut builder = FunctionBuilder::new(&mut func, &mut builder_ctx);
        let ln_ref = module.declare_func_in_func(ln_func_id, builder.func);

        let entry = builder.create_block();
        builder.append_block_params_for_function_params(entry);
        builder.switch_to_block(entry);
        builder.seal_block(entry);
        let input_ptr = builder.block_params(entry)[0];

        builder.declare_var(EVAL_RESULT, types::I64);

        let return_block = builder.create_block();

        let total_switch_levels = function_depth / switch_depth;
        emit_switch_level(
            &mut builder,
            tree,
            root,
            level_of(root),
            switch_depth,
            total_switch_levels,
            input_ptr,
            return_block,
            ln_ref,
        );

        builder.switch_to_block(return_block);
        builder.seal_block(return_block);
        let result = builder.use_var(EVAL_RESULT);
        builder.ins().return_(&[result]);

        builder.finalize();
    }

    let mut ctx = cranelift_codegen::Context::for_function(func);
    module.define_function(func_id, &mut ctx)?;

    Ok(func_id)
}

/// Emits one condition-vector switch of `switch_depth` levels rooted at
/// `root` (global level `root_level`) into the block the builder is
/// currently positioned at, then recurses `switches_remaining - 1` further
/// times inside each resulting case block, or stores the terminal leaf index
/// and jumps to `return_block` once no switch levels remain (§4.5).
#[allow(clippy::too_many_arguments)]
fn emit_switch_level(
    builder: &mut FunctionBuilder,
    tree: &DecisionTree,
    root: u64,
    root_level: u32,
    switch_depth: u32,
    switches_remaining: u32,
    input_ptr: cranelift_codegen::ir::Value,
    return_block: cranelift_codegen::ir::Block,
    ln_ref: cranelift_codegen::ir::FuncRef,
) {
    let num_internal = (1u64 << switch_depth) - 1;

    // §4.4: assemble the condition vector for this switch's internal nodes.
    let mut condition = builder.ins().iconst(types::I64, 0);
    for bit_offset in 0..num_internal {
        let global = bit_offset_to_global_index(root, root_level, bit_offset);
        let node = tree.node(global);

        let byte_offset = (node.feature_idx * std::mem::size_of::<f32>()) as i32;
        let raw = builder
            .ins()
            .load(types::F32, MemFlags::trusted(), input_ptr, byte_offset);
        let value = match node.op {
            Op::Bypass => raw,
            Op::Sqrt => builder.ins().sqrt(raw),
            Op::Ln => {
                let call = builder.ins().call(ln_ref, &[raw]);
                builder.inst_results(call)[0]
            }
        };

        let bias = builder.ins().f32const(node.bias);
        let cc = match node.comparator {
            Comparator::LessThan => FloatCC::LessThan,
            Comparator::GreaterThan => FloatCC::GreaterThan,
        };
        let outcome = builder.ins().fcmp(cc, value, bias);
        let widened = builder.ins().uextend(types::I64, outcome);
        let shifted = builder.ins().ishl_imm(widened, bit_offset as i64);
        condition = builder.ins().bor(condition, shifted);
    }

    // §4.5: one switch, one target block per leaf descriptor, 2^v case
    // labels per descriptor (the variants of §4.3).
    let descriptors = build_leaf_descriptors(switch_depth);
    let mut switch = Switch::new();
    let mut targets = Vec::with_capacity(descriptors.len());
    for descriptor in &descriptors {
        let block = builder.create_block();
        targets.push((descriptor, block));
        for variant in enumerate_variants(descriptor, num_internal) {
            switch.set_entry(variant as u128, block);
        }
    }

    let default_block = builder.create_block();
    switch.emit(builder, condition, default_block);

    builder.switch_to_block(default_block);
    builder.seal_block(default_block);
    // Unreachable by construction: every representable condition-vector
    // value is covered by exactly one case set (§9 Design Notes).
    builder.ins().trap(TrapCode::UnreachableCodeReached);

    for (descriptor, block) in targets {
        builder.switch_to_block(block);
        builder.seal_block(block);

        let leaf_global = bit_offset_to_global_index(root, root_level, descriptor.local_offset);
        if switches_remaining > 1 {
            emit_switch_level(
                builder,
                tree,
                leaf_global,
                level_of(leaf_global),
                switch_depth,
                switches_remaining - 1,
                input_ptr,
                return_block,
                ln_ref,
            );
        } else {
            let leaf_value = builder.ins().iconst(types::I64, leaf_global as i64);
            builder.def_var(EVAL_RESULT, leaf_value);
            builder.ins().jump(return_block, &[]);
        }
    }
}
