//! Just-in-time specializing compiler for perfect binary decision trees.
//!
//! Given a fully populated tree of depth `D` whose internal nodes evaluate a
//! simple predicate over one feature of an input float vector, [`JitHost`]
//! generates native machine code that, given an input vector, returns the
//! terminal leaf index reached. The compiled code is meant to replace an
//! interpretive traversal on deep trees.

pub mod bitmap;
pub mod codegen;
pub mod driver;
pub mod error;
pub mod index;
pub mod jit;
pub mod tree;
pub mod variants;

pub use driver::CompiledTree;
pub use error::Error;
pub use jit::{JitConfig, JitHost};
pub use tree::{Comparator, DecisionTree, Op, TreeNode};
