pub mod ast;
pub mod call_graph;
pub mod reflection;
pub mod transform;
pub mod ty;

mod core;

pub use self::core::*;
