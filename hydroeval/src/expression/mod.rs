//! Variable substitution and sandboxed expression evaluation over
//! configuration trees.

pub mod cast;
pub mod sandbox;
pub mod tree;

pub use cast::Cast;
pub use tree::{process_expressions, Variables, DEFAULT_PROCESS_ITERATION_COUNT, DEFAULT_VARIABLES_KEY};
