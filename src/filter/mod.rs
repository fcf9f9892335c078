mod compile;
mod engine;
pub mod expr;

pub use compile::{compile_expression, CompiledExpression};
pub use engine::{FilterEngine, FilterOutcome, ResultField, ResultSpec};
pub use expr::{Expression, Mode};
