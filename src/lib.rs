//! An in-process, in-memory tabular data engine for bulk analytical scans over wide,
//! row-heavy datasets: a thread-safe bump allocator, a self-describing binary table
//! format, and a parallel filter engine that compiles declarative boolean expressions
//! into predicates run across a worker pool.

pub mod block;
pub mod bstr;
pub mod config;
pub mod cursor;
pub mod error;
pub mod filter;
pub mod heap;
pub mod proxy;
pub mod table;
pub mod types;

pub use block::Block;
pub use config::EngineConfig;
pub use cursor::RowCursor;
pub use error::{EngineError, Result};
pub use filter::{FilterEngine, FilterOutcome, ResultField, ResultSpec};
pub use heap::Heap;
pub use proxy::{ProxyRowCursor, ProxyTable};
pub use table::{ColumnSpec, Table};
pub use types::{Number, TypeId};
