//! The error taxonomy for this crate.
//!
//! One [`EngineError`] per fallible public operation; every variant carries enough
//! context to build a useful message without the caller needing to unwind a stack trace.

use thiserror::Error;

use crate::types::TypeId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("allocation of {requested} bytes failed: {reason}")]
    AllocationFailure { requested: u32, reason: AllocationFailureReason },

    #[error("invalid block at address {address}: {reason}")]
    InvalidBlock { address: u32, reason: InvalidBlockReason },

    #[error("malformed table: {0}")]
    MalformedTable(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("out of bounds: {0}")]
    OutOfBounds(String),

    #[error("worker failed: {0}")]
    WorkerFailure(Box<EngineError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationFailureReason {
    InsufficientSpace,
    OversizedRequest,
    InvalidParameters,
}

impl std::fmt::Display for AllocationFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::InsufficientSpace => "insufficient free space in heap",
            Self::OversizedRequest => "request exceeds the heap's max allocation size",
            Self::InvalidParameters => "invalid allocation parameters",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidBlockReason {
    DoubleFree,
    ShrinkToZero,
    ForeignBlock,
}

impl std::fmt::Display for InvalidBlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::DoubleFree => "block is already free",
            Self::ShrinkToZero => "cannot shrink a block to zero bytes",
            Self::ForeignBlock => "block does not belong to this heap",
        };
        f.write_str(msg)
    }
}

impl EngineError {
    pub fn malformed_table(msg: impl Into<String>) -> Self {
        Self::MalformedTable(msg.into())
    }

    pub fn schema_mismatch(msg: impl Into<String>) -> Self {
        Self::SchemaMismatch(msg.into())
    }

    pub fn out_of_bounds(msg: impl Into<String>) -> Self {
        Self::OutOfBounds(msg.into())
    }

    pub fn unknown_column(name: &str) -> Self {
        Self::SchemaMismatch(format!("no column named `{name}`"))
    }

    pub fn unsupported_operation(op: &str, ty: TypeId) -> Self {
        Self::SchemaMismatch(format!("operation `{op}` is not supported on column type `{ty:?}`"))
    }

    pub fn unknown_type_index(idx: u32) -> Self {
        Self::MalformedTable(format!("unknown type index {idx}"))
    }

    pub fn into_worker_failure(self) -> Self {
        Self::WorkerFailure(Box::new(self))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
