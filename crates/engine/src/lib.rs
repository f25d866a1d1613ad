//! The reconciliation engine: admission, contract validation, and
//! per-workload dispatch (§4.3–§4.6, §4.8).

mod admission;
mod context;
mod engine;
mod error;
mod transitions;

pub mod testutil;

pub use admission::Admission;
pub use context::JobContext;
pub use engine::{Engine, JobCallback};
pub use error::{EngineError, SubmissionError};
