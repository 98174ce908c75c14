//! Failure classification, per-class backoff and the suspend collaborator.
//!
//! The upstream fetcher and the mock failure path share these pieces so that
//! both walk the same retry schedule and can be run with zero real waiting
//! under test.

mod classify;
mod error;
mod policy;
mod sleep;

pub use classify::{classify, classify_status, Classification, Outcome};
pub use error::TransportError;
pub use policy::{Backoff, BackoffPolicy, FailureClass, RetryDecision, TransportKind};
pub use sleep::{FastSleeper, RecordingSleeper, Sleeper, TokioSleeper};
