//! CLI command handlers, one file per command.

mod collect;
mod match_rate;
mod quality;
mod records;
mod retry_queue;
mod run_status;

pub use collect::{run_collect, CollectArgs};
pub use match_rate::run_match;
pub use quality::run_quality;
pub use records::run_records;
pub use retry_queue::run_retry_queue;
pub use run_status::run_run_status;
