pub mod config;
pub mod error;
pub mod logging;

// Collection engine
pub mod artifact;
pub mod collect;
pub mod correlate;
pub mod mock;
pub mod normalize;
pub mod quality;
pub mod retry;
pub mod retry_queue;
pub mod service;
pub mod store;
pub mod upstream;
