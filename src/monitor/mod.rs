pub mod batcher;
pub mod classifier;
pub mod controller;
mod loop_worker;
pub mod sampler;
pub mod types;

pub use batcher::{Batcher, FlushError};
pub use classifier::classify;
pub use controller::{MonitorController, MonitorError};
pub use sampler::Sampler;
pub use types::{ActivitySample, ProcessUsage, Productivity, SystemLoad};
