pub use config::Config;
pub use error::Error;
pub use result::{DiffHarvest, Harvest};
pub use sicer::{Sample, Sicer};

pub mod background;
pub mod compaction;
pub mod config;
pub mod diff;
mod engine;
mod error;
pub mod fdr;
pub mod island;
pub mod read;
pub mod result;
pub mod scoring;
mod sicer;
pub mod stats;
pub mod track;
pub mod window;
mod worker;
mod workload;
