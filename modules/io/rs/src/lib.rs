pub mod bed;
pub mod compression;
pub mod tsv;
pub mod wig;
mod traits;

pub use traits::{ReadRecord, WriteRecord};
