use derive_more::{Display, Error};

/// Typed failures of the island calling pipeline.
///
/// Public functions return `eyre::Result`; these values travel inside the report and can be
/// recovered with `report.downcast_ref::<Error>()`.
#[derive(Debug, Clone, PartialEq, Display, Error)]
pub enum Error {
    #[display("Malformed read {name:?} at {chrom}:{start}-{end}: end precedes start")]
    MalformedRecord {
        chrom: String,
        start: u64,
        end: u64,
        name: String,
    },
    #[display("Window size must be positive, got {value}")]
    InvalidWindowSize { value: i64 },
    #[display("Maximum gap must be non-negative, got {value}")]
    InvalidGap { value: i64 },
    #[display("Invalid index set: {reason}")]
    InvalidIndexSet { reason: String },
    #[display("Reads on {chrom} are not sorted: window {index} follows window {previous}")]
    UnsortedReads {
        chrom: String,
        previous: u64,
        index: u64,
    },
    #[display("Island {chrom}:{start}-{end} has no p-value")]
    Unscored { chrom: String, start: u64, end: u64 },
    #[display("Library size of {library} must be positive")]
    InvalidLibrarySize { library: String },
    #[display("Effective genome size must be positive")]
    InvalidGenomeSize,
    #[display("Invalid threshold: {reason}")]
    InvalidThreshold { reason: String },
}
