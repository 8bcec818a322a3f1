// Reads are BED6 records: https://samtools.github.io/hts-specs/BEDv1.pdf
//
// 1. seqid: chromosome name
// 2. start: u64, 0-based
// 3. end: u64, exclusive
// 4. name: free text
// 5. score: number
// 6. strand: [+|-|.]
//
// Coordinates are parsed as-is: end < start is reported downstream, where reads are ingested.
// Empty lines and `#`, `track`, `browser` headers are skipped.

mod reader;
mod record;
mod writer;

pub use reader::{parse, Reader};
pub use record::Bed6;
pub use writer::Writer;
