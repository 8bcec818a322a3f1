use ahash::AHashMap;
#[cfg(feature = "bitcode")]
use bitcode::{Decode, Encode};
use derive_getters::Dissolve;
use derive_more::Constructor;
use eyre::Result;

use isle_core_rs::loc::Orientation;
use isle_io_rs::bed::Bed6;

use crate::compaction;
use crate::error::Error;
use crate::island::Island;

/// Aligned read as loaded from the input.
#[derive(Clone, PartialEq, Debug, Default, Dissolve, Constructor)]
pub struct Read {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub name: String,
    pub score: f64,
    pub strand: Orientation,
}

impl From<Bed6> for Read {
    fn from(record: Bed6) -> Self {
        let (seqid, start, end, name, score, orientation) = record.dissolve();
        Self::new(seqid, start, end, name, score, orientation)
    }
}

/// The single coordinate a read is attributed to.
#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum TagPosition {
    /// Read start, regardless of the strand.
    #[default]
    Start,
    /// Estimated fragment center: half a fragment downstream of the 5' end.
    Shifted { fragment_size: u64 },
}

impl TagPosition {
    pub fn of(&self, read: &Read) -> u64 {
        match *self {
            TagPosition::Start => read.start,
            TagPosition::Shifted { fragment_size } => {
                // Half of the fragment, rounded half to even
                let half = fragment_size / 2;
                let shift = if fragment_size % 2 == 1 && half % 2 == 1 {
                    half + 1
                } else {
                    half
                };

                match read.strand {
                    Orientation::Forward => read.start + shift,
                    Orientation::Reverse => read.end.saturating_sub(1).saturating_sub(shift),
                    Orientation::Dual => read.start,
                }
            }
        }
    }

    /// Whether the positions follow the (start, end) order of the reads.
    pub fn preserves_order(&self) -> bool {
        matches!(self, TagPosition::Start)
    }
}

/// Reads grouped by chromosome, in the order chromosomes first appear in the input.
/// Within a chromosome reads are sorted by (start, end), ties keep the input order.
#[derive(Clone, Debug, Default)]
pub struct ReadStore {
    index: AHashMap<String, usize>,
    chroms: Vec<String>,
    reads: Vec<Vec<Read>>,
    redundant: usize,
}

impl ReadStore {
    pub fn builder() -> ReadStoreBuilder {
        ReadStoreBuilder::default()
    }

    pub fn new(reads: impl IntoIterator<Item = Read>) -> Result<Self> {
        Self::builder().add_reads(reads)?.build()
    }

    /// Total number of stored reads, i.e. the library size.
    pub fn len(&self) -> usize {
        self.reads.iter().map(|x| x.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.reads.iter().all(|x| x.is_empty())
    }

    pub fn chroms(&self) -> &[String] {
        &self.chroms
    }

    /// Reads on the chromosome, empty if the chromosome is unknown.
    pub fn get(&self, chrom: &str) -> &[Read] {
        match self.index.get(chrom) {
            Some(&ind) => &self.reads[ind],
            None => &[],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Read])> {
        self.chroms
            .iter()
            .zip(self.reads.iter())
            .map(|(chrom, reads)| (chrom.as_str(), reads.as_slice()))
    }

    /// Rightmost read end on the chromosome.
    pub fn extent(&self, chrom: &str) -> u64 {
        self.get(chrom).iter().map(|x| x.end).max().unwrap_or(0)
    }

    /// Number of reads dropped as redundant copies while building the store.
    pub fn redundant(&self) -> usize {
        self.redundant
    }

    /// Sorted tag positions of the reads on the chromosome.
    pub fn tag_positions(&self, chrom: &str, tags: TagPosition) -> Vec<u64> {
        let mut positions = self
            .get(chrom)
            .iter()
            .map(|x| tags.of(x))
            .collect::<Vec<_>>();
        if !tags.preserves_order() {
            positions.sort_unstable();
        }
        positions
    }
}

impl ReadStore {
    /// Reads whose tag position falls inside any of the islands, as a new store.
    pub fn within<'a>(
        &self,
        islands: impl IntoIterator<Item = &'a Island>,
        tags: TagPosition,
    ) -> Result<ReadStore> {
        let mut spans: AHashMap<&str, Vec<(u64, u64)>> = AHashMap::new();
        for island in islands {
            spans
                .entry(island.chrom.as_ref())
                .or_default()
                .push((island.start, island.end));
        }
        // Disjoint spans sorted by start
        for spans in spans.values_mut() {
            spans.sort_unstable();
            spans.dedup_by(|next, prev| {
                let overlaps = next.0 <= prev.1;
                if overlaps {
                    prev.1 = prev.1.max(next.1);
                }
                overlaps
            });
        }

        let mut builder = ReadStore::builder();
        for (chrom, reads) in self.iter() {
            let Some(spans) = spans.get(chrom) else {
                continue;
            };
            for read in reads {
                let position = tags.of(read);
                let ind = spans.partition_point(|x| x.0 <= position);
                if ind > 0 && position < spans[ind - 1].1 {
                    builder.add_read(read.clone())?;
                }
            }
        }
        builder.build()
    }
}

/// Number of sorted positions falling into [start, end).
pub fn count_between(positions: &[u64], start: u64, end: u64) -> u32 {
    let first = positions.partition_point(|&x| x < start);
    let last = positions.partition_point(|&x| x < end);
    last.saturating_sub(first) as u32
}

#[derive(Clone, Debug, Default)]
pub struct ReadStoreBuilder {
    index: AHashMap<String, usize>,
    chroms: Vec<String>,
    reads: Vec<Vec<Read>>,
    redundancy_threshold: Option<u32>,
}

impl ReadStoreBuilder {
    /// Keep at most `threshold` reads with identical coordinates on each strand.
    pub fn set_redundancy_threshold(&mut self, threshold: Option<u32>) -> Result<&mut Self> {
        if threshold == Some(0) {
            return Err(Error::InvalidThreshold {
                reason: "redundancy threshold must keep at least one read".to_owned(),
            }
            .into());
        }
        self.redundancy_threshold = threshold;
        Ok(self)
    }

    pub fn add_read(&mut self, read: Read) -> Result<&mut Self> {
        if read.end < read.start {
            return Err(Error::MalformedRecord {
                chrom: read.chrom,
                start: read.start,
                end: read.end,
                name: read.name,
            }
            .into());
        }

        let ind = match self.index.get(&read.chrom) {
            Some(&ind) => ind,
            None => {
                let ind = self.chroms.len();
                self.index.insert(read.chrom.clone(), ind);
                self.chroms.push(read.chrom.clone());
                self.reads.push(Vec::new());
                ind
            }
        };
        self.reads[ind].push(read);
        Ok(self)
    }

    pub fn add_reads(&mut self, reads: impl IntoIterator<Item = Read>) -> Result<&mut Self> {
        for read in reads {
            self.add_read(read)?;
        }
        Ok(self)
    }

    /// Sort, deduplicate and freeze the reads. The builder is left empty and can be reused.
    pub fn build(&mut self) -> Result<ReadStore> {
        let mut reads = std::mem::take(&mut self.reads);
        let mut redundant = 0;
        let mut dropped = Vec::new();
        for chrom in reads.iter_mut() {
            chrom.sort_by_key(|x| (x.start, x.end));
            if let Some(threshold) = self.redundancy_threshold {
                redundant += remove_redundant(chrom, threshold, &mut dropped)?;
            }
        }
        if let (Some(threshold), true) = (self.redundancy_threshold, redundant > 0) {
            log::info!("Removed {redundant} reads with more than {threshold} identical copies per strand");
        }

        Ok(ReadStore {
            index: std::mem::take(&mut self.index),
            chroms: std::mem::take(&mut self.chroms),
            reads,
            redundant,
        })
    }
}

/// Drop reads with identical (start, end, strand) beyond the first `threshold` copies.
fn remove_redundant(
    reads: &mut Vec<Read>,
    threshold: u32,
    dropped: &mut Vec<usize>,
) -> Result<usize> {
    dropped.clear();

    let mut run_start = 0;
    while run_start < reads.len() {
        let (start, end) = (reads[run_start].start, reads[run_start].end);
        let mut copies = [0u32; 3];
        let mut cursor = run_start;
        while cursor < reads.len() && reads[cursor].start == start && reads[cursor].end == end {
            let slot = &mut copies[reads[cursor].strand as usize];
            *slot += 1;
            if *slot > threshold {
                dropped.push(cursor);
            }
            cursor += 1;
        }
        run_start = cursor;
    }

    compaction::retain_except(reads, dropped)?;
    Ok(dropped.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(chrom: &str, start: u64, end: u64, strand: Orientation) -> Read {
        Read::new(chrom.to_owned(), start, end, format!("{chrom}:{start}"), 0.0, strand)
    }

    fn coords(reads: &[Read]) -> Vec<(u64, u64)> {
        reads.iter().map(|x| (x.start, x.end)).collect()
    }

    #[test]
    fn test_grouping_and_order() -> Result<()> {
        let store = ReadStore::new([
            read("chr2", 500, 550, Orientation::Forward),
            read("chr1", 300, 350, Orientation::Forward),
            read("chr2", 100, 150, Orientation::Reverse),
            read("chr1", 300, 320, Orientation::Reverse),
            read("chr1", 10, 60, Orientation::Forward),
        ])?;

        assert_eq!(store.chroms(), ["chr2", "chr1"]);
        assert_eq!(store.len(), 5);
        assert_eq!(coords(store.get("chr2")), vec![(100, 150), (500, 550)]);
        assert_eq!(
            coords(store.get("chr1")),
            vec![(10, 60), (300, 320), (300, 350)]
        );
        assert!(store.get("chrM").is_empty());
        assert_eq!(store.extent("chr1"), 350);
        assert_eq!(store.extent("chrM"), 0);
        Ok(())
    }

    #[test]
    fn test_ties_keep_input_order() -> Result<()> {
        let mut first = read("chr1", 5, 10, Orientation::Forward);
        first.name = "first".into();
        let mut second = read("chr1", 5, 10, Orientation::Forward);
        second.name = "second".into();

        let store = ReadStore::new([second.clone(), first.clone()])?;
        assert_eq!(store.get("chr1"), [second, first]);
        Ok(())
    }

    #[test]
    fn test_malformed_read() {
        let err = ReadStore::new([
            read("chr1", 5, 10, Orientation::Forward),
            read("chr1", 10, 5, Orientation::Forward),
        ])
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::MalformedRecord { start: 10, end: 5, .. })
        ));

        // Zero-length reads are fine
        assert!(ReadStore::new([read("chr1", 7, 7, Orientation::Dual)]).is_ok());
    }

    #[test]
    fn test_redundancy_filter() -> Result<()> {
        let reads = [
            read("chr1", 0, 50, Orientation::Forward),
            read("chr1", 0, 50, Orientation::Forward),
            read("chr1", 0, 50, Orientation::Reverse),
            read("chr1", 0, 50, Orientation::Forward),
            read("chr1", 0, 60, Orientation::Forward),
            read("chr1", 20, 70, Orientation::Reverse),
            read("chr1", 20, 70, Orientation::Reverse),
            read("chr2", 0, 50, Orientation::Forward),
        ];

        let store = ReadStore::builder()
            .set_redundancy_threshold(Some(1))?
            .add_reads(reads.clone())?
            .build()?;
        assert_eq!(store.redundant(), 3);
        assert_eq!(store.len(), 5);
        assert_eq!(
            store
                .get("chr1")
                .iter()
                .map(|x| (x.start, x.end, x.strand))
                .collect::<Vec<_>>(),
            vec![
                (0, 50, Orientation::Forward),
                (0, 50, Orientation::Reverse),
                (0, 60, Orientation::Forward),
                (20, 70, Orientation::Reverse),
            ]
        );

        let store = ReadStore::builder()
            .set_redundancy_threshold(Some(2))?
            .add_reads(reads.clone())?
            .build()?;
        assert_eq!(store.redundant(), 1);

        let store = ReadStore::new(reads)?;
        assert_eq!(store.redundant(), 0);
        assert_eq!(store.len(), 8);

        assert!(ReadStore::builder().set_redundancy_threshold(Some(0)).is_err());
        Ok(())
    }

    #[test]
    fn test_tag_positions() -> Result<()> {
        let forward = read("chr1", 100, 136, Orientation::Forward);
        let reverse = read("chr1", 100, 136, Orientation::Reverse);
        let dual = read("chr1", 100, 136, Orientation::Dual);

        assert_eq!(TagPosition::Start.of(&reverse), 100);

        let shifted = TagPosition::Shifted { fragment_size: 150 };
        assert_eq!(shifted.of(&forward), 175);
        assert_eq!(shifted.of(&reverse), 60);
        assert_eq!(shifted.of(&dual), 100);

        // Near the chromosome start the reverse tag is clamped to zero
        assert_eq!(shifted.of(&read("chr1", 0, 36, Orientation::Reverse)), 0);

        // Rounding half to even
        assert_eq!(TagPosition::Shifted { fragment_size: 151 }.of(&forward), 176);
        assert_eq!(TagPosition::Shifted { fragment_size: 153 }.of(&forward), 176);

        let store = ReadStore::new([forward, reverse])?;
        assert_eq!(store.tag_positions("chr1", shifted), vec![60, 175]);
        assert_eq!(store.tag_positions("chr1", TagPosition::Start), vec![100, 100]);
        Ok(())
    }

    #[test]
    fn test_reads_within_islands() -> Result<()> {
        let store = ReadStore::new([
            read("chr1", 10, 60, Orientation::Forward),
            read("chr1", 150, 200, Orientation::Reverse),
            read("chr1", 400, 450, Orientation::Forward),
            read("chr1", 599, 650, Orientation::Forward),
            read("chr1", 600, 650, Orientation::Forward),
            read("chr2", 0, 50, Orientation::Forward),
            read("chr3", 100, 150, Orientation::Forward),
        ])?;
        let islands = [
            Island::new("chr1".into(), 400, 600, 5.0, 2),
            Island::new("chr1".into(), 0, 200, 5.0, 2),
            Island::new("chr3".into(), 0, 1_000, 5.0, 1),
            // Overlaps the first island
            Island::new("chr1".into(), 350, 450, 5.0, 1),
        ];

        let kept = store.within(&islands, TagPosition::Start)?;
        assert_eq!(kept.chroms(), ["chr1", "chr3"]);
        assert_eq!(
            coords(kept.get("chr1")),
            vec![(10, 60), (150, 200), (400, 450), (599, 650)]
        );
        assert_eq!(kept.len(), 5);

        // Forward tags move 50bp downstream, past the island end at 600
        let shifted = store.within(&islands, TagPosition::Shifted { fragment_size: 100 })?;
        assert_eq!(
            coords(shifted.get("chr1")),
            vec![(10, 60), (150, 200), (400, 450)]
        );

        assert!(store.within(&[], TagPosition::Start)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_count_between() {
        let positions = [10, 20, 20, 30, 45];
        assert_eq!(count_between(&positions, 0, 10), 0);
        assert_eq!(count_between(&positions, 0, 11), 1);
        assert_eq!(count_between(&positions, 20, 30), 2);
        assert_eq!(count_between(&positions, 20, 46), 4);
        assert_eq!(count_between(&positions, 50, 60), 0);
        assert_eq!(count_between(&[], 0, 60), 0);
    }
}
