//! Window coverage normalized for genome browsers.

use std::sync::Arc;

use eyre::Result;

use isle_io_rs::wig::Step;

use crate::read::ReadStore;
use crate::window::WindowCounter;

/// Non-empty window counts in reads per million library reads per kilobase of window, rounded to
/// two decimals. Steps follow the chromosome order of the store.
pub fn normalized(counter: &WindowCounter, reads: &ReadStore) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    if reads.is_empty() {
        return Ok(steps);
    }
    let scale = reads.len() as f64 / 1e6 * counter.window_size() as f64 / 1e3;

    let mut windows = Vec::new();
    for (chrom, chrom_reads) in reads.iter() {
        let chrom: Arc<str> = Arc::from(chrom);
        windows.clear();
        counter.count(&chrom, chrom_reads, &mut windows)?;
        steps.extend(windows.iter().map(|x| {
            let value = (x.count as f64 / scale * 100.0).round() / 100.0;
            Step::new(chrom.clone(), x.start, value)
        }));
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::{Read, TagPosition};
    use isle_core_rs::loc::Orientation;

    fn read(chrom: &str, start: u64, strand: Orientation) -> Read {
        Read::new(chrom.into(), start, start + 50, String::new(), 0.0, strand)
    }

    #[test]
    fn test_normalized_values() -> Result<()> {
        let store = ReadStore::new([
            read("chr2", 10, Orientation::Forward),
            read("chr1", 0, Orientation::Forward),
            read("chr1", 150, Orientation::Reverse),
            read("chr1", 650, Orientation::Forward),
        ])?;

        // 4 reads and 200bp windows: every read is worth 1 / (4e-6 * 0.2) = 1.25M
        let steps = normalized(&WindowCounter::new(200)?, &store)?;
        let values = steps
            .iter()
            .map(|x| (x.chrom.as_ref(), x.start, x.value))
            .collect::<Vec<_>>();
        assert_eq!(
            values,
            vec![
                ("chr2", 0, 1_250_000.0),
                ("chr1", 0, 2_500_000.0),
                ("chr1", 600, 1_250_000.0),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_values_are_rounded() -> Result<()> {
        let store = ReadStore::new((0..3_000).map(|x| read("chr1", x * 1_000, Orientation::Forward)))?;

        // 1 / (3000e-6 * 0.5) = 666.666..
        let steps = normalized(&WindowCounter::new(500)?, &store)?;
        assert_eq!(steps.len(), 3_000);
        assert!(steps.iter().all(|x| x.value == 666.67));
        Ok(())
    }

    #[test]
    fn test_shifted_tags() -> Result<()> {
        let store = ReadStore::new([
            read("chr1", 100, Orientation::Forward),
            read("chr1", 500, Orientation::Reverse),
        ])?;
        let mut counter = WindowCounter::new(200)?;
        counter.set_tag_position(TagPosition::Shifted { fragment_size: 200 });

        // Tags at 200 and 449
        let steps = normalized(&counter, &store)?;
        assert_eq!(
            steps.iter().map(|x| x.start).collect::<Vec<_>>(),
            vec![200, 400]
        );
        Ok(())
    }

    #[test]
    fn test_empty_store() -> Result<()> {
        assert!(normalized(&WindowCounter::new(200)?, &ReadStore::default())?.is_empty());
        Ok(())
    }
}
