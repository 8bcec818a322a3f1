use std::sync::Arc;

use ahash::AHashMap;
use derive_getters::Dissolve;
use eyre::{eyre, Result};

use crate::compaction;
use crate::island::Island;
use crate::read::{count_between, Read};
use crate::scoring::window_score;
use crate::window::Window;
use crate::workload::Stages;

#[derive(Debug, Default, Dissolve)]
pub struct Worker {
    // Chromosome ID -> scored islands
    results: AHashMap<usize, Vec<Island>>,
    // Internal caches
    windows: Vec<Window>,
    dropped: Vec<usize>,
    positions: Vec<u64>,
}

impl Worker {
    pub fn reset(&mut self) {
        self.results.clear();
        self.results.shrink_to_fit();

        self.windows.clear();
        self.windows.shrink_to_fit();

        self.dropped.clear();
        self.dropped.shrink_to_fit();

        self.positions.clear();
        self.positions.shrink_to_fit();
    }

    /// Call and score the islands of a single chromosome.
    pub fn process(
        &mut self,
        chromind: usize,
        chrom: &Arc<str>,
        treatment: &[Read],
        control: Option<&[Read]>,
        stages: &Stages,
    ) -> Result<()> {
        // 1. Count reads in windows and drop the ineligible ones
        self.windows.clear();
        stages.counter.count(chrom, treatment, &mut self.windows)?;
        let total = self.windows.len();

        let lambda = stages.window_lambda;
        let min_count = stages.min_window_count;
        let window_threshold = stages.window_threshold();
        compaction::retain_with(&mut self.windows, &mut self.dropped, |window| {
            window.count >= min_count
                && window_threshold.is_none_or(|x| window_score(window.count, lambda) >= x)
        })?;

        // 2. Merge windows into islands
        let mut islands = Vec::new();
        stages
            .builder
            .build(&self.windows, |x| window_score(x.count, lambda), &mut islands);

        // 3. Count control reads on islands
        if let Some(control) = control {
            let tags = stages.counter.tag_position();
            self.positions.clear();
            self.positions.extend(control.iter().map(|x| tags.of(x)));
            if !tags.preserves_order() {
                self.positions.sort_unstable();
            }

            for island in islands.iter_mut() {
                island.control_count = Some(count_between(&self.positions, island.start, island.end));
            }
        }

        // 4. Score islands and apply the island-level threshold
        for island in islands.iter_mut() {
            stages.scorer.score(island);
        }
        if let Some(threshold) = stages.island_threshold() {
            compaction::retain_with(&mut islands, &mut self.dropped, |x| x.score >= threshold)?;
        }

        log::debug!(
            "{chrom}: {} reads, {} non-empty windows, {} eligible windows, {} islands",
            treatment.len(),
            total,
            self.windows.len(),
            islands.len()
        );

        match self.results.insert(chromind, islands) {
            Some(_) => Err(eyre!(
                "Worker was called twice for the same chromosome ({chrom}). \
                That must not happen and indicates a bug in the code."
            )),
            None => Ok(()),
        }
    }

    /// Gather the islands of all workers in the chromosome order.
    pub fn collapse<'a>(chroms: usize, workers: impl Iterator<Item = &'a mut Worker>) -> Vec<Island> {
        let mut result = vec![Vec::new(); chroms];
        for worker in workers {
            for (chromind, islands) in worker.results.drain() {
                result[chromind] = islands;
            }
        }
        result.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, GenomeSize, Threshold, ThresholdStage, WindowCutoff};
    use crate::read::ReadStore;
    use isle_core_rs::loc::Orientation;

    fn reads(starts: &[u64]) -> Vec<Read> {
        starts
            .iter()
            .map(|&x| Read::new("chr1".into(), x, x + 36, String::new(), 0.0, Orientation::Forward))
            .collect()
    }

    fn stages(threshold: Option<Threshold>, control: Option<&ReadStore>) -> Result<Stages> {
        let treatment = ReadStore::new(reads(&[50, 150, 260, 270, 900]))?;
        let mut config = Config::new(200, 50)?;
        config
            .set_genome_size(GenomeSize::Effective(10_000))?
            .set_window_cutoff(WindowCutoff::Fixed(1))?
            .set_threshold(threshold)?;
        Stages::resolve(&config, &treatment, control)
    }

    #[test]
    fn test_process() -> Result<()> {
        let chrom: Arc<str> = Arc::from("chr1");
        let stages = stages(None, None)?;

        let mut worker = Worker::default();
        worker.process(0, &chrom, &reads(&[50, 150, 260, 270, 900]), None, &stages)?;

        let islands = Worker::collapse(1, std::iter::once(&mut worker));
        let spans = islands
            .iter()
            .map(|x| (x.start, x.end, x.obs_count))
            .collect::<Vec<_>>();
        assert_eq!(spans, vec![(0, 400, 4), (800, 1000, 1)]);
        assert!(islands.iter().all(|x| x.pvalue.is_some() && x.control_count.is_none()));
        assert!(worker.results.is_empty());
        Ok(())
    }

    #[test]
    fn test_window_threshold() -> Result<()> {
        let chrom: Arc<str> = Arc::from("chr1");
        // lambda = 5 / 10_000 * 200 = 0.1; a single-read window scores ~2.4, a two-read one ~5.4
        let stages = stages(Some(Threshold::score(3.0, ThresholdStage::Windows)), None)?;

        let mut worker = Worker::default();
        worker.process(0, &chrom, &reads(&[50, 150, 260, 270, 900]), None, &stages)?;
        let islands = Worker::collapse(1, std::iter::once(&mut worker));
        assert_eq!(islands.len(), 1);
        assert_eq!((islands[0].start, islands[0].end), (0, 400));
        Ok(())
    }

    #[test]
    fn test_island_threshold() -> Result<()> {
        let chrom: Arc<str> = Arc::from("chr1");
        let stages = stages(Some(Threshold::score(3.0, ThresholdStage::Islands)), None)?;

        let mut worker = Worker::default();
        worker.process(0, &chrom, &reads(&[50, 150, 260, 270, 900]), None, &stages)?;
        let islands = Worker::collapse(1, std::iter::once(&mut worker));
        assert_eq!(islands.len(), 1);
        assert_eq!(islands[0].obs_count, 4);
        assert!(islands[0].score >= 3.0);
        Ok(())
    }

    #[test]
    fn test_control_counts() -> Result<()> {
        let chrom: Arc<str> = Arc::from("chr1");
        let control = ReadStore::new(reads(&[10, 390, 400, 420]))?;
        let stages = stages(None, Some(&control))?;

        let mut worker = Worker::default();
        worker.process(
            0,
            &chrom,
            &reads(&[50, 150, 260, 270, 900]),
            Some(control.get("chr1")),
            &stages,
        )?;
        let islands = Worker::collapse(1, std::iter::once(&mut worker));
        assert_eq!(islands[0].control_count, Some(2));
        assert_eq!(islands[1].control_count, Some(0));
        Ok(())
    }

    #[test]
    fn test_collapse_order() -> Result<()> {
        let stages = stages(None, None)?;
        let (first, second): (Arc<str>, Arc<str>) = (Arc::from("chr1"), Arc::from("chr2"));

        let mut workers = [Worker::default(), Worker::default()];
        workers[0].process(1, &second, &reads(&[900]), None, &stages)?;
        workers[1].process(0, &first, &reads(&[50]), None, &stages)?;
        assert!(workers[0].process(1, &second, &reads(&[900]), None, &stages).is_err());

        let islands = Worker::collapse(2, workers.iter_mut());
        let chroms = islands.iter().map(|x| x.chrom.as_ref()).collect::<Vec<_>>();
        assert_eq!(chroms, vec!["chr1", "chr2"]);

        workers[0].reset();
        assert!(workers[0].windows.is_empty());
        Ok(())
    }
}
