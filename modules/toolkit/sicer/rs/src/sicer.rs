use derive_more::Constructor;
use eyre::{Result, WrapErr};
use rayon::ThreadPool;

use isle_io_rs::wig::Step;

use crate::config::Config;
use crate::diff::{self, Comparator, LibrarySizes, Pairing};
use crate::fdr;
use crate::read::{Read, ReadStore};
use crate::result::{DiffHarvest, Harvest};
use crate::track;
use crate::window::WindowCounter;

use super::engine::Engine;
use super::workload::Workload;

/// Treatment library of a sample and, optionally, its control library.
#[derive(Clone, Copy, Debug, Constructor)]
pub struct Sample<'a> {
    pub treatment: &'a ReadStore,
    pub control: Option<&'a ReadStore>,
}

pub struct Sicer {
    pool: ThreadPool,
    engine: Engine,
    config: Config,
}

impl Sicer {
    pub fn new(pool: ThreadPool, config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pool,
            engine: Engine::default(),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Collect reads into a store, applying the configured redundancy filter.
    pub fn load(&self, reads: impl IntoIterator<Item = Read>) -> Result<ReadStore> {
        ReadStore::builder()
            .set_redundancy_threshold(*self.config.redundancy_threshold())?
            .add_reads(reads)?
            .build()
    }

    /// Call, score and FDR-correct the islands of a sample.
    pub fn run(&mut self, sample: Sample) -> Result<Harvest> {
        self.config.validate()?;

        let library_size = sample.treatment.len() as u64;
        let control_library_size = sample.control.map(|x| x.len() as u64);
        if sample.treatment.is_empty() {
            log::info!("Treatment library is empty, no islands to call");
            return Ok(Harvest::new(0, control_library_size, Vec::new()));
        }

        let workload = Workload::new(&self.config, sample.treatment, sample.control)?;
        let mut islands = self.engine.run(&mut self.pool, &workload)?;

        // All chromosomes are done, the correction is applied genome-wide
        fdr::correct(islands.iter_mut())?;
        log::info!(
            "Called {} islands on {} chromosomes",
            islands.len(),
            workload.chroms.len()
        );

        Ok(Harvest::new(library_size, control_library_size, islands))
    }

    /// Treatment reads inside the islands that pass the FDR cutoff.
    pub fn significant_reads(
        &self,
        treatment: &ReadStore,
        harvest: &Harvest,
        cutoff: f64,
    ) -> Result<ReadStore> {
        let reads = treatment.within(harvest.significant(cutoff), *self.config.tag_position())?;
        log::info!(
            "{} of {} reads fall into islands with FDR <= {cutoff}",
            reads.len(),
            treatment.len()
        );
        Ok(reads)
    }

    /// Normalized window coverage of a library, see [`track::normalized`].
    pub fn track(&self, reads: &ReadStore) -> Result<Vec<Step>> {
        let mut counter = WindowCounter::new(*self.config.window_size())?;
        counter.set_tag_position(*self.config.tag_position());
        track::normalized(&counter, reads)
    }

    /// Run both samples and compare their islands.
    pub fn run_df(
        &mut self,
        sample_a: Sample,
        sample_b: Sample,
        library_sizes: LibrarySizes,
        pairing: Pairing,
    ) -> Result<DiffHarvest> {
        let harvest_a = self.run(sample_a).wrap_err("Failed to call islands for sample A")?;
        let harvest_b = self.run(sample_b).wrap_err("Failed to call islands for sample B")?;
        if harvest_a.islands().is_empty() && harvest_b.islands().is_empty() {
            log::info!("Neither sample has islands, nothing to compare");
            return Ok(DiffHarvest::new(harvest_a, harvest_b, Vec::new()));
        }

        let comparator = match library_sizes {
            LibrarySizes::Explicit { a, b } => Comparator::new(a, b)?,
            LibrarySizes::Reads => {
                Comparator::new(*harvest_a.library_size(), *harvest_b.library_size())?
            }
            LibrarySizes::Islands => {
                Comparator::from_islands(harvest_a.islands(), harvest_b.islands())?
            }
        };
        let (library_a, library_b) = comparator.library_sizes();
        log::info!("Comparing samples with library sizes {library_a} (A) and {library_b} (B)");

        let islands = match pairing {
            Pairing::Exact => comparator.compare(harvest_a.islands(), harvest_b.islands()),
            Pairing::Union => {
                let regions = diff::union_regions(harvest_a.islands(), harvest_b.islands())?;
                let counts = diff::count_regions(
                    &regions,
                    sample_a.treatment,
                    sample_b.treatment,
                    *self.config.tag_position(),
                );
                comparator.compare_counts(counts)
            }
        };
        let harvest = DiffHarvest::new(harvest_a, harvest_b, islands);

        let correlation = harvest.correlation();
        log::info!(
            "Compared {} regions: Pearson's r = {:.4}, Spearman's rho = {:.4}",
            harvest.islands().len(),
            correlation.pearson,
            correlation.spearman
        );
        Ok(harvest)
    }
}
