use std::sync::Arc;

use derive_getters::Dissolve;
use eyre::{Result, WrapErr};

use crate::background::IslandBackground;
use crate::config::{Config, GenomeSize, ScoreCutoff, ThresholdStage, WindowCutoff};
use crate::island::IslandBuilder;
use crate::read::{Read, ReadStore};
use crate::scoring::{self, Scorer};
use crate::stats;
use crate::window::WindowCounter;

/// Run-wide parameters shared by every chromosome task.
#[derive(Clone, PartialEq, Debug, Dissolve)]
pub struct Stages {
    pub counter: WindowCounter,
    pub min_window_count: u32,
    pub window_lambda: f64,
    pub score_threshold: Option<f64>,
    pub threshold_stage: ThresholdStage,
    pub builder: IslandBuilder,
    pub scorer: Scorer,
}

impl Stages {
    /// Resolve the configuration against the libraries of a single run.
    pub fn resolve(
        config: &Config,
        treatment: &ReadStore,
        control: Option<&ReadStore>,
    ) -> Result<Self> {
        let library = treatment.len() as u64;
        let genome_size = match config.genome_size() {
            GenomeSize::Effective(size) => *size,
            GenomeSize::Observed => treatment.chroms().iter().map(|x| treatment.extent(x)).sum(),
        };

        let mut counter = WindowCounter::new(*config.window_size())?;
        counter.set_tag_position(*config.tag_position());

        let window_lambda = scoring::density(library, genome_size)? * *config.window_size() as f64;
        let min_window_count = match config.window_cutoff() {
            WindowCutoff::Fixed(count) => *count,
            WindowCutoff::PValue(pvalue) => stats::min_count_for_pvalue(window_lambda, *pvalue),
        };

        let window_size = *config.window_size();
        let (score_threshold, threshold_stage) = match config.threshold() {
            None => (None, ThresholdStage::default()),
            Some(threshold) => {
                let score = match threshold.cutoff {
                    ScoreCutoff::Score(score) => score,
                    ScoreCutoff::EValue(evalue) => {
                        let background = IslandBackground::new(
                            window_lambda,
                            min_window_count,
                            *config.max_gap() / window_size,
                            genome_size as f64 / window_size as f64,
                        )?;
                        let score = background.score_threshold(evalue)?;
                        log::info!(
                            "Expected random islands: {:.1}, score threshold for E-value {evalue}: {score:.3}",
                            background.expected_islands()
                        );
                        score
                    }
                };
                (Some(score), threshold.stage)
            }
        };

        let scorer = match control {
            None => Scorer::uniform(library, genome_size)?,
            Some(control) => Scorer::with_control(library, control.len() as u64, genome_size)?,
        };

        log::info!(
            "Treatment library: {library} reads, genome size: {genome_size}, window lambda: {window_lambda:.4}, \
            minimum window count: {min_window_count}"
        );
        log::info!("Background model: {:?}", scorer.background());

        Ok(Self {
            counter,
            min_window_count,
            window_lambda,
            score_threshold,
            threshold_stage,
            builder: IslandBuilder::new(*config.max_gap()),
            scorer,
        })
    }

    /// Score threshold applied to the individual windows, if any.
    pub fn window_threshold(&self) -> Option<f64> {
        self.score_threshold
            .filter(|_| self.threshold_stage == ThresholdStage::Windows)
    }

    /// Score threshold applied to the scored islands, if any.
    pub fn island_threshold(&self) -> Option<f64> {
        self.score_threshold
            .filter(|_| self.threshold_stage == ThresholdStage::Islands)
    }
}

/// A single chromosome task: the treatment reads and, in control mode, the control reads.
pub type Task<'a> = (Arc<str>, &'a [Read], Option<&'a [Read]>);

#[derive(Clone, PartialEq, Debug, Dissolve)]
pub struct Workload<'a> {
    pub chroms: Vec<Task<'a>>,
    pub stages: Stages,
}

impl<'a> Workload<'a> {
    /// One task per treatment chromosome, in the treatment order.
    pub fn new(
        config: &Config,
        treatment: &'a ReadStore,
        control: Option<&'a ReadStore>,
    ) -> Result<Self> {
        let stages = Stages::resolve(config, treatment, control)
            .wrap_err("Failed to resolve the island calling parameters")?;

        if let Some(control) = control {
            for chrom in control.chroms() {
                if treatment.get(chrom).is_empty() {
                    log::warn!(
                        "Control chromosome {chrom} has no treatment reads and will be ignored"
                    );
                }
            }
        }

        let chroms = treatment
            .iter()
            .map(|(chrom, reads)| (Arc::from(chrom), reads, control.map(|x| x.get(chrom))))
            .collect();
        Ok(Self { chroms, stages })
    }
}
