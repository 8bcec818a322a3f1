#[cfg(feature = "bitcode")]
use bitcode::{Decode, Encode};
use derive_getters::{Dissolve, Getters};
use derive_more::Constructor;
use eyre::Result;

use crate::error::Error;
use crate::read::TagPosition;

/// Pipeline stage at which the score threshold is applied.
#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum ThresholdStage {
    /// Windows scoring below the threshold are dropped before they are merged.
    Windows,
    /// Islands whose accumulated score is below the threshold are dropped after scoring.
    #[default]
    Islands,
}

/// Where the score cutoff comes from.
#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ScoreCutoff {
    Score(f64),
    /// Smallest score reached by at most this many islands in a random genome with the same
    /// library size.
    EValue(f64),
}

#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
#[derive(Clone, Copy, PartialEq, Debug, Constructor)]
pub struct Threshold {
    pub cutoff: ScoreCutoff,
    pub stage: ThresholdStage,
}

impl Threshold {
    pub fn score(score: f64, stage: ThresholdStage) -> Self {
        Self::new(ScoreCutoff::Score(score), stage)
    }

    pub fn evalue(evalue: f64, stage: ThresholdStage) -> Self {
        Self::new(ScoreCutoff::EValue(evalue), stage)
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::evalue(1_000.0, ThresholdStage::Islands)
    }
}

/// Minimum number of reads a window needs to take part in island building.
#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum WindowCutoff {
    Fixed(u32),
    /// Smallest count whose Poisson tail under the window background is at most the given p-value.
    PValue(f64),
}

impl Default for WindowCutoff {
    fn default() -> Self {
        WindowCutoff::PValue(0.2)
    }
}

#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum GenomeSize {
    Effective(u64),
    /// Sum of the per-chromosome read extents of the treatment library.
    #[default]
    Observed,
}

#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
#[derive(Clone, PartialEq, Debug, Dissolve, Getters)]
pub struct Config {
    window_size: u64,
    max_gap: u64,
    tag_position: TagPosition,
    window_cutoff: WindowCutoff,
    threshold: Option<Threshold>,
    genome_size: GenomeSize,
    redundancy_threshold: Option<u32>,
}

impl Config {
    pub fn new(window_size: i64, max_gap: i64) -> Result<Self> {
        let mut config = Self {
            window_size: 1,
            max_gap: 0,
            tag_position: TagPosition::default(),
            window_cutoff: WindowCutoff::default(),
            threshold: Some(Threshold::default()),
            genome_size: GenomeSize::default(),
            redundancy_threshold: None,
        };
        config.set_window_size(window_size)?.set_max_gap(max_gap)?;
        Ok(config)
    }

    pub fn set_window_size(&mut self, window_size: i64) -> Result<&mut Self> {
        if window_size <= 0 {
            return Err(Error::InvalidWindowSize { value: window_size }.into());
        }
        self.window_size = window_size as u64;
        Ok(self)
    }

    pub fn set_max_gap(&mut self, max_gap: i64) -> Result<&mut Self> {
        if max_gap < 0 {
            return Err(Error::InvalidGap { value: max_gap }.into());
        }
        self.max_gap = max_gap as u64;
        Ok(self)
    }

    pub fn set_tag_position(&mut self, tag_position: TagPosition) -> &mut Self {
        self.tag_position = tag_position;
        self
    }

    pub fn set_window_cutoff(&mut self, cutoff: WindowCutoff) -> Result<&mut Self> {
        Self::check_window_cutoff(&cutoff)?;
        self.window_cutoff = cutoff;
        Ok(self)
    }

    pub fn set_threshold(&mut self, threshold: Option<Threshold>) -> Result<&mut Self> {
        Self::check_threshold(threshold.as_ref())?;
        self.threshold = threshold;
        Ok(self)
    }

    pub fn set_genome_size(&mut self, genome_size: GenomeSize) -> Result<&mut Self> {
        if genome_size == GenomeSize::Effective(0) {
            return Err(Error::InvalidGenomeSize.into());
        }
        self.genome_size = genome_size;
        Ok(self)
    }

    pub fn set_redundancy_threshold(&mut self, threshold: Option<u32>) -> Result<&mut Self> {
        Self::check_redundancy_threshold(threshold)?;
        self.redundancy_threshold = threshold;
        Ok(self)
    }

    /// Re-check every field. Configs can be decoded or dissolved and rebuilt, so the engine
    /// validates them again before any processing starts.
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(Error::InvalidWindowSize { value: 0 }.into());
        }
        if self.genome_size == GenomeSize::Effective(0) {
            return Err(Error::InvalidGenomeSize.into());
        }
        Self::check_window_cutoff(&self.window_cutoff)?;
        Self::check_threshold(self.threshold.as_ref())?;
        Self::check_redundancy_threshold(self.redundancy_threshold)?;
        Ok(())
    }

    fn check_window_cutoff(cutoff: &WindowCutoff) -> Result<()> {
        match cutoff {
            WindowCutoff::PValue(p) if !(*p > 0.0 && *p <= 1.0) => Err(Error::InvalidThreshold {
                reason: format!("window p-value must be in (0, 1], got {p}"),
            }
            .into()),
            _ => Ok(()),
        }
    }

    fn check_threshold(threshold: Option<&Threshold>) -> Result<()> {
        let reason = match threshold.map(|x| x.cutoff) {
            Some(ScoreCutoff::Score(score)) if !score.is_finite() => {
                format!("score threshold must be finite, got {score}")
            }
            Some(ScoreCutoff::EValue(evalue)) if !(evalue.is_finite() && evalue > 0.0) => {
                format!("E-value must be positive and finite, got {evalue}")
            }
            _ => return Ok(()),
        };
        Err(Error::InvalidThreshold { reason }.into())
    }

    fn check_redundancy_threshold(threshold: Option<u32>) -> Result<()> {
        match threshold {
            Some(0) => Err(Error::InvalidThreshold {
                reason: "redundancy threshold must keep at least one read".to_owned(),
            }
            .into()),
            _ => Ok(()),
        }
    }
}
