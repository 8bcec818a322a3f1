use derive_getters::Dissolve;
use eyre::Result;

use isle_core_rs::loc::IntervalOp;

use crate::error::Error;
use crate::island::Island;
use crate::stats;

/// Upper bound on the control expectation of an island without a single control read.
const EMPTY_CONTROL_CAP: f64 = 0.25;

/// Where the expected number of reads in a region comes from.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Background {
    /// Reads are spread uniformly over the genome, `density` reads per base.
    Uniform { density: f64 },
    /// Reads observed in a control library, rescaled to the treatment depth by `scaling`.
    /// `density` is the control's own per-base density, used for regions without control reads.
    Control { scaling: f64, density: f64 },
}

/// Score of a single window: -ln P(X = count) under the window background.
pub fn window_score(count: u32, lambda: f64) -> f64 {
    -stats::ln_poisson_pmf(count as u64, lambda)
}

/// Per-base read density of a library spread over the effective genome.
pub fn density(library: u64, genome_size: u64) -> Result<f64> {
    if genome_size == 0 {
        return Err(Error::InvalidGenomeSize.into());
    }
    Ok(library as f64 / genome_size as f64)
}

#[derive(Clone, Copy, PartialEq, Debug, Dissolve)]
pub struct Scorer {
    background: Background,
}

impl Scorer {
    pub fn uniform(library: u64, genome_size: u64) -> Result<Self> {
        Ok(Self {
            background: Background::Uniform {
                density: density(library, genome_size)?,
            },
        })
    }

    pub fn with_control(treatment: u64, control: u64, genome_size: u64) -> Result<Self> {
        if control == 0 {
            return Err(Error::InvalidLibrarySize {
                library: "control".to_owned(),
            }
            .into());
        }
        Ok(Self {
            background: Background::Control {
                scaling: treatment as f64 / control as f64,
                density: density(control, genome_size)?,
            },
        })
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    /// Expected number of treatment reads in the island under the background.
    pub fn expected(&self, island: &Island) -> f64 {
        let length = island.len() as f64;
        match self.background {
            Background::Uniform { density } => density * length,
            Background::Control { scaling, density } => match island.control_count {
                Some(control) if control > 0 => control as f64 * scaling,
                _ => (length * density).min(EMPTY_CONTROL_CAP) * scaling,
            },
        }
    }

    /// Fill in `pvalue`, `fc` and `alpha_stat` (the Poisson mean the p-value was computed with).
    pub fn score(&self, island: &mut Island) {
        let expected = self.expected(island);
        let observed = island.obs_count as u64;

        island.pvalue = Some(stats::enrichment_pvalue(observed, expected));
        island.fc = Some(if expected > 0.0 {
            observed as f64 / expected
        } else {
            f64::INFINITY
        });
        island.alpha_stat = Some(expected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::sync::Arc;

    fn island(start: u64, end: u64, obs_count: u32) -> Island {
        Island::new(Arc::from("chr1"), start, end, 0.0, obs_count)
    }

    #[test]
    fn test_uniform_background() -> Result<()> {
        // 5 reads over 10kb: 0.2 expected reads in a 400bp island
        let scorer = Scorer::uniform(5, 10_000)?;

        let mut enriched = island(0, 400, 4);
        scorer.score(&mut enriched);
        assert_approx_eq!(enriched.alpha_stat.unwrap(), 0.2, 1e-12);
        assert_approx_eq!(enriched.fc.unwrap(), 20.0, 1e-9);
        // 1 - e^-0.2 * (1 + 0.2 + 0.02 + 0.2^3 / 6)
        let expected = 1.0 - (-0.2f64).exp() * (1.0 + 0.2 + 0.02 + 0.008 / 6.0);
        assert_approx_eq!(enriched.pvalue.unwrap(), expected, 1e-12);

        // Observed counts at or below the expectation are not enriched
        let mut depleted = island(0, 10_000, 3);
        scorer.score(&mut depleted);
        assert_eq!(depleted.pvalue, Some(1.0));
        assert_approx_eq!(depleted.fc.unwrap(), 0.6, 1e-12);
        Ok(())
    }

    #[test]
    fn test_control_background() -> Result<()> {
        // Treatment is twice as deep as the control
        let scorer = Scorer::with_control(2_000, 1_000, 1_000_000)?;
        assert_eq!(
            scorer.background(),
            &Background::Control {
                scaling: 2.0,
                density: 0.001
            }
        );

        let mut covered = island(0, 600, 30);
        covered.control_count = Some(5);
        scorer.score(&mut covered);
        assert_approx_eq!(covered.alpha_stat.unwrap(), 10.0, 1e-12);
        assert_approx_eq!(covered.fc.unwrap(), 3.0, 1e-12);
        assert!(covered.pvalue.unwrap() < 1e-6);

        // No control reads: min(0.25, 600 * 0.001) * 2
        let mut uncovered = island(0, 600, 3);
        uncovered.control_count = Some(0);
        scorer.score(&mut uncovered);
        assert_approx_eq!(uncovered.alpha_stat.unwrap(), 0.5, 1e-12);

        // Short islands fall below the cap: 100 * 0.001 * 2
        let mut short = island(0, 100, 3);
        short.control_count = Some(0);
        scorer.score(&mut short);
        assert_approx_eq!(short.alpha_stat.unwrap(), 0.2, 1e-12);
        Ok(())
    }

    #[test]
    fn test_zero_expectation() -> Result<()> {
        let scorer = Scorer::uniform(0, 1_000)?;
        let mut island = island(0, 200, 3);
        scorer.score(&mut island);
        assert_eq!(island.pvalue, Some(0.0));
        assert_eq!(island.fc, Some(f64::INFINITY));
        assert_eq!(island.alpha_stat, Some(0.0));
        Ok(())
    }

    #[test]
    fn test_invalid_backgrounds() {
        let err = Scorer::uniform(10, 0).unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::InvalidGenomeSize));

        let err = Scorer::with_control(10, 0, 1_000).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidLibrarySize { .. })
        ));
    }

    #[test]
    fn test_window_score() {
        assert_approx_eq!(window_score(0, 0.5), 0.5, 1e-12);
        assert_approx_eq!(window_score(2, 1.0), 1.0 + 2f64.ln(), 1e-12);
        assert!(window_score(5, 0.1) > window_score(4, 0.1));
    }
}
