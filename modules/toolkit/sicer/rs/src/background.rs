//! Island scores expected from reads scattered uniformly at random.
//!
//! Under the window background every window count is an independent Poisson(lambda) draw.
//! Windows with at least `min_window_count` reads are eligible and score `-ln P(X = count)`.
//! An island starts at an eligible window preceded by more than `gap` ineligible windows, then
//! repeatedly absorbs the next eligible window reachable through at most `gap` ineligible ones.
//! Summing these chains over binned scores gives the expected number of random islands scoring
//! at least `s`, and the E-value cutoff is the smallest `s` where that number drops to `evalue`.

use eyre::Result;

use crate::error::Error;
use crate::stats;

/// Resolution of the score histogram.
pub const BIN_SIZE: f64 = 0.001;

/// Window counts whose probability is this far (in nats) below the kernel mass are ignored.
const NEGLIGIBLE: f64 = -40.0;

/// Relative tail mass below which the remaining bins no longer change the sum.
const RESIDUAL: f64 = 1e-12;

#[derive(Clone, PartialEq, Debug)]
pub struct IslandBackground {
    // Expected number of island starts per window
    start_rate: f64,
    windows: f64,
    gap_factor: f64,
    // (score bin, probability) of every eligible window count
    kernel: Vec<(usize, f64)>,
    // Total mass of all islands, summed over every score
    total: f64,
}

impl IslandBackground {
    /// `gap` is the number of ineligible windows an island may bridge, `windows` the genome length in
    /// windows.
    pub fn new(lambda: f64, min_window_count: u32, gap: u64, windows: f64) -> Result<Self> {
        if !(lambda.is_finite() && lambda >= 0.0 && windows.is_finite() && windows >= 0.0) {
            return Err(Error::InvalidThreshold {
                reason: format!(
                    "background requires a finite window lambda ({lambda}) and genome length ({windows})"
                ),
            }
            .into());
        }

        let min_window_count = min_window_count.max(1) as u64;
        // Probability of an ineligible window
        let ineligible = if lambda > 0.0 {
            1.0 - stats::ln_poisson_sf(min_window_count, lambda).exp()
        } else {
            1.0
        };

        let mut kernel = Vec::new();
        if lambda > 0.0 {
            let mut k = min_window_count;
            let mut mass = f64::NEG_INFINITY;
            loop {
                let ln_pmf = stats::ln_poisson_pmf(k, lambda);
                mass = stats::ln_add_exp(mass, ln_pmf);
                if ln_pmf - mass < NEGLIGIBLE && k as f64 > lambda {
                    break;
                }
                let bin = ((-ln_pmf / BIN_SIZE).round() as usize).max(1);
                kernel.push((bin, ln_pmf.exp()));
                k += 1;
            }
        }

        // Ways to bridge 0..=gap ineligible windows before the next eligible one
        let gap_factor = if ineligible < 1.0 {
            (1.0 - ineligible.powf(gap as f64 + 1.0)) / (1.0 - ineligible)
        } else {
            gap as f64 + 1.0
        };

        let eligible = kernel.iter().map(|x| x.1).sum::<f64>();
        let extension = gap_factor * eligible;
        let total = if extension < 1.0 {
            eligible / (1.0 - extension)
        } else {
            0.0
        };

        // Islands are flanked by more than `gap` ineligible windows on both sides
        let boundary = ineligible.powf(gap as f64 + 1.0);
        Ok(Self {
            start_rate: boundary * boundary,
            windows,
            gap_factor,
            kernel,
            total,
        })
    }

    /// Expected number of random islands in the genome, regardless of their score.
    pub fn expected_islands(&self) -> f64 {
        self.windows * self.start_rate * self.total
    }

    /// Smallest score (a multiple of [`BIN_SIZE`]) reached by at most `evalue` random islands.
    pub fn score_threshold(&self, evalue: f64) -> Result<f64> {
        if !(evalue.is_finite() && evalue > 0.0) {
            return Err(Error::InvalidThreshold {
                reason: format!("E-value must be positive and finite, got {evalue}"),
            }
            .into());
        }

        let scale = self.windows * self.start_rate;
        let mut density: Vec<f64> = Vec::new();
        let mut below = 0.0;
        loop {
            let bin = density.len();
            let remaining = (self.total - below).max(0.0);
            if remaining * scale <= evalue || remaining <= self.total * RESIDUAL {
                return Ok(bin as f64 * BIN_SIZE);
            }

            // Islands ending at this score: a single window or an extension of a shorter island
            let mut current = 0.0;
            for &(width, probability) in &self.kernel {
                if width == bin {
                    current += probability;
                } else if width < bin {
                    current += self.gap_factor * probability * density[bin - width];
                }
            }
            below += current;
            density.push(current);
        }
    }
}
