use std::fmt::{Display, Formatter};
use std::sync::Arc;

use derive_getters::Dissolve;

use isle_core_rs::loc::IntervalOp;

use crate::window::Window;

/// A run of enriched windows merged under the gap tolerance.
///
/// The island is created by the [`IslandBuilder`] with coordinates, score and observed count.
/// The remaining fields are filled in by the later stages:
/// * `control_count`, when a control library is available;
/// * `pvalue`, `fc` and `alpha_stat` by the [`crate::scoring::Scorer`];
/// * `fdr` by [`crate::fdr::correct`].
#[derive(Clone, PartialEq, Debug, Dissolve)]
pub struct Island {
    pub chrom: Arc<str>,
    pub start: u64,
    pub end: u64,
    pub score: f64,
    pub obs_count: u32,
    pub control_count: Option<u32>,
    pub pvalue: Option<f64>,
    pub fc: Option<f64>,
    pub alpha_stat: Option<f64>,
    pub fdr: Option<f64>,
}

impl Island {
    pub fn new(chrom: Arc<str>, start: u64, end: u64, score: f64, obs_count: u32) -> Self {
        Self {
            chrom,
            start,
            end,
            score,
            obs_count,
            control_count: None,
            pvalue: None,
            fc: None,
            alpha_stat: None,
            fdr: None,
        }
    }

    /// Column names matching the fields this island renders with `Display`.
    pub fn header(&self) -> Vec<&'static str> {
        let mut columns = vec!["chrom", "start", "end", "score", "obs_count"];
        for (column, populated) in [
            ("control_count", self.control_count.is_some()),
            ("pvalue", self.pvalue.is_some()),
            ("fc", self.fc.is_some()),
            ("alpha_stat", self.alpha_stat.is_some()),
            ("fdr", self.fdr.is_some()),
        ] {
            if populated {
                columns.push(column);
            }
        }
        columns
    }
}

impl IntervalOp for Island {
    type Idx = u64;

    fn start(&self) -> u64 {
        self.start
    }

    fn end(&self) -> u64 {
        self.end
    }
}

impl Display for Island {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.chrom, self.start, self.end, self.score, self.obs_count
        )?;
        if let Some(control) = self.control_count {
            write!(f, "\t{}", control)?;
        }
        for value in [self.pvalue, self.fc, self.alpha_stat, self.fdr]
            .into_iter()
            .flatten()
        {
            write!(f, "\t{}", value)?;
        }
        Ok(())
    }
}

/// Merges sorted, non-overlapping windows into islands. Two consecutive windows belong to the same
/// island iff the number of bases between them is at most `max_gap`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Dissolve)]
pub struct IslandBuilder {
    max_gap: u64,
}

impl IslandBuilder {
    pub fn new(max_gap: u64) -> Self {
        Self { max_gap }
    }

    pub fn max_gap(&self) -> u64 {
        self.max_gap
    }

    /// Single left-to-right pass over the windows. Each island accumulates the counts of its
    /// windows and the sum of `score` over them.
    pub fn build(
        &self,
        windows: &[Window],
        mut score: impl FnMut(&Window) -> f64,
        saveto: &mut Vec<Island>,
    ) {
        let mut current: Option<Island> = None;
        for window in windows {
            current = match current {
                // Overlapping windows join the current island
                Some(mut island) if island.gap_to(window).is_none_or(|gap| gap <= self.max_gap) => {
                    island.end = island.end.max(window.end);
                    island.obs_count += window.count;
                    island.score += score(window);
                    Some(island)
                }
                finished => {
                    saveto.extend(finished);
                    Some(Island::new(
                        window.chrom.clone(),
                        window.start,
                        window.end,
                        score(window),
                        window.count,
                    ))
                }
            };
        }
        saveto.extend(current);
    }
}
