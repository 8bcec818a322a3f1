use derive_getters::{Dissolve, Getters};
use derive_more::Constructor;

pub use crate::diff::{Correlation, DiffExprIsland};
pub use crate::island::Island;

/// Islands called for a single sample.
#[derive(Clone, PartialEq, Debug, Default, Constructor, Dissolve, Getters)]
pub struct Harvest {
    // Number of treatment/control reads after redundancy filtering
    library_size: u64,
    control_library_size: Option<u64>,
    // Scored and FDR-corrected islands in chromosome order
    islands: Vec<Island>,
}

impl Harvest {
    /// Islands with an adjusted p-value at or below the cutoff.
    pub fn significant(&self, cutoff: f64) -> impl Iterator<Item = &Island> {
        self.islands
            .iter()
            .filter(move |x| x.fdr.is_some_and(|fdr| fdr <= cutoff))
    }
}

/// Both single-sample runs and their differential comparison.
#[derive(Clone, PartialEq, Debug, Default, Constructor, Dissolve, Getters)]
pub struct DiffHarvest {
    sample_a: Harvest,
    sample_b: Harvest,
    islands: Vec<DiffExprIsland>,
}

impl DiffHarvest {
    /// Regions enriched in sample A relative to sample B.
    pub fn increased(&self, cutoff: f64) -> impl Iterator<Item = &DiffExprIsland> {
        self.islands
            .iter()
            .filter(move |x| x.fdr_a_vs_b <= cutoff)
    }

    /// Regions enriched in sample B relative to sample A.
    pub fn decreased(&self, cutoff: f64) -> impl Iterator<Item = &DiffExprIsland> {
        self.islands
            .iter()
            .filter(move |x| x.fdr_b_vs_a <= cutoff)
    }

    /// Pearson and Spearman correlation of the normalized counts over all compared regions.
    pub fn correlation(&self) -> Correlation {
        Correlation::of(&self.islands)
    }
}
