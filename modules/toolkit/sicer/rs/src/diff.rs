use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use ahash::AHashMap;
#[cfg(feature = "bitcode")]
use bitcode::{Decode, Encode};
use derive_getters::Dissolve;
use derive_more::Constructor;
use eyre::Result;
use statrs::statistics::{Data, OrderStatistics, RankTieBreaker, Statistics};

use isle_core_rs::loc::{Interval, IntervalOp};

use crate::error::Error;
use crate::fdr::benjamini_hochberg;
use crate::island::Island;
use crate::read::{count_between, ReadStore, TagPosition};
use crate::stats::enrichment_pvalue;

const PSEUDOCOUNT: f64 = 1.0;
const PER_MILLION: f64 = 1e6;

/// How islands of the two samples are matched before the comparison.
#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Pairing {
    /// Islands with identical coordinates form a pair. An island called in one sample only is
    /// paired with a zero count from the other.
    #[default]
    Exact,
    /// Islands of both samples are merged into union regions, and reads of each sample are
    /// recounted over them.
    Union,
}

/// Where the library sizes used for normalization come from.
#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum LibrarySizes {
    Explicit {
        a: u64,
        b: u64,
    },
    /// Number of treatment reads in each sample.
    #[default]
    Reads,
    /// Total island counts of each sample.
    Islands,
}

/// Read counts of both samples over one region.
#[derive(Clone, PartialEq, Eq, Debug, Constructor)]
pub struct RegionCounts {
    pub chrom: Arc<str>,
    pub start: u64,
    pub end: u64,
    pub count_a: u32,
    pub count_b: u32,
}

#[derive(Clone, PartialEq, Debug)]
pub struct DiffExprIsland {
    pub chrom: Arc<str>,
    pub start: u64,
    pub end: u64,
    pub count_a: u32,
    pub norm_count_a: f64,
    pub count_b: u32,
    pub norm_count_b: f64,
    pub fc_a_vs_b: f64,
    pub pvalue_a_vs_b: f64,
    pub fdr_a_vs_b: f64,
    pub fc_b_vs_a: f64,
    pub pvalue_b_vs_a: f64,
    pub fdr_b_vs_a: f64,
}

impl DiffExprIsland {
    pub const HEADER: [&'static str; 13] = [
        "chrom",
        "start",
        "end",
        "count_a",
        "norm_count_a",
        "count_b",
        "norm_count_b",
        "fc_a_vs_b",
        "pvalue_a_vs_b",
        "fdr_a_vs_b",
        "fc_b_vs_a",
        "pvalue_b_vs_a",
        "fdr_b_vs_a",
    ];
}

impl Display for DiffExprIsland {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.chrom,
            self.start,
            self.end,
            self.count_a,
            self.norm_count_a,
            self.count_b,
            self.norm_count_b,
            self.fc_a_vs_b,
            self.pvalue_a_vs_b,
            self.fdr_a_vs_b,
            self.fc_b_vs_a,
            self.pvalue_b_vs_a,
            self.fdr_b_vs_a
        )
    }
}

/// Compares read counts of two samples over shared regions.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Dissolve)]
pub struct Comparator {
    library_a: u64,
    library_b: u64,
}

impl Comparator {
    /// A sample without reads (or islands) is allowed: its counts are zero-filled and its library
    /// size enters the fold changes and expectations as 1. Both libraries can't be empty.
    pub fn new(library_a: u64, library_b: u64) -> Result<Self> {
        if library_a == 0 && library_b == 0 {
            return Err(Error::InvalidLibrarySize {
                library: "both samples".to_owned(),
            }
            .into());
        }
        Ok(Self {
            library_a,
            library_b,
        })
    }

    /// Library sizes taken as the total island counts of each sample.
    pub fn from_islands(a: &[Island], b: &[Island]) -> Result<Self> {
        let total = |islands: &[Island]| islands.iter().map(|x| x.obs_count as u64).sum();
        Self::new(total(a), total(b))
    }

    pub fn library_sizes(&self) -> (u64, u64) {
        (self.library_a, self.library_b)
    }

    /// Compare islands paired by identical coordinates, see [`pair_exact`].
    pub fn compare(&self, a: &[Island], b: &[Island]) -> Vec<DiffExprIsland> {
        self.compare_counts(pair_exact(a, b))
    }

    /// Normalize, test both directions and adjust each direction's p-values separately.
    pub fn compare_counts(
        &self,
        regions: impl IntoIterator<Item = RegionCounts>,
    ) -> Vec<DiffExprIsland> {
        let (library_a, library_b) = (self.library_a.max(1) as f64, self.library_b.max(1) as f64);
        let (a_over_b, b_over_a) = (library_a / library_b, library_b / library_a);
        let per_million = |count: f64, library: u64| match library {
            0 => 0.0,
            library => count * PER_MILLION / library as f64,
        };

        let mut islands = regions
            .into_iter()
            .map(|region| {
                let (a, b) = (region.count_a as f64, region.count_b as f64);
                DiffExprIsland {
                    chrom: region.chrom,
                    start: region.start,
                    end: region.end,
                    count_a: region.count_a,
                    norm_count_a: per_million(a, self.library_a),
                    count_b: region.count_b,
                    norm_count_b: per_million(b, self.library_b),
                    fc_a_vs_b: ((a + PSEUDOCOUNT) / (b + PSEUDOCOUNT)) / a_over_b,
                    pvalue_a_vs_b: enrichment_pvalue(
                        region.count_a as u64,
                        b.max(PSEUDOCOUNT) * a_over_b,
                    ),
                    fdr_a_vs_b: 1.0,
                    fc_b_vs_a: ((b + PSEUDOCOUNT) / (a + PSEUDOCOUNT)) / b_over_a,
                    pvalue_b_vs_a: enrichment_pvalue(
                        region.count_b as u64,
                        a.max(PSEUDOCOUNT) * b_over_a,
                    ),
                    fdr_b_vs_a: 1.0,
                }
            })
            .collect::<Vec<_>>();

        let pvalues = islands.iter().map(|x| x.pvalue_a_vs_b).collect::<Vec<_>>();
        for (island, fdr) in islands.iter_mut().zip(benjamini_hochberg(&pvalues)) {
            island.fdr_a_vs_b = fdr;
        }
        let pvalues = islands.iter().map(|x| x.pvalue_b_vs_a).collect::<Vec<_>>();
        for (island, fdr) in islands.iter_mut().zip(benjamini_hochberg(&pvalues)) {
            island.fdr_b_vs_a = fdr;
        }

        islands
    }
}

/// Agreement between the normalized counts of both samples over the compared regions.
#[derive(Clone, Copy, PartialEq, Debug, Constructor)]
pub struct Correlation {
    pub pearson: f64,
    pub spearman: f64,
}

impl Correlation {
    /// Both coefficients are NaN with fewer than two regions or when either sample is constant.
    pub fn of(islands: &[DiffExprIsland]) -> Self {
        if islands.len() < 2 {
            return Self::new(f64::NAN, f64::NAN);
        }
        let a = islands.iter().map(|x| x.norm_count_a).collect::<Vec<_>>();
        let b = islands.iter().map(|x| x.norm_count_b).collect::<Vec<_>>();

        let rank_a = Data::new(a.clone()).ranks(RankTieBreaker::Average);
        let rank_b = Data::new(b.clone()).ranks(RankTieBreaker::Average);
        Self::new(pearson(&a, &b), pearson(&rank_a, &rank_b))
    }
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let (sd_a, sd_b) = (a.iter().std_dev(), b.iter().std_dev());
    if sd_a == 0.0 || sd_b == 0.0 {
        return f64::NAN;
    }
    a.iter().covariance(b.iter()) / (sd_a * sd_b)
}

/// Group items by chromosome, keeping the order in which chromosomes are first seen.
fn by_chrom<'a, T: 'a>(
    items: impl Iterator<Item = &'a T>,
    chrom: impl Fn(&T) -> &Arc<str>,
) -> Vec<(Arc<str>, Vec<&'a T>)> {
    let mut index: AHashMap<Arc<str>, usize> = AHashMap::new();
    let mut groups: Vec<(Arc<str>, Vec<&'a T>)> = Vec::new();
    for item in items {
        let name = chrom(item);
        let ind = *index.entry(name.clone()).or_insert_with(|| {
            groups.push((name.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[ind].1.push(item);
    }
    groups
}

/// Pair islands of the two samples by exact coordinates. Unmatched islands get a zero count on the
/// other side. Regions are ordered by chromosome (first seen in `a`, then in `b`) and coordinates.
pub fn pair_exact(a: &[Island], b: &[Island]) -> Vec<RegionCounts> {
    let tagged = a
        .iter()
        .map(|x| (x, true))
        .chain(b.iter().map(|x| (x, false)))
        .collect::<Vec<_>>();

    let mut regions = Vec::with_capacity(a.len().max(b.len()));
    for (chrom, islands) in by_chrom(tagged.iter(), |x| &x.0.chrom) {
        let mut pairs: BTreeMap<(u64, u64), (u32, u32)> = BTreeMap::new();
        for (island, is_a) in islands {
            let counts = pairs.entry((island.start, island.end)).or_default();
            if *is_a {
                counts.0 += island.obs_count;
            } else {
                counts.1 += island.obs_count;
            }
        }
        regions.extend(pairs.into_iter().map(|((start, end), (count_a, count_b))| {
            RegionCounts::new(chrom.clone(), start, end, count_a, count_b)
        }));
    }
    regions
}

/// Merge overlapping or touching islands of both samples into union regions, per chromosome.
pub fn union_regions(a: &[Island], b: &[Island]) -> Result<Vec<(Arc<str>, Vec<Interval<u64>>)>> {
    let mut regions = Vec::new();
    for (chrom, islands) in by_chrom(a.iter().chain(b.iter()), |x| &x.chrom) {
        let mut intervals = islands
            .into_iter()
            .map(|x| Interval::new(x.start, x.end))
            .collect::<Result<Vec<_>>>()?;
        regions.push((chrom, Interval::merge(&mut intervals)));
    }
    Ok(regions)
}

/// Count reads of both samples over the regions.
pub fn count_regions(
    regions: &[(Arc<str>, Vec<Interval<u64>>)],
    a: &ReadStore,
    b: &ReadStore,
    tags: TagPosition,
) -> Vec<RegionCounts> {
    let mut counts = Vec::new();
    for (chrom, intervals) in regions {
        let positions_a = a.tag_positions(chrom, tags);
        let positions_b = b.tag_positions(chrom, tags);
        counts.extend(intervals.iter().map(|x| {
            RegionCounts::new(
                chrom.clone(),
                x.start(),
                x.end(),
                count_between(&positions_a, x.start(), x.end()),
                count_between(&positions_b, x.start(), x.end()),
            )
        }));
    }
    counts
}
