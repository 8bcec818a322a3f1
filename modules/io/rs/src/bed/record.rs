use derive_getters::Dissolve;
use derive_more::Constructor;

use isle_core_rs::loc::Orientation;

/// A single BED6 line
#[derive(Clone, PartialEq, Debug, Default, Dissolve, Constructor)]
pub struct Bed6 {
    pub seqid: String,
    pub start: u64,
    pub end: u64,
    pub name: String,
    pub score: f64,
    pub orientation: Orientation,
}
