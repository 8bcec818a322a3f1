use std::fmt::{Debug, Display};
use std::rc::Rc;
use std::sync::Arc;

#[cfg(feature = "bitcode")]
use bitcode::{Decode, Encode};
use derive_getters::Dissolve;
use eyre::{ensure, Result};
use impl_tools::autoimpl;

use crate::num::PrimInt;

/// Half-open genomic interval [start, end). Empty intervals (start == end) are rejected.
#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Dissolve)]
pub struct Interval<Idx: PrimInt> {
    start: Idx,
    end: Idx,
}

/// Anything that occupies a half-open span [start, end) on a chromosome: windows, islands, regions.
#[autoimpl(for <T: trait + ?Sized> &T, Box<T>, Rc<T>, Arc<T>)]
#[allow(clippy::len_without_is_empty)]
pub trait IntervalOp {
    type Idx: PrimInt;

    fn start(&self) -> Self::Idx;

    fn end(&self) -> Self::Idx;

    fn len(&self) -> Self::Idx {
        self.end() - self.start()
    }

    /// Number of uncovered positions between this span and the `next` one.
    /// Returns `None` if `next` starts before this span ends.
    fn gap_to<I: IntervalOp<Idx = Self::Idx>>(&self, next: &I) -> Option<Self::Idx> {
        if next.start() >= self.end() {
            Some(next.start() - self.end())
        } else {
            None
        }
    }
}

impl<Idx: PrimInt> IntervalOp for Interval<Idx> {
    type Idx = Idx;

    #[inline(always)]
    fn start(&self) -> Self::Idx {
        self.start
    }

    #[inline(always)]
    fn end(&self) -> Self::Idx {
        self.end
    }
}

impl<Idx: PrimInt> Interval<Idx> {
    pub fn new(start: Idx, end: Idx) -> Result<Self> {
        ensure!(
            start < end,
            "Invalid interval [{:?}, {:?}): start must be strictly less than end",
            start,
            end
        );
        Ok(Self { start, end })
    }

    /// Sort the intervals and merge every overlapping or touching pair into a single interval.
    pub fn merge(intervals: &mut [Self]) -> Vec<Self> {
        intervals.sort();

        let mut merged: Vec<Self> = Vec::with_capacity(intervals.len());
        for current in intervals.iter() {
            match merged.last_mut() {
                Some(last) if current.start <= last.end => {
                    last.end = last.end.max(current.end);
                }
                _ => merged.push(*current),
            }
        }
        merged
    }
}

impl<Idx: PrimInt + Display> Display for Interval<Idx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
