use std::sync::Arc;

use derive_getters::Dissolve;
use derive_more::Constructor;
use eyre::Result;

use isle_core_rs::loc::IntervalOp;

use crate::error::Error;
use crate::read::{Read, TagPosition};

/// Fixed-width bin [start, end) holding at least one read.
#[derive(Clone, PartialEq, Eq, Debug, Constructor)]
pub struct Window {
    pub chrom: Arc<str>,
    pub start: u64,
    pub end: u64,
    pub count: u32,
}

impl IntervalOp for Window {
    type Idx = u64;

    fn start(&self) -> u64 {
        self.start
    }

    fn end(&self) -> u64 {
        self.end
    }
}

/// Counts reads in consecutive windows of a chromosome. Only non-empty windows are reported.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Dissolve)]
pub struct WindowCounter {
    window_size: u64,
    tags: TagPosition,
}

impl WindowCounter {
    pub fn new(window_size: u64) -> Result<Self> {
        if window_size == 0 {
            return Err(Error::InvalidWindowSize { value: 0 }.into());
        }
        Ok(Self {
            window_size,
            tags: TagPosition::Start,
        })
    }

    pub fn set_tag_position(&mut self, tags: TagPosition) -> &mut Self {
        self.tags = tags;
        self
    }

    pub fn window_size(&self) -> u64 {
        self.window_size
    }

    pub fn tag_position(&self) -> TagPosition {
        self.tags
    }

    /// Window index of a coordinate.
    pub fn index(&self, position: u64) -> u64 {
        position / self.window_size
    }

    /// Attribute each read to the single window containing its tag position and append the
    /// non-empty windows to `saveto`, ordered by start.
    ///
    /// With [`TagPosition::Start`] the reads must be sorted by start, as the [`crate::read::ReadStore`]
    /// keeps them. Shifted tags can reorder reads across strands, so they are sorted here.
    pub fn count(&self, chrom: &Arc<str>, reads: &[Read], saveto: &mut Vec<Window>) -> Result<()> {
        if self.tags.preserves_order() {
            self.count_sorted(chrom, reads.iter().map(|x| x.start), saveto)
        } else {
            let mut positions = reads.iter().map(|x| self.tags.of(x)).collect::<Vec<_>>();
            positions.sort_unstable();
            self.count_sorted(chrom, positions.into_iter(), saveto)
        }
    }

    fn count_sorted(
        &self,
        chrom: &Arc<str>,
        positions: impl Iterator<Item = u64>,
        saveto: &mut Vec<Window>,
    ) -> Result<()> {
        // Single pass over the positions: (window index, count)
        let mut current: Option<(u64, u32)> = None;
        for position in positions {
            let index = self.index(position);
            current = match current {
                None => Some((index, 1)),
                Some((cursor, count)) if cursor == index => Some((cursor, count + 1)),
                Some((cursor, count)) if cursor < index => {
                    saveto.push(self.window(chrom, cursor, count));
                    Some((index, 1))
                }
                Some((cursor, _)) => {
                    return Err(Error::UnsortedReads {
                        chrom: chrom.to_string(),
                        previous: cursor,
                        index,
                    }
                    .into())
                }
            };
        }

        if let Some((cursor, count)) = current {
            saveto.push(self.window(chrom, cursor, count));
        }
        Ok(())
    }

    fn window(&self, chrom: &Arc<str>, index: u64, count: u32) -> Window {
        let start = index * self.window_size;
        Window::new(chrom.clone(), start, start + self.window_size, count)
    }
}
