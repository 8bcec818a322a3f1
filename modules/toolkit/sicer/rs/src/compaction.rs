//! In-place removal of elements by position.
//!
//! The kept elements are shifted down run by run with swaps: nothing is cloned, dropped or
//! reallocated while compacting, and the only bookkeeping is a pair of cursors.

use eyre::Result;

use crate::error::Error;

fn validate(len: usize, indices: &[usize]) -> Result<()> {
    for (pos, &ind) in indices.iter().enumerate() {
        if ind >= len {
            return Err(Error::InvalidIndexSet {
                reason: format!("index {ind} is out of bounds for {len} elements"),
            }
            .into());
        }
        if pos > 0 && indices[pos - 1] >= ind {
            return Err(Error::InvalidIndexSet {
                reason: format!(
                    "indices must be strictly ascending, got {} followed by {ind}",
                    indices[pos - 1]
                ),
            }
            .into());
        }
    }
    Ok(())
}

/// Remove the elements at `indices` (strictly ascending, in bounds) and return the new logical end.
///
/// Kept elements preserve their relative order and end up in `items[..end]`. Elements past the
/// returned end are the removed ones, in unspecified order. The index set is validated before
/// anything moves, so on error the slice is untouched.
pub fn remove_at<T>(items: &mut [T], indices: &[usize]) -> Result<usize> {
    validate(items.len(), indices)?;

    let Some(&first) = indices.first() else {
        return Ok(items.len());
    };

    let mut dst = first;
    let mut cursor = 0;
    while cursor < indices.len() {
        // Skip a run of consecutive removed positions
        let mut last = indices[cursor];
        cursor += 1;
        while cursor < indices.len() && indices[cursor] == last + 1 {
            last = indices[cursor];
            cursor += 1;
        }

        // Move the following run of kept elements down to the destination
        let until = indices.get(cursor).copied().unwrap_or(items.len());
        for src in (last + 1)..until {
            items.swap(dst, src);
            dst += 1;
        }
    }
    Ok(dst)
}

/// Same as [`remove_at`], but also truncates the vector to the kept elements.
pub fn retain_except<T>(items: &mut Vec<T>, indices: &[usize]) -> Result<()> {
    let end = remove_at(items, indices)?;
    items.truncate(end);
    Ok(())
}

/// Drop every element rejected by `keep`. The positions are collected into the reusable `indices`
/// buffer first and then compacted in a single pass. Returns the number of removed elements.
pub fn retain_with<T>(
    items: &mut Vec<T>,
    indices: &mut Vec<usize>,
    mut keep: impl FnMut(&T) -> bool,
) -> Result<usize> {
    indices.clear();
    indices.extend(
        items
            .iter()
            .enumerate()
            .filter_map(|(ind, item)| (!keep(item)).then_some(ind)),
    );
    retain_except(items, indices)?;
    Ok(indices.len())
}
