//! Drag-and-drop reordering.
//!
//! Pure sequence surgery driven by the indices a drop event carries.
//! Nothing here knows about persistence; the board saves afterwards.

/// The source index of a drop did not point at an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRange {
    pub index: usize,
    pub len: usize,
}

/// Move the item at `from` so it ends up at `to` in the same sequence.
///
/// `to` is an index into the sequence after removal and is clamped to its
/// end. Returns where the item landed.
pub fn move_within<T>(items: &mut Vec<T>, from: usize, to: usize) -> Result<usize, OutOfRange> {
    if from >= items.len() {
        return Err(OutOfRange {
            index: from,
            len: items.len(),
        });
    }
    let item = items.remove(from);
    let to = to.min(items.len());
    items.insert(to, item);
    Ok(to)
}

/// Move the item at `from` in `source` to `to` in `target`.
///
/// Both sequences are borrowed mutably for the whole call, so the item
/// is never observable in both or in neither. `to` is clamped.
pub fn transfer<T>(
    source: &mut Vec<T>,
    from: usize,
    target: &mut Vec<T>,
    to: usize,
) -> Result<usize, OutOfRange> {
    if from >= source.len() {
        return Err(OutOfRange {
            index: from,
            len: source.len(),
        });
    }
    let item = source.remove(from);
    let to = to.min(target.len());
    target.insert(to, item);
    Ok(to)
}

/// Two distinct elements of a slice, both mutable.
///
/// Panics if `a == b` or either is out of bounds; callers resolve the
/// indices first.
pub fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    assert_ne!(a, b, "pair_mut needs two different indices");
    if a < b {
        let (left, right) = items.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}
