//! Fractional index placement.
//!
//! Items in a collection are ordered by an `f64` index. Inserting before an
//! item takes the midpoint between it and its predecessor, so siblings keep
//! their indices. Repeated insertion at one spot halves the gap each time;
//! after roughly fifty halvings the midpoint collides with a neighbour and
//! the partition has to be renumbered.

/// Outcome of a placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// A fresh index strictly between the neighbours.
    Index(f64),
    /// No representable index fits; renumber the partition and retry.
    Exhausted,
}

/// Computes the index for an item.
///
/// `ordered` holds the partition's indices in ascending order, without the
/// item being placed. `before` is the position in `ordered` of the item to
/// insert before; `None` appends after the last item.
pub fn place(ordered: &[f64], before: Option<usize>) -> Placement {
    let (lower, upper, candidate) = match before {
        None => {
            let last = ordered.last().copied();
            (last, None, last.map_or(1.0, |l| l + 1.0))
        }
        Some(pos) => {
            let Some(&upper) = ordered.get(pos) else {
                return Placement::Exhausted;
            };
            let lower = pos.checked_sub(1).and_then(|p| ordered.get(p)).copied();
            let candidate = match lower {
                Some(l) => (l + upper) / 2.0,
                None => upper - 1.0,
            };
            (lower, Some(upper), candidate)
        }
    };

    let above_lower = lower.map_or(true, |l| candidate > l);
    let below_upper = upper.map_or(true, |u| candidate < u);
    if candidate.is_finite() && above_lower && below_upper {
        Placement::Index(candidate)
    } else {
        Placement::Exhausted
    }
}

/// Indices assigned when a partition of `len` items is renumbered.
pub fn renumbered(len: usize) -> impl Iterator<Item = f64> {
    (1..=len).map(|i| i as f64)
}
