//! Shift plans for insertion and moves.
//!
//! A plan is the ordered list of single-step ordinal changes the mirror must
//! apply. The order is the whole point: every step only ever targets an ordinal
//! that the previous step already vacated (or that was never used).

use crate::error::{Result, TaskbaseError};

/// Move the record currently at `from` to `to` (both 1-based ordinals).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub from: usize,
    pub to: usize,
}

/// Validate an insertion target for a subsection of `len` records.
pub fn check_insert_position(position: usize, len: usize) -> Result<()> {
    if position == 0 || position > len + 1 {
        return Err(TaskbaseError::PositionOutOfRange {
            position,
            max: len + 1,
        });
    }
    Ok(())
}

/// Validate a move between two existing ordinals.
pub fn check_move_positions(old: usize, new: usize, len: usize) -> Result<()> {
    for position in [old, new] {
        if position == 0 || position > len {
            return Err(TaskbaseError::PositionOutOfRange { position, max: len });
        }
    }
    if old == new {
        return Err(TaskbaseError::NoOpMove(old));
    }
    Ok(())
}

/// Shifts that open a slot at `position` in a subsection of `len` records.
///
/// Every record at ordinal `>= position` moves up by one, highest ordinal first.
/// Appending (`position == len + 1`) needs no shifts.
pub fn insert_shifts(len: usize, position: usize) -> Vec<Shift> {
    (position..=len)
        .rev()
        .map(|from| Shift { from, to: from + 1 })
        .collect()
}

/// Shifts that close the gap left by the record at `old` and open one at `new`.
///
/// Moving later, the records in `old+1..=new` move down by one, lowest first.
/// Moving earlier, the records in `new..=old-1` move up by one, highest first.
/// The moved record itself is not part of the plan; callers place it at `new`
/// once the plan has run.
pub fn move_shifts(old: usize, new: usize) -> Vec<Shift> {
    if new > old {
        (old + 1..=new)
            .map(|from| Shift { from, to: from - 1 })
            .collect()
    } else {
        (new..old)
            .rev()
            .map(|from| Shift { from, to: from + 1 })
            .collect()
    }
}

/// In-memory counterpart of a move: pop at `old`, insert at `new` (1-based).
pub fn reposition<T>(items: &mut Vec<T>, old: usize, new: usize) {
    let item = items.remove(old - 1);
    items.insert(new - 1, item);
}
