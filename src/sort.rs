//! Per-column sort with one-level restore.
//!
//! Sorting the same field again flips direction; a new field starts
//! ascending. The first sort after a manual arrangement records the task
//! order by id, and a reset puts the current tasks back in that order.
//! Content edited while sorted survives the reset; deleted tasks stay
//! deleted; tasks that arrived while sorted follow the restored ones.

use crate::board::{Column, SortDirection, SortField, SortState, Task, TaskId};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Sort a column by `field`, toggling direction if it is already sorted
/// by it. Returns the new sort state.
pub fn sort_column(column: &mut Column, field: SortField) -> SortState {
    if column.original_order.is_none() {
        column.original_order = Some(column.task_ids());
    }

    let direction = match column.sort {
        Some(current) if current.field == field => current.direction.flipped(),
        _ => SortDirection::Asc,
    };
    let state = SortState { field, direction };

    // Vec::sort_by is stable: equal keys keep their current order.
    column.tasks.sort_by(|a, b| compare(a, b, state));
    column.sort = Some(state);
    state
}

/// Restore the recorded manual order and drop the sort state.
/// Returns false if there was nothing to restore.
pub fn reset_sort(column: &mut Column) -> bool {
    column.sort = None;
    let Some(order) = column.original_order.take() else {
        return false;
    };

    let rank: HashMap<TaskId, usize> = order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    column
        .tasks
        .sort_by_key(|t| rank.get(&t.id).copied().unwrap_or(usize::MAX));
    true
}

/// Forget sort state without reordering. The current order becomes the
/// manual order.
pub fn clear_sort(column: &mut Column) {
    column.sort = None;
    column.original_order = None;
}

/// Total order for one sort state.
///
/// Priority ranks High < Medium < Low. Undated tasks rank after every
/// dated task. Descending reverses the whole comparison, undated
/// included.
pub fn compare(a: &Task, b: &Task, state: SortState) -> Ordering {
    let ascending = match state.field {
        SortField::Priority => a.priority.rank().cmp(&b.priority.rank()),
        SortField::DueDate => match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (None, None) => Ordering::Equal,
        },
    };
    match state.direction {
        SortDirection::Asc => ascending,
        SortDirection::Desc => ascending.reverse(),
    }
}
