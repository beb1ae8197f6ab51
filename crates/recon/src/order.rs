use crate::project::ProjectedView;

/// Stable sort by parent key, case-insensitive. A missing parent sorts as
/// the empty string.
pub fn sort_by_parent(view: &mut ProjectedView, parent_column: &str) {
    let Some(pos) = view.position(parent_column) else {
        return;
    };
    view.rows
        .sort_by_cached_key(|row| row.cells[pos].as_deref().unwrap_or("").to_lowercase());
}
