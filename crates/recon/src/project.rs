use std::sync::Arc;

use serde::Serialize;

use crate::config::ViewConfig;
use crate::model::{Action, ChangeRecord, Columns, Row};

/// One export view of the reconciled records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedView {
    pub name: String,
    pub file: String,
    /// The view's full allow-list, in order.
    pub columns: Vec<String>,
    pub rows: Vec<ProjectedRow>,
}

/// Cells aligned with `ProjectedView::columns`; `None` when the source
/// record had no such column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedRow {
    pub action: Action,
    pub cells: Vec<Option<String>>,
}

impl ProjectedView {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn value<'a>(&self, row: &'a ProjectedRow, column: &str) -> Option<&'a str> {
        self.position(column)
            .and_then(|i| row.cells.get(i))
            .and_then(|cell| cell.as_deref())
    }

    fn present(&self) -> Vec<usize> {
        (0..self.columns.len())
            .filter(|&i| self.rows.iter().any(|row| row.cells[i].is_some()))
            .collect()
    }

    /// Columns carried by at least one row, in view order.
    pub fn header(&self) -> Vec<&str> {
        self.present().into_iter().map(|i| self.columns[i].as_str()).collect()
    }

    /// Records as written to disk: header columns only, missing cells `""`.
    pub fn records(&self) -> Vec<Vec<&str>> {
        let present = self.present();
        self.rows
            .iter()
            .map(|row| {
                present
                    .iter()
                    .map(|&i| row.cells[i].as_deref().unwrap_or(""))
                    .collect()
            })
            .collect()
    }

    /// Same shape as `records`, as rows sharing one column set.
    pub fn to_rows(&self) -> Vec<Row> {
        let columns = Arc::new(Columns::new(self.header()));
        self.records()
            .into_iter()
            .map(|values| Row::new(columns.clone(), values.into_iter().map(String::from).collect()))
            .collect()
    }
}

/// Select `view.columns` from every record, trimming values, and drop
/// records whose non-key columns are all empty.
pub fn project(records: &[ChangeRecord], name: &str, view: &ViewConfig) -> ProjectedView {
    let non_key: Vec<usize> = view
        .columns
        .iter()
        .enumerate()
        .filter(|(_, column)| !view.is_key(column))
        .map(|(i, _)| i)
        .collect();

    let rows: Vec<ProjectedRow> = records
        .iter()
        .map(|record| ProjectedRow {
            action: record.action,
            cells: view
                .columns
                .iter()
                .map(|column| record.value(column).map(|v| v.trim().to_string()))
                .collect(),
        })
        .filter(|row| {
            non_key
                .iter()
                .any(|&i| row.cells[i].as_deref().is_some_and(|v| !v.is_empty()))
        })
        .collect();

    log::debug!(
        "view '{name}': kept {} of {} record(s)",
        rows.len(),
        records.len()
    );

    ProjectedView {
        name: name.to_string(),
        file: view.file.clone(),
        columns: view.columns.clone(),
        rows,
    }
}
