use std::collections::HashSet;

use crate::config::FeedSchema;
use crate::model::{Action, ChangeRecord, ReconSummary};

/// Compute summary statistics from reconciled records.
pub fn compute_summary(records: &[ChangeRecord], schema: &FeedSchema) -> ReconSummary {
    let mut adds = 0;
    let mut removes = 0;
    let mut updates = 0;
    let mut parents: HashSet<&str> = HashSet::new();

    for r in records {
        match r.action {
            Action::Add => adds += 1,
            Action::Remove => removes += 1,
            Action::Update => updates += 1,
        }
        if let Some(parent) = r.row.key(&schema.parent_key) {
            parents.insert(parent);
        }
    }

    ReconSummary {
        total: records.len(),
        adds,
        removes,
        updates,
        parents_touched: parents.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Row;

    fn record(action: Action, handle: &str) -> ChangeRecord {
        ChangeRecord::new(action, Row::from_pairs([("Handle", handle)]))
    }

    #[test]
    fn summary_counts() {
        let records = vec![
            record(Action::Add, "a"),
            record(Action::Add, "a"),
            record(Action::Remove, "b"),
            record(Action::Update, "c"),
            record(Action::Remove, ""),
        ];
        let summary = compute_summary(&records, &FeedSchema::default());
        assert_eq!(summary.total, 5);
        assert_eq!(summary.adds, 2);
        assert_eq!(summary.removes, 2);
        assert_eq!(summary.updates, 1);
        assert_eq!(summary.parents_touched, 3);
    }

    #[test]
    fn empty_summary() {
        let summary = compute_summary(&[], &FeedSchema::default());
        assert_eq!(summary, ReconSummary::default());
    }
}
