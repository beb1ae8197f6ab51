use std::collections::HashSet;

use crate::config::FeedSchema;
use crate::model::{Action, ChangeRecord};

/// Drop records repeating an earlier (parent key, variant key, action)
/// triple. First occurrence wins. Absent and empty keys are distinct.
pub fn dedup(records: Vec<ChangeRecord>, schema: &FeedSchema) -> Vec<ChangeRecord> {
    let before = records.len();
    let mut seen: HashSet<(Option<String>, Option<String>, Action)> = HashSet::new();

    let kept: Vec<ChangeRecord> = records
        .into_iter()
        .filter(|record| {
            seen.insert((
                record.parent_key(schema).map(str::to_string),
                record.variant_key(schema).map(str::to_string),
                record.action,
            ))
        })
        .collect();

    if kept.len() < before {
        log::debug!("dedup dropped {} repeated record(s)", before - kept.len());
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Row;

    fn record(action: Action, sku: &str, handle: &str, vendor: &str) -> ChangeRecord {
        ChangeRecord::new(
            action,
            Row::from_pairs([("Variant SKU", sku), ("Handle", handle), ("Vendor", vendor)]),
        )
    }

    #[test]
    fn first_occurrence_wins() {
        let schema = FeedSchema::default();
        let records = vec![
            record(Action::Add, "A1", "p", "first"),
            record(Action::Remove, "A1", "p", "x"),
            record(Action::Add, "A1", "p", "second"),
        ];
        let out = dedup(records, &schema);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].row.get("Vendor"), Some("first"));
        assert_eq!(out[1].action, Action::Remove);
    }

    #[test]
    fn key_parts_do_not_collide() {
        // "a_b" + "c" vs "a" + "b_c" must stay distinct
        let schema = FeedSchema::default();
        let records = vec![
            record(Action::Add, "c", "a_b", ""),
            record(Action::Add, "b_c", "a", ""),
        ];
        assert_eq!(dedup(records, &schema).len(), 2);
    }

    #[test]
    fn missing_and_empty_keys_differ() {
        let schema = FeedSchema::default();
        let records = vec![
            ChangeRecord::new(Action::Add, Row::from_pairs([("Handle", "p")])),
            ChangeRecord::new(Action::Add, Row::from_pairs([("Handle", "p"), ("Variant SKU", "")])),
            ChangeRecord::new(Action::Add, Row::from_pairs([("Handle", "p")])),
        ];
        assert_eq!(dedup(records, &schema).len(), 2);
    }

    #[test]
    fn dedup_is_idempotent() {
        let schema = FeedSchema::default();
        let records = vec![
            record(Action::Add, "A1", "p", ""),
            record(Action::Add, "A1", "p", ""),
            record(Action::Update, "A2", "p", ""),
        ];
        let once = dedup(records, &schema);
        let twice = dedup(once.clone(), &schema);
        assert_eq!(once, twice);
    }
}
