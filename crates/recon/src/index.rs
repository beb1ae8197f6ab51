use std::collections::HashMap;

use crate::config::FeedSchema;
use crate::model::Row;

/// Lookup structure over one feed: variant key → row, parent key → rows.
///
/// Rows whose key is absent or empty are kept in `rows()` but are never
/// indexed under that key.
#[derive(Debug)]
pub struct FeedIndex<'a> {
    rows: &'a [Row],
    by_variant: HashMap<&'a str, &'a Row>,
    by_parent: HashMap<&'a str, Vec<&'a Row>>,
}

impl<'a> FeedIndex<'a> {
    pub fn build(rows: &'a [Row], schema: &FeedSchema) -> Self {
        let mut by_variant = HashMap::with_capacity(rows.len());
        let mut by_parent: HashMap<&str, Vec<&Row>> = HashMap::new();
        let mut duplicates = 0usize;

        for row in rows {
            if let Some(sku) = row.key(&schema.variant_key) {
                // last write wins
                if by_variant.insert(sku, row).is_some() {
                    duplicates += 1;
                }
            }
            if let Some(parent) = row.key(&schema.parent_key) {
                by_parent.entry(parent).or_default().push(row);
            }
        }

        if duplicates > 0 {
            log::warn!("{duplicates} duplicate variant key(s) in feed, last occurrence kept");
        }

        Self {
            rows,
            by_variant,
            by_parent,
        }
    }

    /// Row for a variant key. Empty keys never match.
    pub fn variant(&self, key: &str) -> Option<&'a Row> {
        self.by_variant.get(key).copied()
    }

    /// All rows under a parent key, in feed order. Empty when none.
    pub fn parent(&self, key: &str) -> &[&'a Row] {
        self.by_parent.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rows(&self) -> &'a [Row] {
        self.rows
    }

    pub fn variant_count(&self) -> usize {
        self.by_variant.len()
    }

    pub fn parent_count(&self) -> usize {
        self.by_parent.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(sku: &str, handle: &str, vendor: &str) -> Row {
        Row::from_pairs([("Variant SKU", sku), ("Handle", handle), ("Vendor", vendor)])
    }

    #[test]
    fn lookup_by_variant_and_parent() {
        let rows = vec![row("A1", "p", "x"), row("A2", "p", "y"), row("B1", "q", "z")];
        let schema = FeedSchema::default();
        let index = FeedIndex::build(&rows, &schema);

        assert_eq!(index.variant("A2").and_then(|r| r.get("Vendor")), Some("y"));
        assert!(index.variant("Z9").is_none());
        assert_eq!(index.parent("p").len(), 2);
        assert!(index.parent("missing").is_empty());
        assert_eq!(index.variant_count(), 3);
        assert_eq!(index.parent_count(), 2);
    }

    #[test]
    fn duplicate_variant_last_write_wins() {
        let rows = vec![row("A1", "p", "first"), row("A1", "p", "second")];
        let index = FeedIndex::build(&rows, &FeedSchema::default());
        assert_eq!(index.variant("A1").and_then(|r| r.get("Vendor")), Some("second"));
        // both rows still belong to the parent group
        assert_eq!(index.parent("p").len(), 2);
    }

    #[test]
    fn empty_keys_are_not_indexed() {
        let rows = vec![
            row("", "p", "x"),
            row("A1", "", "y"),
            Row::from_pairs([("Vendor", "z")]),
        ];
        let index = FeedIndex::build(&rows, &FeedSchema::default());
        assert!(index.variant("").is_none());
        assert!(index.parent("").is_empty());
        assert_eq!(index.variant_count(), 1);
        assert_eq!(index.parent_count(), 1);
        assert_eq!(index.rows().len(), 3);
    }
}
