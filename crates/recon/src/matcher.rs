use std::collections::HashSet;

use crate::config::FeedSchema;
use crate::index::FeedIndex;
use crate::model::{Action, ChangeRecord, FieldChange, Row};

/// Walk master: variants that vanished upstream, changed shape, moved to
/// another parent, or carry field changes.
pub fn removed_or_changed(
    master: &[Row],
    incoming: &FeedIndex<'_>,
    schema: &FeedSchema,
) -> Vec<ChangeRecord> {
    let mut records = Vec::new();

    for master_row in master {
        let Some(incoming_row) = master_row
            .key(&schema.variant_key)
            .and_then(|sku| incoming.variant(sku))
        else {
            records.push(ChangeRecord::new(Action::Remove, master_row.clone()));
            continue;
        };

        let shape_changed = master_row.option_count(schema) != incoming_row.option_count(schema);
        let parent_changed =
            master_row.get(&schema.parent_key) != incoming_row.get(&schema.parent_key);

        if shape_changed || parent_changed {
            log::debug!(
                "replace {:?}: shape_changed={shape_changed} parent_changed={parent_changed}",
                master_row.get(&schema.variant_key)
            );
            records.push(ChangeRecord::new(Action::Remove, master_row.clone()));
            records.push(ChangeRecord::new(Action::Add, incoming_row.clone()));
            continue;
        }

        let changes = diff_fields(master_row, incoming_row, schema);
        if changes.is_empty() {
            continue;
        }
        records.push(ChangeRecord {
            action: Action::Update,
            row: build_update(incoming_row, &changes, schema),
            changes,
        });
    }

    records
}

/// Walk incoming: variants under a parent master has never seen, and new
/// variants under a known parent.
pub fn newly_visible(
    incoming: &[Row],
    master: &FeedIndex<'_>,
    schema: &FeedSchema,
) -> Vec<ChangeRecord> {
    incoming
        .iter()
        .filter(|row| {
            let siblings = row
                .key(&schema.parent_key)
                .map(|parent| master.parent(parent))
                .unwrap_or(&[]);
            let sku = row.key(&schema.variant_key);
            siblings.is_empty()
                || sku.map_or(true, |sku| {
                    !siblings.iter().any(|m| m.key(&schema.variant_key) == Some(sku))
                })
        })
        .map(|row| ChangeRecord::new(Action::Add, row.clone()))
        .collect()
}

/// Fields that differ between a matched pair: the six option fields, then
/// every other non-structural incoming column in incoming order. The title
/// is carried on updates but never compared.
pub fn diff_fields(master: &Row, incoming: &Row, schema: &FeedSchema) -> Vec<FieldChange> {
    let options = schema.option_fields().filter_map(|column| {
        let (m, i) = (master.get(column), incoming.get(column));
        (m != i).then(|| change(column, m, i))
    });

    let attributes = incoming
        .iter()
        .filter(|(column, _)| !schema.is_structural(column))
        .filter_map(|(column, value)| {
            let m = master.get(column);
            (m != Some(value)).then(|| change(column, m, Some(value)))
        });

    options.chain(attributes).collect()
}

fn change(column: &str, master: Option<&str>, incoming: Option<&str>) -> FieldChange {
    FieldChange {
        column: column.to_string(),
        master: master.map(str::to_string),
        incoming: incoming.map(str::to_string),
    }
}

/// Update row: key fields and option fields from incoming, every other
/// incoming column carrying its new value when changed and `""` when not.
pub fn build_update(incoming: &Row, changes: &[FieldChange], schema: &FeedSchema) -> Row {
    let changed: HashSet<&str> = changes.iter().map(|c| c.column.as_str()).collect();

    let fixed = schema
        .key_fields()
        .into_iter()
        .chain(schema.option_fields())
        .map(|column| (column, incoming.get(column).unwrap_or("")));

    let attributes = incoming
        .iter()
        .filter(|(column, _)| !schema.is_structural(column))
        .map(|(column, value)| {
            let value = if changed.contains(column) { value } else { "" };
            (column, value)
        });

    Row::from_pairs(fixed.chain(attributes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> FeedSchema {
        FeedSchema::default()
    }

    fn variant(sku: &str, handle: &str, extra: &[(&str, &str)]) -> Row {
        let mut pairs = vec![("Variant SKU", sku), ("Handle", handle), ("Title", "T")];
        pairs.extend_from_slice(extra);
        Row::from_pairs(pairs)
    }

    fn actions(records: &[ChangeRecord]) -> Vec<Action> {
        records.iter().map(|r| r.action).collect()
    }

    #[test]
    fn missing_upstream_is_remove() {
        let master = vec![variant("B2", "prod-y", &[])];
        let incoming: Vec<Row> = vec![];
        let index = FeedIndex::build(&incoming, &schema());
        let records = removed_or_changed(&master, &index, &schema());
        assert_eq!(actions(&records), vec![Action::Remove]);
        assert_eq!(records[0].row, master[0]);
    }

    #[test]
    fn master_row_without_sku_is_remove() {
        let master = vec![variant("", "p", &[])];
        let incoming = vec![variant("", "p", &[])];
        let index = FeedIndex::build(&incoming, &schema());
        let records = removed_or_changed(&master, &index, &schema());
        assert_eq!(actions(&records), vec![Action::Remove]);
    }

    #[test]
    fn shape_change_is_replace() {
        let master = vec![variant("A1", "p", &[("Option1 Name", "Color"), ("Option1 Value", "Red")])];
        let incoming = vec![variant(
            "A1",
            "p",
            &[
                ("Option1 Name", "Color"),
                ("Option1 Value", "Red"),
                ("Option2 Name", "Size"),
                ("Option2 Value", "L"),
            ],
        )];
        let index = FeedIndex::build(&incoming, &schema());
        let records = removed_or_changed(&master, &index, &schema());
        assert_eq!(actions(&records), vec![Action::Remove, Action::Add]);
        assert_eq!(records[0].row, master[0]);
        assert_eq!(records[1].row, incoming[0]);
    }

    #[test]
    fn parent_change_is_replace() {
        let master = vec![variant("A1", "old", &[])];
        let incoming = vec![variant("A1", "new", &[])];
        let index = FeedIndex::build(&incoming, &schema());
        let records = removed_or_changed(&master, &index, &schema());
        assert_eq!(actions(&records), vec![Action::Remove, Action::Add]);
    }

    #[test]
    fn identical_rows_emit_nothing() {
        let master = vec![variant("A1", "p", &[("Vendor", "Acme"), ("Option1 Name", "Color")])];
        let incoming = master.clone();
        let index = FeedIndex::build(&incoming, &schema());
        assert!(removed_or_changed(&master, &index, &schema()).is_empty());
    }

    #[test]
    fn title_only_change_emits_nothing() {
        let master = vec![Row::from_pairs([("Variant SKU", "A1"), ("Handle", "p"), ("Title", "Old")])];
        let incoming = vec![Row::from_pairs([("Variant SKU", "A1"), ("Handle", "p"), ("Title", "New")])];
        let index = FeedIndex::build(&incoming, &schema());
        assert!(removed_or_changed(&master, &index, &schema()).is_empty());
    }

    #[test]
    fn update_blanks_unchanged_attributes() {
        let master = vec![variant("A1", "p", &[("Vendor", "Acme"), ("Type", "Chair")])];
        let incoming = vec![variant("A1", "p", &[("Vendor", "Acme"), ("Type", "Desk")])];
        let index = FeedIndex::build(&incoming, &schema());
        let records = removed_or_changed(&master, &index, &schema());

        assert_eq!(actions(&records), vec![Action::Update]);
        let update = &records[0];
        assert_eq!(update.row.get("Type"), Some("Desk"));
        assert_eq!(update.row.get("Vendor"), Some(""));
        assert_eq!(update.row.get("Title"), Some("T"));
        assert_eq!(update.row.get("Option1 Name"), Some(""));
        assert_eq!(update.changes.len(), 1);
        assert_eq!(update.changes[0].column, "Type");
        assert_eq!(update.changes[0].master.as_deref(), Some("Chair"));
    }

    #[test]
    fn column_missing_on_master_counts_as_change() {
        let master = vec![variant("A1", "p", &[])];
        let incoming = vec![variant("A1", "p", &[("Vendor", "")])];
        let changes = diff_fields(&master[0], &incoming[0], &schema());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].master, None);
        assert_eq!(changes[0].incoming.as_deref(), Some(""));
    }

    #[test]
    fn incoming_action_column_is_not_diffed() {
        let master = vec![variant("A1", "p", &[("Action", "Add")])];
        let incoming = vec![variant("A1", "p", &[("Action", "Remove")])];
        assert!(diff_fields(&master[0], &incoming[0], &schema()).is_empty());
    }

    #[test]
    fn option_value_change_is_update() {
        let master = vec![variant("A1", "prod-x", &[("Option1 Name", "Color"), ("Option1 Value", "Red")])];
        let incoming = vec![variant("A1", "prod-x", &[("Option1 Name", "Color"), ("Option1 Value", "Blue")])];
        let index = FeedIndex::build(&incoming, &schema());
        let records = removed_or_changed(&master, &index, &schema());
        assert_eq!(actions(&records), vec![Action::Update]);
        assert_eq!(records[0].row.get("Option1 Value"), Some("Blue"));
        assert_eq!(records[0].row.get("Option1 Name"), Some("Color"));
        assert_eq!(records[0].changes[0].column, "Option1 Value");
    }

    #[test]
    fn new_parent_and_new_variant_are_adds() {
        let master = vec![variant("A1", "p", &[])];
        let incoming = vec![
            variant("A1", "p", &[]),
            variant("A2", "p", &[]),
            variant("C3", "prod-z", &[]),
        ];
        let index = FeedIndex::build(&master, &schema());
        let records = newly_visible(&incoming, &index, &schema());
        let skus: Vec<_> = records.iter().map(|r| r.row.get("Variant SKU").unwrap()).collect();
        assert_eq!(skus, vec!["A2", "C3"]);
        assert!(records.iter().all(|r| r.action == Action::Add));
    }

    #[test]
    fn incoming_without_keys_is_add() {
        let master = vec![variant("A1", "p", &[])];
        let incoming = vec![variant("", "p", &[]), variant("X", "", &[])];
        let index = FeedIndex::build(&master, &schema());
        assert_eq!(newly_visible(&incoming, &index, &schema()).len(), 2);
    }
}
