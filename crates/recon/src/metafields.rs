use std::collections::HashMap;

use serde::Serialize;

use crate::config::{FeedSchema, MetafieldConfig};
use crate::model::Row;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metafield {
    pub namespace: String,
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One write of at most `batch_size` metafields against a single variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetafieldBatch {
    pub handle: String,
    pub sku: String,
    pub metafields: Vec<Metafield>,
}

/// Column name → metafield key: spaces become underscores, lowercased.
pub fn metafield_key(column: &str) -> String {
    column.replace(' ', "_").to_lowercase()
}

/// Map metafield rows to batches, grouped by handle in first-appearance
/// order. Handle and variant key columns are not metafields; empty values
/// are skipped. Rows without a variant key are skipped.
pub fn plan_metafields(
    rows: &[Row],
    schema: &FeedSchema,
    config: &MetafieldConfig,
) -> Vec<MetafieldBatch> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&Row>> = HashMap::new();
    for row in rows {
        let handle = row.get(&schema.parent_key).unwrap_or("");
        groups
            .entry(handle)
            .or_insert_with(|| {
                order.push(handle);
                Vec::new()
            })
            .push(row);
    }

    let batch_size = config.batch_size.max(1);
    let mut batches = Vec::new();

    for handle in order {
        for row in groups.remove(handle).unwrap_or_default() {
            let Some(sku) = row.key(&schema.variant_key) else {
                log::warn!("handle '{handle}': skipping metafield row without variant key");
                continue;
            };

            let metafields: Vec<Metafield> = row
                .iter()
                .filter(|(column, value)| {
                    *column != schema.parent_key && *column != schema.variant_key && !value.is_empty()
                })
                .map(|(column, value)| {
                    let key = metafield_key(column);
                    Metafield {
                        namespace: config.namespace.clone(),
                        kind: config.type_for(&key).to_string(),
                        key,
                        value: value.to_string(),
                    }
                })
                .collect();

            for chunk in metafields.chunks(batch_size) {
                batches.push(MetafieldBatch {
                    handle: handle.to_string(),
                    sku: sku.to_string(),
                    metafields: chunk.to_vec(),
                });
            }
        }
    }

    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_normalization() {
        assert_eq!(metafield_key("SEO Title"), "seo_title");
        assert_eq!(metafield_key("Base/Frame Material"), "base/frame_material");
        assert_eq!(metafield_key("package_volume_m³"), "package_volume_m³");
    }

    #[test]
    fn rows_become_typed_metafields() {
        let rows = vec![Row::from_pairs([
            ("Variant SKU", "A1"),
            ("Handle", "desk"),
            ("Title", "Desk"),
            ("SEO Title", "Best desk"),
            ("Material", ""),
        ])];
        let batches = plan_metafields(&rows, &FeedSchema::default(), &MetafieldConfig::default());
        assert_eq!(batches.len(), 1);
        let keys: Vec<&str> = batches[0].metafields.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, vec!["title", "seo_title"]);
        assert_eq!(batches[0].metafields[1].kind, "single_line_text_field");
        assert_eq!(batches[0].metafields[1].namespace, "main");
        assert_eq!(batches[0].sku, "A1");
    }

    #[test]
    fn configured_type_and_default() {
        let mut config = MetafieldConfig::default();
        config.default_type = "multi_line_text_field".into();
        config.types.insert("material".into(), "list.single_line_text_field".into());
        let rows = vec![Row::from_pairs([
            ("Variant SKU", "A1"),
            ("Handle", "desk"),
            ("Material", "Oak"),
            ("Arm Type", "Fixed"),
        ])];
        let batches = plan_metafields(&rows, &FeedSchema::default(), &config);
        let kinds: Vec<&str> = batches[0].metafields.iter().map(|m| m.kind.as_str()).collect();
        assert_eq!(kinds, vec!["list.single_line_text_field", "multi_line_text_field"]);
    }

    #[test]
    fn chunks_at_batch_size() {
        let mut pairs = vec![("Variant SKU".to_string(), "A1".to_string()), ("Handle".into(), "h".into())];
        for i in 0..60 {
            pairs.push((format!("field {i}"), "x".into()));
        }
        let rows = vec![Row::from_pairs(pairs)];
        let batches = plan_metafields(&rows, &FeedSchema::default(), &MetafieldConfig::default());
        let sizes: Vec<usize> = batches.iter().map(|b| b.metafields.len()).collect();
        assert_eq!(sizes, vec![25, 25, 10]);
    }

    #[test]
    fn groups_by_handle_and_skips_missing_sku() {
        let rows = vec![
            Row::from_pairs([("Variant SKU", "B1"), ("Handle", "b"), ("Material", "x")]),
            Row::from_pairs([("Variant SKU", "A1"), ("Handle", "a"), ("Material", "y")]),
            Row::from_pairs([("Variant SKU", "B2"), ("Handle", "b"), ("Material", "z")]),
            Row::from_pairs([("Variant SKU", ""), ("Handle", "a"), ("Material", "w")]),
        ];
        let batches = plan_metafields(&rows, &FeedSchema::default(), &MetafieldConfig::default());
        let skus: Vec<&str> = batches.iter().map(|b| b.sku.as_str()).collect();
        assert_eq!(skus, vec!["B1", "B2", "A1"]);
    }
}
