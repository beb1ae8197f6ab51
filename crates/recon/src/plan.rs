//! Catalog mutation planning from the product upload view.
//!
//! Turns exported product rows into typed per-product plans. Executing a
//! plan against a storefront API happens elsewhere.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::config::{FeedSchema, ProductFields};
use crate::model::{Action, Row, ACTION_COLUMN};

/// Status given to products created from a plan.
pub const CREATED_STATUS: &str = "ACTIVE";

/// Whole-product deletes above this many variants go through the async
/// delete path.
pub const ASYNC_DELETE_THRESHOLD: usize = 50;

// ---------------------------------------------------------------------------
// Plan types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionValue {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantInput {
    pub sku: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    pub taxable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    pub options: Vec<OptionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaInput {
    pub source: String,
    pub alt: String,
}

/// Everything needed to create a product that does not exist yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDraft {
    pub title: String,
    pub body_html: String,
    pub vendor: String,
    pub product_type: String,
    pub tags: Vec<String>,
    pub options: Vec<String>,
    pub status: String,
    pub variants: Vec<VariantInput>,
    pub media: Vec<MediaInput>,
}

/// Product-level fields to patch on update. `None` leaves the field alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// All mutations for one product, grouped by title.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductPlan {
    pub title: String,
    pub remove: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<ProductPatch>,
    pub update: Vec<VariantInput>,
    pub add: Vec<VariantInput>,
    /// Used instead of `add` when the product does not exist remotely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create: Option<ProductDraft>,
}

impl ProductPlan {
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.update.is_empty() && self.add.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Group product rows by title (first-appearance order) and split each
/// group by action. Rows with an unknown action are skipped.
pub fn plan_products(rows: &[Row], schema: &FeedSchema, fields: &ProductFields) -> Vec<ProductPlan> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&Row>> = HashMap::new();
    for row in rows {
        let title = row.get(&schema.title).unwrap_or("");
        groups
            .entry(title)
            .or_insert_with(|| {
                order.push(title);
                Vec::new()
            })
            .push(row);
    }

    order
        .into_iter()
        .filter_map(|title| groups.remove(title).map(|group| (title, group)))
        .map(|(title, group)| plan_product(title, &group, schema, fields))
        .collect()
}

fn plan_product(title: &str, group: &[&Row], schema: &FeedSchema, fields: &ProductFields) -> ProductPlan {
    let mut removes = Vec::new();
    let mut updates = Vec::new();
    let mut adds = Vec::new();

    for &row in group {
        let tag = row.get(ACTION_COLUMN).unwrap_or("");
        match Action::parse(tag) {
            Some(Action::Remove) => removes.push(row),
            Some(Action::Update) => updates.push(row),
            Some(Action::Add) => adds.push(row),
            None => log::warn!("product '{title}': skipping row with action '{tag}'"),
        }
    }

    let remove = removes
        .iter()
        .filter_map(|row| row.key(&schema.variant_key))
        .map(str::to_string)
        .collect();

    let patch = updates.first().map(|row| product_patch(row, schema, fields));

    ProductPlan {
        title: title.to_string(),
        remove,
        patch,
        update: updates.iter().map(|row| variant_input(row, schema, fields)).collect(),
        add: adds.iter().map(|row| variant_input(row, schema, fields)).collect(),
        create: (!adds.is_empty()).then(|| product_draft(title, group, schema, fields)),
    }
}

fn non_empty(row: &Row, column: &str) -> Option<String> {
    row.key(column).map(str::to_string)
}

fn option_names(row: &Row, schema: &FeedSchema) -> Vec<String> {
    schema
        .options
        .iter()
        .filter_map(|slot| non_empty(row, &slot.name))
        .collect()
}

fn product_patch(row: &Row, schema: &FeedSchema, fields: &ProductFields) -> ProductPatch {
    ProductPatch {
        vendor: non_empty(row, &fields.vendor),
        tags: non_empty(row, &fields.tags),
        product_type: non_empty(row, &fields.product_type),
        body_html: non_empty(row, &fields.body_html),
        status: row.key(&fields.status).map(str::to_uppercase),
        options: option_names(row, schema),
    }
}

/// Grams to kilograms. Empty or unparseable weights yield `None`.
pub fn weight_kg(grams: &str) -> Option<f64> {
    grams.trim().parse::<f64>().ok().map(|g| g / 1000.0)
}

pub fn variant_input(row: &Row, schema: &FeedSchema, fields: &ProductFields) -> VariantInput {
    VariantInput {
        sku: row.get(&schema.variant_key).unwrap_or("").to_string(),
        barcode: non_empty(row, &fields.barcode),
        taxable: row
            .get(&fields.taxable)
            .is_some_and(|v| v.to_lowercase() == "true"),
        inventory_policy: row.key(&fields.inventory_policy).map(str::to_uppercase),
        weight_kg: row.key(&fields.grams).and_then(weight_kg),
        options: schema
            .options
            .iter()
            .filter_map(|slot| {
                Some(OptionValue {
                    name: non_empty(row, &slot.name)?,
                    value: non_empty(row, &slot.value)?,
                })
            })
            .collect(),
        image: non_empty(row, &fields.image),
    }
}

fn product_draft(title: &str, group: &[&Row], schema: &FeedSchema, fields: &ProductFields) -> ProductDraft {
    let base = group[0];
    let text = |column: &str| base.get(column).unwrap_or("").to_string();

    let tags = base
        .key(&fields.tags)
        .map(|tags| {
            tags.split(fields.tag_separator.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let media = group
        .iter()
        .filter_map(|row| {
            let source = non_empty(row, &fields.image)?;
            let sku = row.get(&schema.variant_key).unwrap_or("");
            Some(MediaInput {
                source,
                alt: format!("Image for SKU: {sku}"),
            })
        })
        .collect();

    ProductDraft {
        title: title.to_string(),
        body_html: text(&fields.body_html),
        vendor: text(&fields.vendor),
        product_type: text(&fields.product_type),
        tags,
        options: option_names(base, schema),
        status: CREATED_STATUS.to_string(),
        variants: group.iter().map(|row| variant_input(row, schema, fields)).collect(),
        media,
    }
}

// ---------------------------------------------------------------------------
// Removal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemovalAction {
    /// None of the requested SKUs exist on the product.
    Nothing,
    DeleteVariants { skus: Vec<String> },
    /// Every variant was requested: delete the product itself.
    DeleteProduct { asynchronous: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovalPlan {
    pub action: RemovalAction,
    /// Requested SKUs the product does not have.
    pub missing: Vec<String>,
}

impl RemovalPlan {
    /// Decide how to remove `requested` SKUs from a product whose current
    /// variants are `existing`.
    pub fn resolve(requested: &[String], existing: &[String]) -> Self {
        let existing_set: HashSet<&str> = existing.iter().map(String::as_str).collect();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut matched = Vec::new();
        let mut missing = Vec::new();

        for sku in requested {
            if !existing_set.contains(sku.as_str()) {
                missing.push(sku.clone());
            } else if seen.insert(sku.as_str()) {
                matched.push(sku.clone());
            }
        }

        let action = if matched.is_empty() {
            RemovalAction::Nothing
        } else if matched.len() == existing_set.len() {
            RemovalAction::DeleteProduct {
                asynchronous: matched.len() > ASYNC_DELETE_THRESHOLD,
            }
        } else {
            RemovalAction::DeleteVariants { skus: matched }
        };

        Self { action, missing }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_row(action: &str, title: &str, sku: &str, extra: &[(&str, &str)]) -> Row {
        let mut pairs = vec![
            ("Variant SKU", sku),
            ("Handle", "h"),
            ("Title", title),
            ("Action", action),
        ];
        pairs.extend_from_slice(extra);
        Row::from_pairs(pairs)
    }

    fn plans(rows: &[Row]) -> Vec<ProductPlan> {
        plan_products(rows, &FeedSchema::default(), &ProductFields::default())
    }

    #[test]
    fn groups_by_title_in_first_appearance_order() {
        let rows = vec![
            product_row("Add", "Desk", "D1", &[]),
            product_row("remove", "Chair", "C1", &[]),
            product_row("ADD", "Desk", "D2", &[]),
        ];
        let out = plans(&rows);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "Desk");
        assert_eq!(out[0].add.len(), 2);
        assert_eq!(out[1].remove, vec!["C1"]);
        assert!(out[1].create.is_none());
    }

    #[test]
    fn unknown_action_is_skipped() {
        let rows = vec![product_row("Archive", "Desk", "D1", &[])];
        let out = plans(&rows);
        assert!(out[0].is_empty());
    }

    #[test]
    fn variant_mapping() {
        let row = product_row(
            "Update",
            "Desk",
            "D1",
            &[
                ("Variant Grams", "2500"),
                ("Variant Taxable", "TRUE"),
                ("Variant Inventory Policy", "continue"),
                ("Variant Barcode", ""),
                ("Option1 Name", "Colour"),
                ("Option1 Value", "Oak"),
                ("Option2 Name", "Size"),
                ("Option2 Value", ""),
            ],
        );
        let v = variant_input(&row, &FeedSchema::default(), &ProductFields::default());
        assert_eq!(v.sku, "D1");
        assert_eq!(v.weight_kg, Some(2.5));
        assert!(v.taxable);
        assert_eq!(v.inventory_policy.as_deref(), Some("CONTINUE"));
        assert_eq!(v.barcode, None);
        assert_eq!(
            v.options,
            vec![OptionValue {
                name: "Colour".into(),
                value: "Oak".into()
            }]
        );
    }

    #[test]
    fn weight_parsing() {
        assert_eq!(weight_kg("1000"), Some(1.0));
        assert_eq!(weight_kg(" 250 "), Some(0.25));
        assert_eq!(weight_kg("heavy"), None);
        assert_eq!(weight_kg(""), None);
    }

    #[test]
    fn draft_from_first_row_of_group() {
        let rows = vec![
            product_row(
                "Add",
                "Desk",
                "D1",
                &[
                    ("Vendor", "Acme"),
                    ("Tags", "office, oak, desk"),
                    ("Option1 Name", "Colour"),
                    ("Variant Image", "https://img/d1.jpg"),
                ],
            ),
            product_row("Add", "Desk", "D2", &[("Vendor", "Other")]),
        ];
        let out = plans(&rows);
        let draft = out[0].create.as_ref().unwrap();
        assert_eq!(draft.vendor, "Acme");
        assert_eq!(draft.tags, vec!["office", "oak", "desk"]);
        assert_eq!(draft.options, vec!["Colour"]);
        assert_eq!(draft.status, "ACTIVE");
        assert_eq!(draft.variants.len(), 2);
        assert_eq!(draft.media.len(), 1);
        assert_eq!(draft.media[0].alt, "Image for SKU: D1");
    }

    #[test]
    fn patch_from_first_update_row() {
        let rows = vec![
            product_row("Update", "Desk", "D1", &[("Vendor", ""), ("Status", "draft")]),
            product_row("Update", "Desk", "D2", &[("Vendor", "Acme")]),
        ];
        let out = plans(&rows);
        let patch = out[0].patch.as_ref().unwrap();
        assert_eq!(patch.vendor, None);
        assert_eq!(patch.status.as_deref(), Some("DRAFT"));
        assert!(!patch.is_empty());
        assert_eq!(out[0].update.len(), 2);
    }

    fn skus(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn removal_of_some_variants() {
        let plan = RemovalPlan::resolve(&skus(&["A", "X"]), &skus(&["A", "B"]));
        assert_eq!(plan.action, RemovalAction::DeleteVariants { skus: skus(&["A"]) });
        assert_eq!(plan.missing, skus(&["X"]));
    }

    #[test]
    fn removal_of_every_variant_deletes_product() {
        let plan = RemovalPlan::resolve(&skus(&["B", "A", "A"]), &skus(&["A", "B"]));
        assert_eq!(plan.action, RemovalAction::DeleteProduct { asynchronous: false });
    }

    #[test]
    fn large_product_deletes_asynchronously() {
        let all: Vec<String> = (0..51).map(|i| format!("S{i}")).collect();
        let plan = RemovalPlan::resolve(&all, &all);
        assert_eq!(plan.action, RemovalAction::DeleteProduct { asynchronous: true });

        let fifty = &all[..50];
        let plan = RemovalPlan::resolve(fifty, fifty);
        assert_eq!(plan.action, RemovalAction::DeleteProduct { asynchronous: false });
    }

    #[test]
    fn removal_with_no_match_does_nothing() {
        let plan = RemovalPlan::resolve(&skus(&["X"]), &skus(&["A"]));
        assert_eq!(plan.action, RemovalAction::Nothing);
        assert_eq!(plan.missing, skus(&["X"]));
    }
}
