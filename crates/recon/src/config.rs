use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::ACTION_COLUMN;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Everything the pipeline needs beyond the two feeds. Every section
/// falls back to the production catalog layout.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub schema: FeedSchema,
    #[serde(default)]
    pub views: ViewsConfig,
    #[serde(default)]
    pub metafields: MetafieldConfig,
    #[serde(default)]
    pub products: ProductFields,
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Names of the semantically privileged columns of a feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedSchema {
    pub variant_key: String,
    pub parent_key: String,
    pub title: String,
    pub options: [OptionSlot; 3],
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OptionSlot {
    pub name: String,
    pub value: String,
}

impl OptionSlot {
    fn numbered(n: u8) -> Self {
        Self {
            name: format!("Option{n} Name"),
            value: format!("Option{n} Value"),
        }
    }
}

impl Default for FeedSchema {
    fn default() -> Self {
        Self {
            variant_key: "Variant SKU".into(),
            parent_key: "Handle".into(),
            title: "Title".into(),
            options: [OptionSlot::numbered(1), OptionSlot::numbered(2), OptionSlot::numbered(3)],
        }
    }
}

impl FeedSchema {
    /// Variant key, parent key, title.
    pub fn key_fields(&self) -> [&str; 3] {
        [&self.variant_key, &self.parent_key, &self.title]
    }

    /// The six option columns, names before values.
    pub fn option_fields(&self) -> impl Iterator<Item = &str> {
        self.options
            .iter()
            .map(|slot| slot.name.as_str())
            .chain(self.options.iter().map(|slot| slot.value.as_str()))
    }

    /// Key, option or action column: never diffed as a plain attribute.
    pub fn is_structural(&self, column: &str) -> bool {
        column == ACTION_COLUMN
            || self.key_fields().contains(&column)
            || self.option_fields().any(|f| f == column)
    }

    fn validate(&self) -> Result<(), ReconError> {
        let mut seen = HashSet::new();
        for name in self.key_fields().into_iter().chain(self.option_fields()) {
            if name.is_empty() {
                return Err(ReconError::ConfigValidation(
                    "schema field names must not be empty".into(),
                ));
            }
            if !seen.insert(name) {
                return Err(ReconError::ConfigValidation(format!(
                    "schema field '{name}' is used twice"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// One export view: ordered allow-list plus the columns that may be the
/// only non-empty ones on a row that still gets dropped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ViewConfig {
    pub file: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub key_columns: Vec<String>,
}

impl ViewConfig {
    pub fn is_key(&self, column: &str) -> bool {
        self.key_columns.iter().any(|k| k == column)
    }

    fn validate(&self, name: &str) -> Result<(), ReconError> {
        if self.file.trim().is_empty() {
            return Err(ReconError::ConfigValidation(format!("view '{name}': file is empty")));
        }
        if self.columns.is_empty() {
            return Err(ReconError::ConfigValidation(format!("view '{name}': no columns")));
        }
        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.as_str()) {
                return Err(ReconError::DuplicateColumn {
                    view: name.into(),
                    column: column.clone(),
                });
            }
        }
        for key in &self.key_columns {
            if !seen.contains(key.as_str()) {
                return Err(ReconError::UnknownKeyColumn {
                    view: name.into(),
                    column: key.clone(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ViewsConfig {
    #[serde(default = "default_product_view")]
    pub product: ViewConfig,
    #[serde(default = "default_metafield_view")]
    pub metafield: ViewConfig,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            product: default_product_view(),
            metafield: default_metafield_view(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_product_view() -> ViewConfig {
    ViewConfig {
        file: "product_for_upload.csv".into(),
        columns: strings(&[
            "Variant SKU",
            "Handle",
            "Title",
            "Option1 Name",
            "Option1 Value",
            "Option2 Name",
            "Option2 Value",
            "Option3 Name",
            "Option3 Value",
            "Action",
            "Body (HTML)",
            "Vendor",
            "Product Category",
            "Type",
            "Tags",
            "Variant Grams",
            "Variant Barcode",
            "Variant Inventory Policy",
            "Variant Fulfillment Service",
            "Variant Taxable",
            "Variant Image",
            "Variant Weight Unit",
            "Status",
        ]),
        key_columns: strings(&[
            "Variant SKU",
            "Handle",
            "Title",
            "Option1 Name",
            "Option1 Value",
            "Option2 Name",
            "Option2 Value",
            "Option3 Name",
            "Option3 Value",
            "Action",
            "Variant Grams",
        ]),
    }
}

fn default_metafield_view() -> ViewConfig {
    ViewConfig {
        file: "metafield_for_upload.csv".into(),
        columns: strings(&[
            "Variant SKU",
            "Handle",
            "Title",
            "SEO Title",
            "SEO Description",
            "product_colour",
            "primary_colour",
            "primary_colour_hex_code",
            "secondary_colour",
            "secondary_colour_hex_code",
            "Material",
            "Base/Frame Material",
            "chair_base_material",
            "fire_retardant_level",
            "Component Guarantee",
            "Upholstery Guarantee",
            "usage_recommended_in_hours",
            "weight_tolerance_text_value",
            "desk_top_thickness_mm",
            "side_panel_thickness_mm",
            "back_panel_thickness_mm",
            "modesty_panel_thickness_mm",
            "cable_port_diameter_mm",
            "steel_leg_thickness_mm",
            "steel_tube_profile_mm",
            "quantity_of_drawers",
            "quantity_of_shelves",
            "shelf_width_mm",
            "shelf_depth_mm",
            "shelf_thickness_mm",
            "gross_package_weight_kg",
            "nett_weight_kg",
            "package_volume_m³",
            "effective_volume_m³",
            "package_width_mm",
            "package_depth_mm",
            "package_height_mm",
            "product_width_mm",
            "product_depth_mm",
            "product_height_minimum_mm",
            "product_height_maximum_mm",
            "seat_height_minimum_mm",
            "seat_height_maximum_mm",
            "Seat_Pad_Thickness_mm",
            "seat_pad_width_mm",
            "seat_pad_depth_mm",
            "Seat_Back_Thickness_mm",
            "seat_back_height_mm",
            "seat_back_width_mm",
            "Mechanism Locking Positions",
            "Mechanism Type",
            "Anti Tilt Mechanism (Y/N)",
            "Arm Type",
            "arm_height_from_seat_pad_minimum_mm",
            "arm_height_from_seat_pad_maximum_mm",
            "arm_height_from_floor_minimum_mm",
            "arm_height_from_floor_maximum_mm",
            "arm_height_as_a_component_minimum_mm",
            "arm_height_as_a_component_maximum_mm",
            "seat_slide_adjustment_mm",
            "Gas Lift Colour",
            "gas_lift_size_mm",
            "castor_size_mm",
            "Foot Type",
            "foot_adjustment_mm",
            "chair_base_diameter_mm",
            "stacking_quantity",
            "ISPC 2 Description",
            "ISPC 2",
            "overall_dimensions",
            "Product Family",
            "Sub-Family",
            "unlimited",
            "Classification",
            "Shopify Filter Category",
        ]),
        key_columns: strings(&["Variant SKU", "Handle", "Title"]),
    }
}

// ---------------------------------------------------------------------------
// Downstream mapping
// ---------------------------------------------------------------------------

/// How metafield rows become typed metafield writes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MetafieldConfig {
    pub namespace: String,
    /// Max metafields per write; the destination API rejects larger batches.
    pub batch_size: usize,
    pub default_type: String,
    /// Normalized metafield key → metafield type.
    pub types: BTreeMap<String, String>,
}

impl Default for MetafieldConfig {
    fn default() -> Self {
        let text = "single_line_text_field";
        Self {
            namespace: "main".into(),
            batch_size: 25,
            default_type: text.into(),
            types: ["seo_title", "seo_description", "product_colour", "primary_colour"]
                .into_iter()
                .map(|key| (key.to_string(), text.to_string()))
                .collect(),
        }
    }
}

impl MetafieldConfig {
    pub fn type_for(&self, key: &str) -> &str {
        self.types.get(key).map(String::as_str).unwrap_or(&self.default_type)
    }
}

/// Product-view columns read when planning catalog mutations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProductFields {
    pub body_html: String,
    pub vendor: String,
    pub product_type: String,
    pub tags: String,
    pub tag_separator: String,
    pub barcode: String,
    pub taxable: String,
    pub inventory_policy: String,
    pub grams: String,
    pub image: String,
    pub status: String,
}

impl Default for ProductFields {
    fn default() -> Self {
        Self {
            body_html: "Body (HTML)".into(),
            vendor: "Vendor".into(),
            product_type: "Type".into(),
            tags: "Tags".into(),
            tag_separator: ", ".into(),
            barcode: "Variant Barcode".into(),
            taxable: "Variant Taxable".into(),
            inventory_policy: "Variant Inventory Policy".into(),
            grams: "Variant Grams".into(),
            image: "Variant Image".into(),
            status: "Status".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl SyncConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: SyncConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        self.schema.validate()?;
        self.views.product.validate("product")?;
        self.views.metafield.validate("metafield")?;

        if self.views.product.file == self.views.metafield.file {
            return Err(ReconError::ConfigValidation(format!(
                "both views write to '{}'",
                self.views.product.file
            )));
        }

        if self.metafields.batch_size == 0 {
            return Err(ReconError::ConfigValidation(
                "metafields.batch_size must be at least 1".into(),
            ));
        }

        if self.metafields.namespace.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "metafields.namespace must not be empty".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
