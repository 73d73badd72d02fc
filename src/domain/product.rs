use serde::{Deserialize, Serialize};

/// Category context a product was found under, taken from the menu that
/// contained it. Both fields may be absent upstream.
#[derive(Debug, Clone, Default)]
pub struct MenuCategory {
    pub category_id: Option<i64>,
    pub category_title: String,
}

/// One flattened product row. Created once per product encountered and
/// never mutated afterwards.
///
/// Field declaration order is the column order of the CSV export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub vendor_id: i64,
    pub vendor_product_id: Option<i64>,
    pub product_id: Option<i64>,
    pub title: String,
    pub price: Option<f64>,
    pub discount: f64,
    pub discount_ratio: f64,
    pub product_title: String,
    pub product_variation: String,
    pub category_id: Option<i64>,
    pub category_title: String,
    pub image_id: Option<String>,
    pub image_path: Option<String>,
}

impl ProductRecord {
    /// Attach a downloaded image to the record. Either both image fields are
    /// populated or neither is; no partial reference is ever stored.
    pub fn with_image(mut self, image_id: String, image_path: String) -> Self {
        self.image_id = Some(image_id);
        self.image_path = Some(image_path);
        self
    }
}
