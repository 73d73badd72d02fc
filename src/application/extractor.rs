//! Product extraction
//!
//! Flattens a decoded vendor payload (menus -> categories -> products ->
//! images) into [`ProductRecord`]s. Shape anomalies are tolerated by
//! defaulting, never raised: a missing field costs completeness of the row,
//! not the crawl.

use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use crate::domain::{MenuCategory, ProductRecord};
use crate::infrastructure::image_store::ImageStore;

/// Walks vendor payloads and triggers image downloads.
pub struct ProductExtractor<'a> {
    images: &'a ImageStore,
    product_delay: Duration,
}

impl<'a> ProductExtractor<'a> {
    pub fn new(images: &'a ImageStore, product_delay: Duration) -> Self {
        Self {
            images,
            product_delay,
        }
    }

    /// Extract every product under `payload.data.menus`. Missing or empty
    /// menus yield zero records.
    pub async fn extract(
        &self,
        vendor_id: i64,
        payload: &Value,
        user_agent: Option<&str>,
    ) -> Vec<ProductRecord> {
        let mut records = Vec::new();
        let Some(menus) = payload.pointer("/data/menus").and_then(Value::as_array) else {
            return records;
        };

        for menu in menus {
            let category = MenuCategory {
                category_id: menu.get("categoryId").and_then(Value::as_i64),
                category_title: menu
                    .get("category")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            };
            let products = menu.get("products").and_then(Value::as_array);
            for product in products.into_iter().flatten() {
                records.push(
                    self.extract_product(vendor_id, product, &category, user_agent)
                        .await,
                );
                if !self.product_delay.is_zero() {
                    tokio::time::sleep(self.product_delay).await;
                }
            }
        }
        records
    }

    async fn extract_product(
        &self,
        vendor_id: i64,
        product: &Value,
        category: &MenuCategory,
        user_agent: Option<&str>,
    ) -> ProductRecord {
        let base = str_field(product, "productTitle")
            .or_else(|| str_field(product, "title"))
            .unwrap_or_default();
        let variation = str_field(product, "productVariationTitle").unwrap_or_default();
        let title = format!("{base} {variation}").trim().to_string();

        let mut record = ProductRecord {
            vendor_id,
            vendor_product_id: product.get("id").and_then(Value::as_i64),
            product_id: product.get("productId").and_then(Value::as_i64),
            title,
            price: product.get("price").and_then(Value::as_f64),
            discount: product.get("discount").and_then(Value::as_f64).unwrap_or(0.0),
            discount_ratio: product
                .get("discountRatio")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            product_title: base,
            product_variation: variation,
            category_id: category.category_id,
            category_title: category.category_title.clone(),
            image_id: None,
            image_path: None,
        };

        // Every listed image goes into the cache; the first successful
        // download is the one the record references.
        let images = product.get("images").and_then(Value::as_array);
        for image in images.into_iter().flatten() {
            let Some(url) = str_field(image, "imageSrc").or_else(|| str_field(image, "url"))
            else {
                continue;
            };
            let image_id = image_id_of(image);
            match self
                .images
                .download(&url, vendor_id, &image_id, user_agent)
                .await
            {
                Ok(path) if record.image_id.is_none() => {
                    record = record.with_image(image_id, path.to_string_lossy().into_owned());
                }
                Ok(_) => {}
                Err(err) => warn!("[{}] image download failed: {:#}", vendor_id, err),
            }
        }
        record
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Upstream image ids are strings or numbers, and sometimes absent; a
/// synthesized id is only ever used for the save path, never sent back.
fn image_id_of(image: &Value) -> String {
    match image.get("imageId") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => uuid::Uuid::new_v4().simple().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(dir: &tempfile::TempDir) -> ImageStore {
        ImageStore::new(dir.path(), 1).unwrap()
    }

    #[tokio::test]
    async fn empty_menus_yield_zero_records() {
        let dir = tempfile::tempdir().unwrap();
        let images = store(&dir);
        let extractor = ProductExtractor::new(&images, Duration::ZERO);

        let payload = json!({"status": true, "data": {"menus": []}});
        let records = extractor.extract(1, &payload, None).await;
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn missing_menus_key_yields_zero_records() {
        let dir = tempfile::tempdir().unwrap();
        let images = store(&dir);
        let extractor = ProductExtractor::new(&images, Duration::ZERO);

        let records = extractor.extract(1, &json!({"status": true}), None).await;
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn flattens_products_with_category_association() {
        let dir = tempfile::tempdir().unwrap();
        let images = store(&dir);
        let extractor = ProductExtractor::new(&images, Duration::ZERO);

        let payload = json!({
            "status": true,
            "data": {
                "menus": [
                    {
                        "categoryId": 5,
                        "category": "Burgers",
                        "products": [
                            {
                                "id": 11,
                                "productId": 21,
                                "productTitle": "Cheese Burger",
                                "productVariationTitle": "Double",
                                "price": 185000,
                                "discount": 15000,
                                "discountRatio": 8
                            },
                            {
                                "id": 12,
                                "title": "Fries",
                                "price": 45000
                            }
                        ]
                    },
                    {
                        "category": "Drinks",
                        "products": [
                            {"id": 13, "productTitle": "Cola", "price": 20000}
                        ]
                    }
                ]
            }
        });

        let records = extractor.extract(7, &payload, None).await;
        assert_eq!(records.len(), 3);

        let burger = &records[0];
        assert_eq!(burger.vendor_id, 7);
        assert_eq!(burger.vendor_product_id, Some(11));
        assert_eq!(burger.product_id, Some(21));
        assert_eq!(burger.title, "Cheese Burger Double");
        assert_eq!(burger.product_title, "Cheese Burger");
        assert_eq!(burger.product_variation, "Double");
        assert_eq!(burger.category_id, Some(5));
        assert_eq!(burger.category_title, "Burgers");
        assert_eq!(burger.discount, 15000.0);
        assert_eq!(burger.discount_ratio, 8.0);

        // Missing discount fields default to zero, titles fall back.
        let fries = &records[1];
        assert_eq!(fries.title, "Fries");
        assert_eq!(fries.product_variation, "");
        assert_eq!(fries.discount, 0.0);
        assert_eq!(fries.discount_ratio, 0.0);
        assert!(fries.product_id.is_none());

        // Category id missing on the second menu.
        let cola = &records[2];
        assert!(cola.category_id.is_none());
        assert_eq!(cola.category_title, "Drinks");
    }

    #[tokio::test]
    async fn first_cached_image_populates_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let images = store(&dir);
        let extractor = ProductExtractor::new(&images, Duration::ZERO);

        // Pre-seed the cache so no network call is needed.
        let cached = images.path_for(3, "img1");
        std::fs::create_dir_all(cached.parent().unwrap()).unwrap();
        std::fs::write(&cached, b"jpeg").unwrap();

        let payload = json!({
            "status": true,
            "data": {"menus": [{"category": "Pizza", "products": [{
                "id": 1,
                "productTitle": "Margherita",
                "price": 1000,
                "images": [
                    {"imageId": "no-url-entry"},
                    {"imageId": "img1", "imageSrc": "http://127.0.0.1:1/unreachable"}
                ]
            }]}]}
        });

        let records = extractor.extract(3, &payload, Some("test-agent")).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].image_id.as_deref(), Some("img1"));
        assert_eq!(
            records[0].image_path.as_deref(),
            Some(cached.to_string_lossy().as_ref())
        );
    }

    #[tokio::test]
    async fn failed_download_leaves_both_image_fields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let images = store(&dir);
        let extractor = ProductExtractor::new(&images, Duration::ZERO);

        let payload = json!({
            "status": true,
            "data": {"menus": [{"category": "Pizza", "products": [{
                "id": 1,
                "productTitle": "Margherita",
                "images": [{"imageId": "x", "url": "http://127.0.0.1:1/unreachable"}]
            }]}]}
        });

        let records = extractor.extract(4, &payload, None).await;
        assert_eq!(records.len(), 1);
        assert!(records[0].image_id.is_none());
        assert!(records[0].image_path.is_none());
    }

    #[tokio::test]
    async fn numeric_image_ids_are_used_for_the_cache_key() {
        let dir = tempfile::tempdir().unwrap();
        let images = store(&dir);
        let extractor = ProductExtractor::new(&images, Duration::ZERO);

        let cached = images.path_for(9, "123");
        std::fs::create_dir_all(cached.parent().unwrap()).unwrap();
        std::fs::write(&cached, b"jpeg").unwrap();

        let payload = json!({
            "status": true,
            "data": {"menus": [{"products": [{
                "id": 1,
                "title": "Item",
                "images": [{"imageId": 123, "imageSrc": "http://127.0.0.1:1/x"}]
            }]}]}
        });

        let records = extractor.extract(9, &payload, None).await;
        assert_eq!(records[0].image_id.as_deref(), Some("123"));
    }
}
