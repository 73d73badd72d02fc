use serde::{Deserialize, Serialize};

/// A marketplace vendor (restaurant or grocery store) as loaded from the
/// input sheet. Immutable once loaded; one per input row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vendor {
    pub vendor_id: i64,
    pub vendor_code: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub vendor_title: Option<String>,
}
