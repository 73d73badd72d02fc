//! Vendor input sheet reader
//!
//! Loads the tabular vendor list into memory. Missing required columns are a
//! configuration error surfaced before any network activity.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::domain::Vendor;

const REQUIRED_COLUMNS: [&str; 4] = ["vendor_id", "vendor_code", "lat", "lon"];

/// Read all vendors from a CSV file with columns
/// `vendor_id, vendor_code, lat, lon` and optionally `vendor_title`.
pub fn load_vendors(path: &Path) -> Result<Vec<Vendor>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open vendor file {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("vendor file {} has no header row", path.display()))?;
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .into_iter()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        bail!("vendor file missing columns: {}", missing.join(", "));
    }

    let mut vendors = Vec::new();
    for (index, row) in reader.deserialize().enumerate() {
        let vendor: Vendor =
            row.with_context(|| format!("malformed vendor row {}", index + 2))?;
        vendors.push(vendor);
    }

    info!("Loaded {} vendors from {}", vendors.len(), path.display());
    Ok(vendors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_vendors_with_optional_title() {
        let file = write_csv(
            "vendor_id,vendor_code,lat,lon,vendor_title\n\
             101,abc123,35.7,51.4,Cafe One\n\
             102,def456,35.8,51.5,\n",
        );
        let vendors = load_vendors(file.path()).unwrap();
        assert_eq!(vendors.len(), 2);
        assert_eq!(vendors[0].vendor_id, 101);
        assert_eq!(vendors[0].vendor_code, "abc123");
        assert_eq!(vendors[0].vendor_title.as_deref(), Some("Cafe One"));
        assert_eq!(vendors[1].lat, 35.8);
    }

    #[test]
    fn loads_vendors_without_title_column() {
        let file = write_csv("vendor_id,vendor_code,lat,lon\n1,x,1.0,2.0\n");
        let vendors = load_vendors(file.path()).unwrap();
        assert_eq!(vendors.len(), 1);
        assert!(vendors[0].vendor_title.is_none());
    }

    #[test]
    fn missing_column_is_named_in_the_error() {
        let file = write_csv("vendor_id,vendor_code,lat\n1,x,1.0\n");
        let err = load_vendors(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("lon"), "error was {err:#}");
    }

    #[test]
    fn all_missing_columns_are_reported() {
        let file = write_csv("name,city\na,b\n");
        let err = format!("{:#}", load_vendors(file.path()).unwrap_err());
        for column in REQUIRED_COLUMNS {
            assert!(err.contains(column), "error {err} missing {column}");
        }
    }

    #[test]
    fn empty_sheet_yields_no_vendors() {
        let file = write_csv("vendor_id,vendor_code,lat,lon\n");
        let vendors = load_vendors(file.path()).unwrap();
        assert!(vendors.is_empty());
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let err = load_vendors(Path::new("does/not/exist.csv")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to open"));
    }
}
