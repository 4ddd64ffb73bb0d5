//! Runtime configuration for the graph pipeline.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Coordinate reference systems used by the pipeline.
///
/// Geometries travel in two reference systems: a projected working CRS
/// (metric, used for lengths and exposure distances) and a geographic CRS
/// for interchange with clients. The defaults are EPSG 3879 (ETRS-GK25,
/// Helsinki region) and EPSG 4326 (WGS84).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    /// EPSG code of the projected working CRS
    pub proj_crs_epsg: u32,
    /// EPSG code of the geographic CRS
    pub geographic_crs_epsg: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            proj_crs_epsg: 3879,
            geographic_crs_epsg: 4326,
        }
    }
}

impl GraphConfig {
    /// Load configuration from a JSON file. Missing fields fall back to
    /// the defaults; unknown fields are rejected.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&text).map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = GraphConfig::default();
        assert_eq!(config.proj_crs_epsg, 3879);
        assert_eq!(config.geographic_crs_epsg, 4326);
    }

    #[test]
    fn test_from_json_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"proj_crs_epsg": 3067}}"#).unwrap();

        let config = GraphConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.proj_crs_epsg, 3067);
        assert_eq!(config.geographic_crs_epsg, 4326);
    }

    #[test]
    fn test_from_json_file_unknown_field() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"projection": 3067}}"#).unwrap();

        assert!(GraphConfig::from_json_file(file.path()).is_err());
    }
}
