use serde::{Deserialize, Serialize};
use std::path::Path;

/// The link configuration: which field keys each document, which secondary
/// fields become which new building attributes, and (for CSV mode) the
/// requested output columns.
#[derive(Debug, Deserialize, Serialize)]
pub struct LinkConfig {
    /// Target field resolved per building in the primary document.
    pub primary_field: String,
    /// Target field searched for in the secondary dataset.
    pub secondary_field: String,
    #[serde(default)]
    pub attributes: Vec<AttributeMapping>,
    #[serde(default)]
    pub csv_columns: Vec<String>,
    /// Legacy matching mode: reduce numeric-list primary keys to a
    /// min/max range and match secondary scalars by membership.
    #[serde(default)]
    pub numeric_range_keys: bool,
}

/// Declares that secondary field `source` becomes a generic attribute
/// named `name` on matched buildings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttributeMapping {
    pub source: String,
    pub name: String,
}

impl LinkConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
