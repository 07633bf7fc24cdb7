// 📍 Location Record - the unit being classified
// Produced by scrapers or store queries; the engine only reads it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// Stable identity for reports; generated when the source has none
    #[serde(default = "default_uuid")]
    pub id: String,

    #[serde(default)]
    pub latitude: Option<f64>,

    #[serde(default)]
    pub longitude: Option<f64>,

    /// Free-text street address or location description
    #[serde(default)]
    pub address: Option<String>,

    /// Event or organization title
    #[serde(default)]
    pub name: Option<String>,

    /// Subdivision string supplied by the source, e.g. "OR"
    #[serde(default)]
    pub subdivision: Option<String>,

    #[serde(default)]
    pub city: Option<String>,

    #[serde(default)]
    pub country: Option<String>,

    /// Previously stored territory assignment (for audits and history)
    #[serde(default)]
    pub territory: Option<String>,
}

// Helper for serde defaults
fn default_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Non-geometric fields the contamination validator inspects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub name: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    /// County or city text that splits a shared subdivision
    pub sub_area: Option<String>,
}

impl RecordMetadata {
    pub fn with_country(mut self, country: &str) -> Self {
        self.country = Some(country.to_string());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_city(mut self, city: &str) -> Self {
        self.city = Some(city.to_string());
        self
    }

    pub fn with_sub_area(mut self, sub_area: &str) -> Self {
        self.sub_area = Some(sub_area.to_string());
        self
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl LocationRecord {
    pub fn new() -> Self {
        LocationRecord {
            id: default_uuid(),
            ..Default::default()
        }
    }

    /// Builder pattern: add coordinates
    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Builder pattern: add address text
    pub fn with_address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }

    /// Builder pattern: add event/organization name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Builder pattern: add supplied subdivision string
    pub fn with_subdivision(mut self, subdivision: &str) -> Self {
        self.subdivision = Some(subdivision.to_string());
        self
    }

    pub fn with_country(mut self, country: &str) -> Self {
        self.country = Some(country.to_string());
        self
    }

    pub fn with_territory(mut self, territory: &str) -> Self {
        self.territory = Some(territory.to_string());
        self
    }

    /// Both coordinates, or nothing
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    pub fn address_text(&self) -> Option<&str> {
        non_blank(&self.address)
    }

    pub fn name_text(&self) -> Option<&str> {
        non_blank(&self.name)
    }

    pub fn supplied_subdivision(&self) -> Option<&str> {
        non_blank(&self.subdivision)
    }

    pub fn stored_territory(&self) -> Option<&str> {
        non_blank(&self.territory)
    }

    /// Address and city joined, for county/city lookup in split subdivisions
    pub fn sub_area_hint(&self) -> Option<String> {
        match (self.address_text(), non_blank(&self.city)) {
            (Some(address), Some(city)) => Some(format!("{}, {}", address, city)),
            (Some(address), None) => Some(address.to_string()),
            (None, Some(city)) => Some(city.to_string()),
            (None, None) => None,
        }
    }

    pub fn metadata(&self) -> RecordMetadata {
        RecordMetadata {
            name: self.name.clone(),
            city: self.city.clone(),
            country: self.country.clone(),
            sub_area: self.sub_area_hint(),
        }
    }
}

/// Load location records from CSV. Columns match the field names; all but
/// the header row are optional per record.
pub fn load_records_csv(csv_path: &Path) -> Result<Vec<LocationRecord>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file: {:?}", csv_path))?;

    let mut records = Vec::new();

    for (line, result) in rdr.deserialize().enumerate() {
        let mut record: LocationRecord =
            result.with_context(|| format!("Failed to deserialize record on row {}", line + 2))?;

        if record.id.trim().is_empty() {
            record.id = default_uuid();
        }

        records.push(record);
    }

    Ok(records)
}
