//! Read-only density and composition reference data.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ReferenceError;
use crate::text::normalize_label;

/// One food entry: density plus nutrient composition per 100 g.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionRecord {
    /// Free-text food description, e.g. "chicken, breast, grilled"
    pub label: String,
    /// g/cm³
    pub density: f64,
    /// Nutrient name to amount per 100 g (units are part of the name, e.g. "protein_g")
    #[serde(default)]
    pub nutrients_per_100g: BTreeMap<String, f64>,
    /// Database the row came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl NutritionRecord {
    fn validate(&self, index: usize) -> Result<(), ReferenceError> {
        if normalize_label(&self.label).is_empty() {
            return Err(ReferenceError::EmptyLabel { index });
        }
        if !(self.density.is_finite() && self.density > 0.0) {
            return Err(ReferenceError::InvalidDensity {
                label: self.label.clone(),
                density: self.density,
            });
        }
        for (nutrient, &value) in &self.nutrients_per_100g {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ReferenceError::InvalidNutrient {
                    label: self.label.clone(),
                    nutrient: nutrient.clone(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Validated, immutable reference tables with exact lookup by normalized label.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    records: Vec<NutritionRecord>,
    index: HashMap<String, usize>,
}

impl ReferenceTables {
    /// Build tables from records. Any invalid or duplicate record fails the whole load.
    pub fn new(records: Vec<NutritionRecord>) -> Result<Self, ReferenceError> {
        if records.is_empty() {
            return Err(ReferenceError::Empty);
        }
        let mut index = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            record.validate(i)?;
            if index.insert(normalize_label(&record.label), i).is_some() {
                return Err(ReferenceError::DuplicateLabel(record.label.clone()));
            }
        }
        Ok(Self { records, index })
    }

    /// Parse a JSON array of records.
    pub fn from_json_str(raw: &str) -> Result<Self, ReferenceError> {
        let records: Vec<NutritionRecord> = serde_json::from_str(raw)?;
        Self::new(records)
    }

    pub fn from_path(path: &Path) -> Result<Self, ReferenceError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ReferenceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let tables = Self::from_json_str(&raw)?;
        info!(path = %path.display(), records = tables.len(), "loaded reference table");
        Ok(tables)
    }

    /// Append another source. Labels already present keep their first definition.
    pub fn merge(mut self, other: ReferenceTables) -> Self {
        for record in other.records {
            let key = normalize_label(&record.label);
            if self.index.contains_key(&key) {
                debug!(label = %record.label, "duplicate label in merged source, keeping first");
                continue;
            }
            self.index.insert(key, self.records.len());
            self.records.push(record);
        }
        self
    }

    /// Exact lookup; case and punctuation are ignored.
    pub fn get(&self, label: &str) -> Option<&NutritionRecord> {
        self.index
            .get(&normalize_label(label))
            .map(|&i| &self.records[i])
    }

    pub fn record(&self, index: usize) -> Option<&NutritionRecord> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[NutritionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
