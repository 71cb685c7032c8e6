//! Label + volume to mass and nutrient amounts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::nutrition::reference::{NutritionRecord, ReferenceTables};
use crate::nutrition::retrieval::{Candidate, Retriever, TokenOverlapRetriever};

/// Configuration for the [`NutritionResolver`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NutritionConfig {
    /// Retrieval scores below this are treated as "no match"
    pub confidence_floor: f32,
    /// g/cm³ used when nothing matches
    pub default_density: f64,
    /// How many candidates the retriever is asked for
    pub candidate_limit: usize,
}

impl Default for NutritionConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.5,
            default_density: 1.0,
            candidate_limit: 5,
        }
    }
}

/// How a label was matched to the reference tables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKind {
    /// Normalized label found verbatim.
    Exact,
    /// Best retrieval candidate cleared the confidence floor.
    Retrieved { score: f32 },
    /// Nothing usable; default density, no nutrients.
    Fallback,
}

/// Mass and scaled nutrients for one food item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientBreakdown {
    pub query_label: String,
    pub matched_label: Option<String>,
    /// g/cm³
    pub density: f64,
    pub volume_cm3: f64,
    pub mass_g: f64,
    /// Nutrient amounts for `mass_g`
    pub nutrients: BTreeMap<String, f64>,
    pub match_kind: MatchKind,
}

impl NutrientBreakdown {
    pub fn low_confidence(&self) -> bool {
        matches!(self.match_kind, MatchKind::Fallback)
    }
}

/// Scale a per-100 g composition to `mass_g`.
pub fn scale_nutrients(per_100g: &BTreeMap<String, f64>, mass_g: f64) -> BTreeMap<String, f64> {
    let factor = mass_g / 100.0;
    per_100g
        .iter()
        .map(|(name, &amount)| (name.clone(), amount * factor))
        .collect()
}

/// Resolves labels against shared, read-only reference tables.
pub struct NutritionResolver<'a, R = TokenOverlapRetriever> {
    tables: &'a ReferenceTables,
    retriever: R,
    config: NutritionConfig,
}

impl<'a> NutritionResolver<'a, TokenOverlapRetriever> {
    pub fn new(tables: &'a ReferenceTables, config: NutritionConfig) -> Self {
        Self::with_retriever(tables, TokenOverlapRetriever::new(tables), config)
    }
}

impl<'a, R: Retriever> NutritionResolver<'a, R> {
    pub fn with_retriever(tables: &'a ReferenceTables, retriever: R, config: NutritionConfig) -> Self {
        Self {
            tables,
            retriever,
            config,
        }
    }

    pub fn config(&self) -> &NutritionConfig {
        &self.config
    }

    /// Ranked candidates for a label, for diagnostics.
    pub fn candidates(&self, label: &str) -> Vec<Candidate> {
        self.retriever.rank(label, self.config.candidate_limit.max(1))
    }

    /// Find the record for `label`: exact first, then retrieval above the floor.
    pub fn lookup(&self, label: &str) -> Option<(&'a NutritionRecord, MatchKind)> {
        let tables: &'a ReferenceTables = self.tables;
        if let Some(record) = tables.get(label) {
            return Some((record, MatchKind::Exact));
        }
        let best = self.candidates(label).into_iter().next()?;
        if best.score < self.config.confidence_floor {
            debug!(label, score = best.score, "best candidate below confidence floor");
            return None;
        }
        let record = tables.record(best.index)?;
        Some((record, MatchKind::Retrieved { score: best.score }))
    }

    pub fn resolve(&self, label: &str, volume_cm3: f64) -> NutrientBreakdown {
        let volume_cm3 = if volume_cm3.is_finite() {
            volume_cm3.max(0.0)
        } else {
            0.0
        };

        match self.lookup(label) {
            Some((record, match_kind)) => {
                let mass_g = volume_cm3 * record.density;
                debug!(label, matched = %record.label, ?match_kind, mass_g, "resolved label");
                NutrientBreakdown {
                    query_label: label.to_string(),
                    matched_label: Some(record.label.clone()),
                    density: record.density,
                    volume_cm3,
                    mass_g,
                    nutrients: scale_nutrients(&record.nutrients_per_100g, mass_g),
                    match_kind,
                }
            }
            None => {
                warn!(label, "no reference match, using default density");
                NutrientBreakdown {
                    query_label: label.to_string(),
                    matched_label: None,
                    density: self.config.default_density,
                    volume_cm3,
                    mass_g: volume_cm3 * self.config.default_density,
                    nutrients: BTreeMap::new(),
                    match_kind: MatchKind::Fallback,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"[
        {"label": "apple", "density": 0.8, "nutrients_per_100g": {"energy_kcal": 52, "carbohydrate_g": 13.8}},
        {"label": "chicken, breast, grilled", "density": 1.05, "nutrients_per_100g": {"energy_kcal": 165, "protein_g": 31, "fat_g": 3.6}}
    ]"#;

    fn tables() -> ReferenceTables {
        ReferenceTables::from_json_str(TABLE).unwrap()
    }

    #[test]
    fn test_exact_match() {
        let tables = tables();
        let resolver = NutritionResolver::new(&tables, NutritionConfig::default());
        let b = resolver.resolve("Apple", 250.0);
        assert_eq!(b.match_kind, MatchKind::Exact);
        assert!((b.mass_g - 200.0).abs() < 1e-9);
        assert!((b.nutrients["energy_kcal"] - 104.0).abs() < 1e-9);
        assert!(!b.low_confidence());
    }

    #[test]
    fn test_retrieved_match_scales_row() {
        let tables = tables();
        let resolver = NutritionResolver::new(&tables, NutritionConfig::default());
        let b = resolver.resolve("grilled chicken breast", 100.0);
        assert!(matches!(b.match_kind, MatchKind::Retrieved { .. }));
        assert_eq!(b.matched_label.as_deref(), Some("chicken, breast, grilled"));
        assert!((b.mass_g - 105.0).abs() < 1e-9);
        assert!((b.nutrients["protein_g"] - 31.0 * 1.05).abs() < 1e-9);
        assert!(!b.low_confidence());
    }

    #[test]
    fn test_fallback_is_low_confidence() {
        let tables = tables();
        let config = NutritionConfig {
            default_density: 0.9,
            ..NutritionConfig::default()
        };
        let resolver = NutritionResolver::new(&tables, config);
        let b = resolver.resolve("mystery stew", 100.0);
        assert_eq!(b.match_kind, MatchKind::Fallback);
        assert!(b.low_confidence());
        assert!((b.mass_g - 90.0).abs() < 1e-9);
        assert!(b.nutrients.is_empty());

        // One shared token out of four is below the 0.5 floor.
        let b = resolver.resolve("chicken soup", 100.0);
        assert!(b.low_confidence());
    }

    #[test]
    fn test_doubling_mass_doubles_nutrients() {
        let tables = tables();
        let resolver = NutritionResolver::new(&tables, NutritionConfig::default());
        let volume = 137.3;
        let single = resolver.resolve("grilled chicken breast", volume);
        let double = resolver.resolve("grilled chicken breast", 2.0 * volume);
        assert_eq!(double.mass_g, 2.0 * single.mass_g);
        for (name, amount) in &single.nutrients {
            assert_eq!(double.nutrients[name], 2.0 * amount, "{name}");
        }
    }

    #[test]
    fn test_invalid_volume_is_clamped() {
        let tables = tables();
        let resolver = NutritionResolver::new(&tables, NutritionConfig::default());
        assert_eq!(resolver.resolve("apple", -5.0).mass_g, 0.0);
        assert_eq!(resolver.resolve("apple", f64::NAN).mass_g, 0.0);
    }
}
