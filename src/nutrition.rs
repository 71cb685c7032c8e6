//! Nutrition resolution: reference tables, free-text retrieval and mass scaling.

mod reference;
mod resolver;
mod retrieval;

pub use reference::{NutritionRecord, ReferenceTables};
pub use resolver::{
    MatchKind, NutrientBreakdown, NutritionConfig, NutritionResolver, scale_nutrients,
};
pub use retrieval::{Candidate, Retriever, TokenOverlapRetriever};
