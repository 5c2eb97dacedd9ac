//! Turning user-typed ingredients into recipes.
//!
//! [`IngredientResolver`] maps each token onto the canonical vocabulary and
//! [`RecipeRanker`] turns the resolved set into an ordered recipe list.

pub mod ranker;
pub mod resolver;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub use ranker::{score_recipes, RecipeRanker, ScoredRecipe};
pub use resolver::{levenshtein, IngredientResolver, ResolutionOutcome};

/// How recipes are selected for a set of ingredients
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Recipes containing every resolved ingredient
    #[default]
    Conjunctive,
    /// Recipes ranked by how many portions overlap the user's words
    Scored,
}

impl FromStr for MatchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "conjunctive" => Ok(MatchMode::Conjunctive),
            "scored" => Ok(MatchMode::Scored),
            other => Err(Error::Config(format!(
                "Unknown recommend mode '{other}', expected conjunctive or scored"
            ))),
        }
    }
}
