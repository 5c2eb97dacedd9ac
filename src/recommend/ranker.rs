use crate::db::models::{CanonicalIngredient, RecipeDetail};
use crate::error::{Error, Result};
use crate::normalizer::Normalizer;
use crate::store::GraphStore;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// A recipe ranked by portion overlap with the user's ingredients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecipe {
    pub recipe: RecipeDetail,
    /// Portions sharing at least one word with the user's ingredients
    pub common_count: usize,
    /// `common_count` over the number of distinct portions
    pub match_ratio: f64,
    /// Portions the user did not mention
    pub missing: Vec<String>,
}

pub struct RecipeRanker {
    store: Arc<dyn GraphStore>,
    normalizer: Normalizer,
    top_n: usize,
}

impl RecipeRanker {
    pub fn new(store: Arc<dyn GraphStore>, normalizer: Normalizer, top_n: usize) -> Self {
        Self {
            store,
            normalizer,
            top_n,
        }
    }

    /// Recipes containing every resolved ingredient, ordered by name
    pub async fn conjunctive(&self, resolved: &[CanonicalIngredient]) -> Result<Vec<RecipeDetail>> {
        if resolved.is_empty() {
            return Ok(Vec::new());
        }

        let names: Vec<String> = resolved.iter().map(|i| i.name.clone()).collect();
        let recipes = self.store.recipes_with_all(&names).await?;
        debug!("{} recipes contain all of {:?}", recipes.len(), names);

        Ok(recipes)
    }

    /// The best `top_n` recipes by overlap with the raw user ingredients
    pub async fn scored(&self, user_ingredients: &[String]) -> Result<Vec<ScoredRecipe>> {
        let recipes = self.store.list_recipes().await?;
        Ok(score_recipes(
            &self.normalizer,
            user_ingredients,
            recipes,
            self.top_n,
        ))
    }

    /// One recipe by exact name, compared case-insensitively
    pub async fn detail(&self, recipe_name: &str) -> Result<RecipeDetail> {
        self.store
            .recipe_detail(recipe_name.trim())
            .await?
            .ok_or_else(|| Error::NotFound(format!("Recipe '{}'", recipe_name.trim())))
    }
}

/// Rank recipes by how many of their distinct portions share a word with the
/// user's ingredients. Recipes with no overlap are left out; ties keep the
/// order the recipes came in.
pub fn score_recipes(
    normalizer: &Normalizer,
    user_ingredients: &[String],
    recipes: Vec<RecipeDetail>,
    top_n: usize,
) -> Vec<ScoredRecipe> {
    let user_tokens: HashSet<String> = user_ingredients
        .iter()
        .flat_map(|ingredient| normalizer.normalize(ingredient))
        .collect();
    if user_tokens.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<ScoredRecipe> = recipes
        .into_iter()
        .filter_map(|recipe| score_one(normalizer, &user_tokens, recipe))
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| {
        b.common_count.cmp(&a.common_count).then(
            b.match_ratio
                .partial_cmp(&a.match_ratio)
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    });
    scored.truncate(top_n);
    scored
}

fn score_one(
    normalizer: &Normalizer,
    user_tokens: &HashSet<String>,
    recipe: RecipeDetail,
) -> Option<ScoredRecipe> {
    let mut seen = HashSet::new();
    let portions: Vec<&String> = recipe
        .portions
        .iter()
        .filter(|p| seen.insert(p.trim().to_lowercase()))
        .collect();
    if portions.is_empty() {
        return None;
    }

    let mut common_count = 0;
    let mut missing = Vec::new();
    for portion in &portions {
        let shares_word = normalizer
            .normalize(portion)
            .iter()
            .any(|token| user_tokens.contains(token));
        if shares_word {
            common_count += 1;
        } else {
            missing.push((*portion).clone());
        }
    }

    if common_count == 0 {
        return None;
    }

    let match_ratio = common_count as f64 / portions.len() as f64;
    Some(ScoredRecipe {
        recipe,
        common_count,
        match_ratio,
        missing,
    })
}
