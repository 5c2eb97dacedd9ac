//! Graph store boundary.
//!
//! The recipe graph (Recipe, IngredientPortion and CanonicalIngredient nodes with
//! MADE_WITH and HAS_THE_ITEM edges) is reached only through [`GraphStore`]. Every
//! write is a merge-upsert, so repeating a call never duplicates a node or edge.

pub mod memory;
pub mod sqlite;

use crate::db::models::{
    CanonicalIngredient, GraphCounts, IngredientLink, IngredientPortion, NewRecipe, PortionLink,
    Recipe, RecipeDetail,
};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::InMemoryGraphStore;
pub use sqlite::SqliteGraphStore;

/// Everything one corpus build writes, grouped by entity type.
///
/// Nodes are written before edges, so every link finds both of its endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphBatch {
    pub recipes: Vec<NewRecipe>,
    pub portions: Vec<String>,
    pub ingredients: Vec<String>,
    pub made_with: Vec<PortionLink>,
    pub has_item: Vec<IngredientLink>,
}

impl GraphBatch {
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty() && self.portions.is_empty() && self.ingredients.is_empty()
    }
}

/// Newly created nodes and edges reported by a batch write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub recipes_created: u64,
    pub portions_created: u64,
    pub ingredients_created: u64,
    pub made_with_created: u64,
    pub has_item_created: u64,
}

#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn upsert_recipe(&self, recipe: &NewRecipe) -> Result<Recipe>;

    async fn upsert_portion(&self, text: &str) -> Result<IngredientPortion>;

    /// MADE_WITH; fails with `QueryFailed` when either endpoint is missing
    async fn link_made_with(&self, recipe: &str, portion: &str, position: i64) -> Result<()>;

    async fn upsert_canonical_ingredient(&self, name: &str) -> Result<CanonicalIngredient>;

    /// HAS_THE_ITEM; fails with `QueryFailed` when either endpoint is missing
    async fn link_has_item(&self, recipe: &str, ingredient: &str) -> Result<()>;

    async fn find_ingredient_exact(&self, name: &str) -> Result<Option<CanonicalIngredient>>;

    /// Case-insensitive substring match, ordered by name. An empty needle matches nothing.
    async fn find_ingredients_containing(&self, needle: &str) -> Result<Vec<CanonicalIngredient>>;

    async fn list_ingredients(&self) -> Result<Vec<CanonicalIngredient>>;

    /// Recipes linked to every named ingredient, with their portions, ordered by name
    async fn recipes_with_all(&self, ingredient_names: &[String]) -> Result<Vec<RecipeDetail>>;

    async fn recipe_detail(&self, name: &str) -> Result<Option<RecipeDetail>>;

    /// Every recipe with its portions, in insertion order
    async fn list_recipes(&self) -> Result<Vec<RecipeDetail>>;

    async fn counts(&self) -> Result<GraphCounts>;

    /// Write a whole batch: nodes first, then edges.
    ///
    /// The default goes item by item through the single-entity operations and
    /// reports everything it touched as created. Implementations that can do
    /// better write one bulk statement per entity type.
    async fn write_batch(&self, batch: &GraphBatch) -> Result<BatchReport> {
        for recipe in &batch.recipes {
            self.upsert_recipe(recipe).await?;
        }
        for portion in &batch.portions {
            self.upsert_portion(portion).await?;
        }
        for ingredient in &batch.ingredients {
            self.upsert_canonical_ingredient(ingredient).await?;
        }
        for link in &batch.made_with {
            self.link_made_with(&link.recipe, &link.portion, link.position)
                .await?;
        }
        for link in &batch.has_item {
            self.link_has_item(&link.recipe, &link.ingredient).await?;
        }

        Ok(BatchReport {
            recipes_created: batch.recipes.len() as u64,
            portions_created: batch.portions.len() as u64,
            ingredients_created: batch.ingredients.len() as u64,
            made_with_created: batch.made_with.len() as u64,
            has_item_created: batch.has_item.len() as u64,
        })
    }
}
