use super::{BatchReport, GraphBatch, GraphStore};
use crate::db::models::{
    CanonicalIngredient, GraphCounts, IngredientPortion, NewRecipe, Recipe, RecipeDetail,
};
use crate::db::{self, ingredients, recipes, DbPool};
use crate::error::Result;
use async_trait::async_trait;
use tracing::debug;

/// Graph store backed by SQLite through sqlx
#[derive(Debug, Clone)]
pub struct SqliteGraphStore {
    pool: DbPool,
}

impl SqliteGraphStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn upsert_recipe(&self, recipe: &NewRecipe) -> Result<Recipe> {
        recipes::upsert_recipe(&self.pool, recipe).await
    }

    async fn upsert_portion(&self, text: &str) -> Result<IngredientPortion> {
        recipes::upsert_portion(&self.pool, text).await
    }

    async fn link_made_with(&self, recipe: &str, portion: &str, position: i64) -> Result<()> {
        recipes::link_made_with(&self.pool, recipe, portion, position).await
    }

    async fn upsert_canonical_ingredient(&self, name: &str) -> Result<CanonicalIngredient> {
        ingredients::upsert_ingredient(&self.pool, name).await
    }

    async fn link_has_item(&self, recipe: &str, ingredient: &str) -> Result<()> {
        ingredients::link_has_item(&self.pool, recipe, ingredient).await
    }

    async fn find_ingredient_exact(&self, name: &str) -> Result<Option<CanonicalIngredient>> {
        ingredients::find_ingredient_exact(&self.pool, name).await
    }

    async fn find_ingredients_containing(&self, needle: &str) -> Result<Vec<CanonicalIngredient>> {
        ingredients::find_ingredients_containing(&self.pool, needle).await
    }

    async fn list_ingredients(&self) -> Result<Vec<CanonicalIngredient>> {
        ingredients::list_ingredients(&self.pool).await
    }

    async fn recipes_with_all(&self, ingredient_names: &[String]) -> Result<Vec<RecipeDetail>> {
        let matches = ingredients::recipes_with_all(&self.pool, ingredient_names).await?;
        recipes::with_portions(&self.pool, matches).await
    }

    async fn recipe_detail(&self, name: &str) -> Result<Option<RecipeDetail>> {
        recipes::get_recipe_detail(&self.pool, name).await
    }

    async fn list_recipes(&self) -> Result<Vec<RecipeDetail>> {
        recipes::list_recipes_with_portions(&self.pool).await
    }

    async fn counts(&self) -> Result<GraphCounts> {
        db::count_graph(&self.pool).await
    }

    /// One bulk statement per entity type inside a single transaction; a failure
    /// rolls the whole batch back.
    async fn write_batch(&self, batch: &GraphBatch) -> Result<BatchReport> {
        let mut tx = self.pool.begin().await?;

        let report = BatchReport {
            recipes_created: recipes::insert_recipes(&mut tx, &batch.recipes).await?,
            portions_created: recipes::insert_portions(&mut tx, &batch.portions).await?,
            ingredients_created: ingredients::insert_ingredients(&mut tx, &batch.ingredients)
                .await?,
            made_with_created: recipes::insert_portion_links(&mut tx, &batch.made_with).await?,
            has_item_created: ingredients::insert_ingredient_links(&mut tx, &batch.has_item)
                .await?,
        };

        tx.commit().await?;
        debug!(?report, "Committed graph batch");

        Ok(report)
    }
}
