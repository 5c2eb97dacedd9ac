use super::GraphStore;
use crate::db::name_key;
use crate::db::models::{
    CanonicalIngredient, GraphCounts, IngredientPortion, NewRecipe, Recipe, RecipeDetail,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Graph {
    recipes: Vec<Recipe>,
    portions: Vec<IngredientPortion>,
    ingredients: Vec<CanonicalIngredient>,
    /// recipe id -> (position, portion id)
    made_with: HashMap<i64, BTreeSet<(i64, i64)>>,
    /// recipe id -> ingredient ids
    has_item: HashMap<i64, BTreeSet<i64>>,
}

impl Graph {
    fn recipe(&self, name: &str) -> Option<&Recipe> {
        let key = name_key(name);
        self.recipes.iter().find(|r| name_key(&r.name) == key)
    }

    fn portion(&self, text: &str) -> Option<&IngredientPortion> {
        self.portions.iter().find(|p| p.text == text)
    }

    fn ingredient(&self, name: &str) -> Option<&CanonicalIngredient> {
        let key = name_key(name);
        self.ingredients.iter().find(|i| name_key(&i.name) == key)
    }

    fn detail(&self, recipe: &Recipe) -> RecipeDetail {
        let portions = self
            .made_with
            .get(&recipe.id)
            .map(|links| {
                links
                    .iter()
                    .filter_map(|(_, portion_id)| self.portions.iter().find(|p| p.id == *portion_id))
                    .map(|p| p.text.clone())
                    .collect()
            })
            .unwrap_or_default();

        RecipeDetail {
            name: recipe.name.clone(),
            instructions: recipe.instructions.clone(),
            portions,
        }
    }
}

fn sorted_by_name(mut ingredients: Vec<CanonicalIngredient>) -> Vec<CanonicalIngredient> {
    ingredients.sort_by_key(|i| name_key(&i.name));
    ingredients
}

/// Graph store held in process memory.
///
/// Same merge semantics and the same `name_key` identity as the SQLite store;
/// used by tests and for dry runs.
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    graph: Mutex<Graph>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn upsert_recipe(&self, recipe: &NewRecipe) -> Result<Recipe> {
        let mut graph = self.graph.lock().await;
        if let Some(existing) = graph.recipe(&recipe.name) {
            return Ok(existing.clone());
        }

        let created = Recipe {
            id: graph.recipes.len() as i64 + 1,
            name: recipe.name.clone(),
            instructions: recipe.instructions.clone(),
            source_url: recipe.source_url.clone(),
            created_at: Utc::now(),
        };
        graph.recipes.push(created.clone());
        Ok(created)
    }

    async fn upsert_portion(&self, text: &str) -> Result<IngredientPortion> {
        let mut graph = self.graph.lock().await;
        if let Some(existing) = graph.portion(text) {
            return Ok(existing.clone());
        }

        let created = IngredientPortion {
            id: graph.portions.len() as i64 + 1,
            text: text.to_string(),
        };
        graph.portions.push(created.clone());
        Ok(created)
    }

    async fn link_made_with(&self, recipe: &str, portion: &str, position: i64) -> Result<()> {
        let mut graph = self.graph.lock().await;
        let recipe_id = graph
            .recipe(recipe)
            .map(|r| r.id)
            .ok_or_else(|| Error::QueryFailed(format!("Cannot link missing recipe '{recipe}'")))?;
        let portion_id = graph
            .portion(portion)
            .map(|p| p.id)
            .ok_or_else(|| Error::QueryFailed(format!("Cannot link missing portion '{portion}'")))?;

        let links = graph.made_with.entry(recipe_id).or_default();
        if !links.iter().any(|(_, id)| *id == portion_id) {
            links.insert((position, portion_id));
        }
        Ok(())
    }

    async fn upsert_canonical_ingredient(&self, name: &str) -> Result<CanonicalIngredient> {
        let mut graph = self.graph.lock().await;
        if let Some(existing) = graph.ingredient(name) {
            return Ok(existing.clone());
        }

        let created = CanonicalIngredient {
            id: graph.ingredients.len() as i64 + 1,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        graph.ingredients.push(created.clone());
        Ok(created)
    }

    async fn link_has_item(&self, recipe: &str, ingredient: &str) -> Result<()> {
        let mut graph = self.graph.lock().await;
        let recipe_id = graph
            .recipe(recipe)
            .map(|r| r.id)
            .ok_or_else(|| Error::QueryFailed(format!("Cannot link missing recipe '{recipe}'")))?;
        let ingredient_id = graph.ingredient(ingredient).map(|i| i.id).ok_or_else(|| {
            Error::QueryFailed(format!("Cannot link missing ingredient '{ingredient}'"))
        })?;

        graph
            .has_item
            .entry(recipe_id)
            .or_default()
            .insert(ingredient_id);
        Ok(())
    }

    async fn find_ingredient_exact(&self, name: &str) -> Result<Option<CanonicalIngredient>> {
        Ok(self.graph.lock().await.ingredient(name).cloned())
    }

    async fn find_ingredients_containing(&self, needle: &str) -> Result<Vec<CanonicalIngredient>> {
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let needle = needle.to_lowercase();
        let graph = self.graph.lock().await;
        let found = graph
            .ingredients
            .iter()
            .filter(|i| name_key(&i.name).contains(&needle))
            .cloned()
            .collect();

        Ok(sorted_by_name(found))
    }

    async fn list_ingredients(&self) -> Result<Vec<CanonicalIngredient>> {
        Ok(sorted_by_name(self.graph.lock().await.ingredients.clone()))
    }

    async fn recipes_with_all(&self, ingredient_names: &[String]) -> Result<Vec<RecipeDetail>> {
        let graph = self.graph.lock().await;

        let mut wanted = BTreeSet::new();
        for name in ingredient_names {
            if name.trim().is_empty() {
                continue;
            }
            match graph.ingredient(name) {
                Some(ingredient) => {
                    wanted.insert(ingredient.id);
                }
                // Nothing can contain an ingredient that does not exist
                None => return Ok(Vec::new()),
            }
        }
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let mut matches: Vec<&Recipe> = graph
            .recipes
            .iter()
            .filter(|recipe| {
                graph
                    .has_item
                    .get(&recipe.id)
                    .is_some_and(|items| wanted.is_subset(items))
            })
            .collect();
        matches.sort_by_key(|r| name_key(&r.name));

        Ok(matches.into_iter().map(|r| graph.detail(r)).collect())
    }

    async fn recipe_detail(&self, name: &str) -> Result<Option<RecipeDetail>> {
        let graph = self.graph.lock().await;
        Ok(graph.recipe(name).map(|r| graph.detail(r)))
    }

    async fn list_recipes(&self) -> Result<Vec<RecipeDetail>> {
        let graph = self.graph.lock().await;
        Ok(graph.recipes.iter().map(|r| graph.detail(r)).collect())
    }

    async fn counts(&self) -> Result<GraphCounts> {
        let graph = self.graph.lock().await;
        Ok(GraphCounts {
            recipes: graph.recipes.len() as i64,
            portions: graph.portions.len() as i64,
            ingredients: graph.ingredients.len() as i64,
            made_with: graph.made_with.values().map(|l| l.len() as i64).sum(),
            has_item: graph.has_item.values().map(|l| l.len() as i64).sum(),
        })
    }
}
