//! Corpus build: raw scraped records in, recipe graph out.
//!
//! The build runs in two phases. [`CorpusBuilder::plan`] is pure: it derives the
//! canonical vocabulary, matches every recipe's portions against it and produces
//! a [`BuildPlan`]. [`CorpusBuilder::write`] then hands the plan to the store as a
//! single [`GraphBatch`]. Nothing is written until the whole corpus has been read
//! and planned.

pub mod records;

use crate::db::models::{IngredientLink, NewRecipe, PortionLink};
use crate::error::{Error, Result};
use crate::normalizer::Normalizer;
use crate::store::{BatchReport, GraphBatch, GraphStore};
use crate::utils::validation::validate_source_url;
use records::{MealRecord, RawRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use records::{load_records, LoadedCorpus};

/// What to do with a recipe none of whose portions matched the vocabulary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedPolicy {
    /// Write the recipe with no HAS_THE_ITEM edges
    #[default]
    Keep,
    /// Leave the recipe out of the graph
    Drop,
}

impl FromStr for UnmatchedPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "keep" => Ok(UnmatchedPolicy::Keep),
            "drop" => Ok(UnmatchedPolicy::Drop),
            other => Err(Error::Config(format!(
                "Unknown unmatched-recipe policy '{other}', expected keep or drop"
            ))),
        }
    }
}

/// A recipe ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRecipe {
    pub name: String,
    pub instructions: String,
    pub source_url: Option<String>,
    /// Distinct portion strings in their original order
    pub portions: Vec<String>,
    /// Canonical ingredients found in the portions
    pub ingredients: BTreeSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BuildPlan {
    /// Canonical vocabulary, longest entries first
    pub vocabulary: Vec<String>,
    pub recipes: Vec<PlannedRecipe>,
    /// Names of recipes with no matched ingredient
    pub unmatched: Vec<String>,
    /// Meals skipped during planning (duplicate names)
    pub skipped: usize,
}

impl BuildPlan {
    /// Flatten the plan into one batch, nodes de-duplicated by identity
    pub fn to_batch(&self) -> GraphBatch {
        let mut batch = GraphBatch::default();
        let mut seen_portions = HashSet::new();
        let mut seen_ingredients = HashSet::new();

        for recipe in &self.recipes {
            batch.recipes.push(NewRecipe {
                name: recipe.name.clone(),
                instructions: recipe.instructions.clone(),
                source_url: recipe.source_url.clone(),
            });

            for (position, portion) in recipe.portions.iter().enumerate() {
                if seen_portions.insert(portion.clone()) {
                    batch.portions.push(portion.clone());
                }
                batch.made_with.push(PortionLink {
                    recipe: recipe.name.clone(),
                    portion: portion.clone(),
                    position: position as i64,
                });
            }

            for ingredient in &recipe.ingredients {
                if seen_ingredients.insert(ingredient.to_lowercase()) {
                    batch.ingredients.push(ingredient.clone());
                }
                batch.has_item.push(IngredientLink {
                    recipe: recipe.name.clone(),
                    ingredient: ingredient.clone(),
                });
            }
        }

        batch
    }
}

/// Outcome of a full build
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub records_read: usize,
    pub records_skipped: usize,
    pub vocabulary_size: usize,
    pub recipes_written: usize,
    pub unmatched: Vec<String>,
    pub batch: BatchReport,
    pub corpus_digest: String,
}

pub struct CorpusBuilder {
    store: Arc<dyn GraphStore>,
    normalizer: Normalizer,
    policy: UnmatchedPolicy,
}

impl CorpusBuilder {
    pub fn new(store: Arc<dyn GraphStore>, normalizer: Normalizer, policy: UnmatchedPolicy) -> Self {
        Self {
            store,
            normalizer,
            policy,
        }
    }

    /// Canonical vocabulary from ingredient records, sorted longest first
    pub fn vocabulary(&self, records: &[RawRecord]) -> Vec<String> {
        let mut vocabulary: Vec<String> = records
            .iter()
            .filter_map(|record| match record {
                RawRecord::Ingredient(ingredient) => {
                    Some(self.normalizer.canonicalize_name(&ingredient.name))
                }
                RawRecord::Meal(_) => None,
            })
            .filter(|name| !name.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        // Longest first so "Soy Milk" is tried before "Milk"; ties stay alphabetical
        vocabulary.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
        vocabulary
    }

    /// Canonical ingredients present in a meal's portions, first match per portion
    pub fn match_portions(&self, portions: &[String], vocabulary: &[String]) -> BTreeSet<String> {
        let needles: Vec<String> = vocabulary.iter().map(|v| v.to_lowercase()).collect();
        let mut found = BTreeSet::new();

        for portion in portions {
            let cleaned = self.normalizer.clean_portion(portion);
            if let Some(index) = needles.iter().position(|needle| cleaned.contains(needle.as_str())) {
                debug!("Portion '{}' matched '{}'", portion, vocabulary[index]);
                found.insert(vocabulary[index].clone());
            }
        }

        found
    }

    /// Derive the full graph for a set of records without touching the store
    pub fn plan(&self, records: &[RawRecord]) -> BuildPlan {
        let vocabulary = self.vocabulary(records);
        let mut plan = BuildPlan {
            vocabulary,
            ..BuildPlan::default()
        };
        let mut seen_names = HashSet::new();

        for record in records {
            let RawRecord::Meal(meal) = record else {
                continue;
            };

            if !seen_names.insert(meal.name.to_lowercase()) {
                warn!("Skipping duplicate meal '{}'", meal.name);
                plan.skipped += 1;
                continue;
            }

            let ingredients = self.match_portions(&meal.portions, &plan.vocabulary);
            if ingredients.is_empty() {
                warn!("No ingredients found for '{}'", meal.name);
                plan.unmatched.push(meal.name.clone());
                if self.policy == UnmatchedPolicy::Drop {
                    continue;
                }
            }

            plan.recipes.push(planned_recipe(meal, ingredients));
        }

        plan
    }

    /// Write a plan as one batch
    pub async fn write(&self, plan: &BuildPlan) -> Result<BatchReport> {
        let batch = plan.to_batch();
        if batch.is_empty() {
            info!("Nothing to write");
            return Ok(BatchReport::default());
        }

        info!(
            recipes = batch.recipes.len(),
            portions = batch.portions.len(),
            ingredients = batch.ingredients.len(),
            "Writing recipe graph"
        );
        self.store.write_batch(&batch).await
    }

    /// Plan and write records already in memory
    pub async fn build_records(&self, records: &[RawRecord]) -> Result<BuildReport> {
        let plan = self.plan(records);
        let batch = self.write(&plan).await?;

        Ok(BuildReport {
            records_read: records.len(),
            records_skipped: plan.skipped,
            vocabulary_size: plan.vocabulary.len(),
            recipes_written: plan.recipes.len(),
            unmatched: plan.unmatched,
            batch,
            corpus_digest: String::new(),
        })
    }

    /// Load a corpus file, then plan and write it
    pub async fn build_from_file(&self, path: &Path) -> Result<BuildReport> {
        info!("Loading corpus from {}", path.display());
        let corpus = load_records(path).await?;

        let mut report = self.build_records(&corpus.records).await?;
        report.records_read = corpus.total;
        report.records_skipped += corpus.skipped;
        report.corpus_digest = corpus.digest;

        info!(
            digest = %report.corpus_digest,
            "Built graph: {} recipes, {} vocabulary entries, {} unmatched, {} skipped records",
            report.recipes_written,
            report.vocabulary_size,
            report.unmatched.len(),
            report.records_skipped
        );

        Ok(report)
    }
}

fn planned_recipe(meal: &MealRecord, ingredients: BTreeSet<String>) -> PlannedRecipe {
    let mut seen = HashSet::new();
    let portions = meal
        .portions
        .iter()
        .filter(|p| seen.insert(p.as_str()))
        .cloned()
        .collect();

    PlannedRecipe {
        name: meal.name.clone(),
        instructions: meal.instructions.clone(),
        source_url: meal.source_url.as_deref().and_then(valid_source_url),
        portions,
        ingredients,
    }
}

fn valid_source_url(raw: &str) -> Option<String> {
    match validate_source_url(raw) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            debug!("Ignoring source URL: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::records::IngredientRecord;
    use crate::store::InMemoryGraphStore;

    fn meal(name: &str, portions: &[&str]) -> RawRecord {
        RawRecord::Meal(MealRecord {
            name: name.to_string(),
            portions: portions.iter().map(|p| p.to_string()).collect(),
            instructions: format!("Cook {name}."),
            source_url: None,
        })
    }

    fn ingredient(name: &str) -> RawRecord {
        RawRecord::Ingredient(IngredientRecord {
            name: name.to_string(),
        })
    }

    fn builder(policy: UnmatchedPolicy) -> CorpusBuilder {
        CorpusBuilder::new(Arc::new(InMemoryGraphStore::new()), Normalizer::new(), policy)
    }

    #[test]
    fn test_vocabulary_is_canonical_and_longest_first() {
        let records = vec![
            ingredient("milk"),
            ingredient("Soy Milk"),
            ingredient("MILK"),
            ingredient("Eggs"),
            ingredient("123"),
            meal("Ignored", &["milk"]),
        ];

        let vocabulary = builder(UnmatchedPolicy::Keep).vocabulary(&records);
        assert_eq!(vocabulary, vec!["Soy Milk", "Milk", "Egg"]);
    }

    #[test]
    fn test_longest_match_wins_per_portion() {
        let builder = builder(UnmatchedPolicy::Keep);
        let vocabulary = vec!["Soy Milk".to_string(), "Milk".to_string()];

        let found = builder.match_portions(&["1 cup soy milk".to_string()], &vocabulary);
        assert_eq!(found, BTreeSet::from(["Soy Milk".to_string()]));

        let found = builder.match_portions(
            &["1 cup soy milk".to_string(), "2 cups whole milk".to_string()],
            &vocabulary,
        );
        assert_eq!(
            found,
            BTreeSet::from(["Milk".to_string(), "Soy Milk".to_string()])
        );
    }

    #[test]
    fn test_portions_are_lemmatized_before_matching() {
        let builder = builder(UnmatchedPolicy::Keep);
        let vocabulary = builder.vocabulary(&[ingredient("Tomatoes"), ingredient("Bay Leaves")]);

        let found = builder.match_portions(
            &["3 ripe TOMATOES, diced".to_string(), "2 bay leaves".to_string()],
            &vocabulary,
        );
        assert_eq!(
            found,
            BTreeSet::from(["Bay Leaf".to_string(), "Tomato".to_string()])
        );
    }

    #[test]
    fn test_unmatched_policy() {
        let records = vec![
            ingredient("Egg"),
            meal("Omelette", &["3 eggs"]),
            meal("Ice", &["water"]),
        ];

        let kept = builder(UnmatchedPolicy::Keep).plan(&records);
        assert_eq!(kept.recipes.len(), 2);
        assert_eq!(kept.unmatched, vec!["Ice"]);

        let dropped = builder(UnmatchedPolicy::Drop).plan(&records);
        assert_eq!(dropped.recipes.len(), 1);
        assert_eq!(dropped.unmatched, vec!["Ice"]);
    }

    #[test]
    fn test_duplicate_meals_are_skipped() {
        let records = vec![
            ingredient("Egg"),
            meal("Omelette", &["3 eggs"]),
            meal("OMELETTE", &["4 eggs"]),
        ];

        let plan = builder(UnmatchedPolicy::Keep).plan(&records);
        assert_eq!(plan.recipes.len(), 1);
        assert_eq!(plan.skipped, 1);
        assert_eq!(plan.recipes[0].portions, vec!["3 eggs"]);
    }

    #[test]
    fn test_batch_shares_portions_between_recipes() {
        let records = vec![
            ingredient("Egg"),
            meal("Omelette", &["2 eggs", "salt", "2 eggs"]),
            meal("Frittata", &["2 eggs", "pepper"]),
        ];

        let batch = builder(UnmatchedPolicy::Keep).plan(&records).to_batch();
        assert_eq!(batch.recipes.len(), 2);
        assert_eq!(batch.portions, vec!["2 eggs", "salt", "pepper"]);
        assert_eq!(batch.ingredients, vec!["Egg"]);
        assert_eq!(batch.made_with.len(), 4);
        assert_eq!(batch.has_item.len(), 2);
    }

    #[test]
    fn test_source_urls_are_validated() {
        assert_eq!(
            valid_source_url("https://www.themealdb.com/meal/52955"),
            Some("https://www.themealdb.com/meal/52955".to_string())
        );
        assert_eq!(valid_source_url("not a url"), None);
        assert_eq!(valid_source_url("ftp://example.com/meal"), None);
    }

    #[tokio::test]
    async fn test_build_records_is_idempotent() {
        let store = Arc::new(InMemoryGraphStore::new());
        let builder = CorpusBuilder::new(store.clone(), Normalizer::new(), UnmatchedPolicy::Keep);
        let records = vec![
            ingredient("Milk"),
            ingredient("Soy Milk"),
            ingredient("Egg"),
            meal("Pancakes", &["2 cups milk", "2 eggs"]),
            meal("Vegan Latte", &["1 cup soy milk"]),
        ];

        let report = builder.build_records(&records).await.unwrap();
        assert_eq!(report.recipes_written, 2);
        let once = store.counts().await.unwrap();

        builder.build_records(&records).await.unwrap();
        assert_eq!(store.counts().await.unwrap(), once);
        assert_eq!(once.recipes, 2);
        assert_eq!(once.ingredients, 3);
        assert_eq!(once.has_item, 3);
    }
}
