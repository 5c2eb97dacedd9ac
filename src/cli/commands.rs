use crate::cli::export::append_recipe;
use crate::config::RecommenderConfig;
use crate::corpus::{BuildReport, CorpusBuilder, UnmatchedPolicy};
use crate::db::models::{GraphCounts, RecipeDetail};
use crate::normalizer::Normalizer;
use crate::recommend::{IngredientResolver, MatchMode, RecipeRanker, ScoredRecipe};
use crate::store::GraphStore;
use crate::utils::sanitize::truncate;
use crate::utils::validation::{validate_ingredients, IngredientArgs};
use crate::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

/// Results of one recommend run
#[derive(Debug, Clone)]
pub enum Recommendations {
    Conjunctive(Vec<RecipeDetail>),
    Scored(Vec<ScoredRecipe>),
}

impl Recommendations {
    /// Recipes in the order they were listed
    pub fn recipes(&self) -> Vec<&RecipeDetail> {
        match self {
            Recommendations::Conjunctive(recipes) => recipes.iter().collect(),
            Recommendations::Scored(scored) => scored.iter().map(|s| &s.recipe).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.recipes().is_empty()
    }
}

/// Build the graph from a corpus file
pub async fn build(
    store: Arc<dyn GraphStore>,
    corpus: &Path,
    policy: UnmatchedPolicy,
) -> Result<BuildReport> {
    let builder = CorpusBuilder::new(store, Normalizer::new(), policy);
    let report = builder.build_from_file(corpus).await?;

    print_build_report(&report);
    Ok(report)
}

/// Validate, resolve and rank the user's ingredients, then print the results.
///
/// Validation runs before anything touches the store.
pub async fn recommend(
    store: Arc<dyn GraphStore>,
    config: &RecommenderConfig,
    ingredients: &[String],
    mode: MatchMode,
) -> Result<Recommendations> {
    let args = validate_ingredients(ingredients, config.max_ingredients)?;
    recommend_validated(store, config, &args, mode).await
}

/// Resolve and rank ingredients that already passed validation
pub async fn recommend_validated(
    store: Arc<dyn GraphStore>,
    config: &RecommenderConfig,
    args: &IngredientArgs,
    mode: MatchMode,
) -> Result<Recommendations> {
    if args.dropped > 0 {
        println!(
            "Note: only the first {} ingredients are used ({} ignored)",
            config.max_ingredients, args.dropped
        );
    }

    let normalizer = Normalizer::new();
    let ranker = RecipeRanker::new(store.clone(), normalizer.clone(), config.top_n);

    let results = match mode {
        MatchMode::Conjunctive => {
            let resolver = IngredientResolver::new(store, normalizer, config.typo_distance);
            let resolved = resolver.resolve_all(&args.tokens).await?;
            let names: Vec<&str> = resolved.iter().map(|i| i.name.as_str()).collect();
            info!("Searching recipes with {}", names.join(", "));
            Recommendations::Conjunctive(ranker.conjunctive(&resolved).await?)
        }
        MatchMode::Scored => Recommendations::Scored(ranker.scored(&args.tokens).await?),
    };

    print_recommendations(&results);
    Ok(results)
}

/// Save the `choice`th listed recipe (1-based)
pub async fn save_choice(results: &Recommendations, choice: usize, save_path: &Path) -> Result<()> {
    let recipes = results.recipes();
    let recipe = choice
        .checked_sub(1)
        .and_then(|index| recipes.get(index))
        .ok_or_else(|| {
            Error::Validation(format!(
                "No recipe number {choice}; {} listed",
                recipes.len()
            ))
        })?;

    append_recipe(save_path, recipe).await?;
    println!("\u{2713} Saved '{}' to {}", recipe.name, save_path.display());
    Ok(())
}

/// Ask on stdin which listed recipe to save
pub async fn prompt_and_save(results: &Recommendations, save_path: &Path) -> Result<()> {
    if results.is_empty() {
        return Ok(());
    }

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(b"Save a recipe? Enter its number, or press Enter to skip: ")
        .await?;
    stdout.flush().await?;

    let mut stdin = BufReader::new(tokio::io::stdin());
    match read_choice(&mut stdin, results.recipes().len()).await? {
        Some(choice) => save_choice(results, choice, save_path).await,
        None => Ok(()),
    }
}

/// Read a 1-based choice. A blank line means no choice.
pub async fn read_choice<R: AsyncBufRead + Unpin>(reader: &mut R, count: usize) -> Result<Option<usize>> {
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let answer = line.trim();
    if answer.is_empty() {
        return Ok(None);
    }

    match answer.parse::<usize>() {
        Ok(choice) if (1..=count).contains(&choice) => Ok(Some(choice)),
        _ => Err(Error::Validation(format!(
            "Expected a number between 1 and {count}, got '{answer}'"
        ))),
    }
}

/// Print one recipe, optionally appending it to the saved-recipes file
pub async fn detail(
    store: Arc<dyn GraphStore>,
    name: &str,
    save_path: Option<&Path>,
) -> Result<RecipeDetail> {
    let ranker = RecipeRanker::new(store, Normalizer::new(), 1);
    let recipe = ranker.detail(name).await?;

    print_detail(&recipe);
    if let Some(path) = save_path {
        append_recipe(path, &recipe).await?;
        println!("\u{2713} Saved '{}' to {}", recipe.name, path.display());
    }

    Ok(recipe)
}

/// Print node and edge counts
pub async fn stats(store: Arc<dyn GraphStore>) -> Result<GraphCounts> {
    let counts = store.counts().await?;
    print_stats(&counts);
    Ok(counts)
}

fn print_build_report(report: &BuildReport) {
    println!("\u{2713} Graph built");
    println!("  Records read: {}", report.records_read);
    println!("  Records skipped: {}", report.records_skipped);
    println!("  Vocabulary: {} ingredients", report.vocabulary_size);
    println!("  Recipes: {}", report.recipes_written);
    println!(
        "  Created: {} recipes, {} portions, {} ingredients, {} MADE_WITH, {} HAS_THE_ITEM",
        report.batch.recipes_created,
        report.batch.portions_created,
        report.batch.ingredients_created,
        report.batch.made_with_created,
        report.batch.has_item_created
    );

    if !report.unmatched.is_empty() {
        println!("  Recipes with no matched ingredient: {}", report.unmatched.len());
        for name in report.unmatched.iter().take(10) {
            println!("    - {name}");
        }
        if report.unmatched.len() > 10 {
            println!("    ... and {} more", report.unmatched.len() - 10);
        }
    }

    if !report.corpus_digest.is_empty() {
        println!("  Corpus SHA-256: {}", report.corpus_digest);
    }
}

fn print_recommendations(results: &Recommendations) {
    if results.is_empty() {
        println!("No recipes found");
        return;
    }

    match results {
        Recommendations::Conjunctive(recipes) => {
            println!("\nFound {} recipes:\n", recipes.len());
            for (i, recipe) in recipes.iter().enumerate() {
                println!("{:>3}. {}", i + 1, recipe.name);
                println!("     {}", truncate(&recipe.portions.join(", "), 70));
            }
        }
        Recommendations::Scored(scored) => {
            println!("\nTop {} recipes:\n", scored.len());
            println!("{:<5} {:<45} {:>7} {:>7}", "#", "Recipe", "Common", "Match");
            println!("{}", "-".repeat(67));
            for (i, entry) in scored.iter().enumerate() {
                println!(
                    "{:<5} {:<45} {:>7} {:>6.0}%",
                    i + 1,
                    truncate(&entry.recipe.name, 45),
                    entry.common_count,
                    entry.match_ratio * 100.0
                );
                if !entry.missing.is_empty() {
                    println!("      Missing: {}", truncate(&entry.missing.join(", "), 60));
                }
            }
        }
    }
    println!();
}

fn print_detail(recipe: &RecipeDetail) {
    println!("\n{}", recipe.name);
    println!("{}", "-".repeat(recipe.name.chars().count().max(8)));
    println!("Ingredients:");
    for portion in &recipe.portions {
        println!("  - {portion}");
    }
    println!("\nInstructions:");
    println!("{}\n", recipe.instructions);
}

fn print_stats(counts: &GraphCounts) {
    println!("Recipes:      {}", counts.recipes);
    println!("Portions:     {}", counts.portions);
    println!("Ingredients:  {}", counts.ingredients);
    println!("MADE_WITH:    {}", counts.made_with);
    println!("HAS_THE_ITEM: {}", counts.has_item);
}
