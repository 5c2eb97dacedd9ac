pub mod commands;
pub mod export;

use crate::config::Settings;
use crate::corpus::UnmatchedPolicy;
use crate::db;
use crate::error::Result;
use crate::recommend::MatchMode;
use crate::store::{GraphStore, SqliteGraphStore};
use crate::utils::validation::validate_ingredients;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mealgraph")]
#[command(about = "Recipe recommendations from a graph of scraped meals", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run database migrations
    Migrate,

    /// Build the recipe graph from a scraped corpus
    Build {
        /// Corpus file (JSON array of MEAL and INGREDIENT records)
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// What to do with recipes whose portions match no ingredient
        #[arg(long, value_enum)]
        unmatched: Option<UnmatchedPolicy>,
    },

    /// Recommend recipes for a list of ingredients
    Recommend {
        /// Ingredient names; only the first five are used
        #[arg(required = true, num_args = 1..)]
        ingredients: Vec<String>,

        /// Matching mode
        #[arg(long, value_enum)]
        mode: Option<MatchMode>,

        /// Save the Nth listed recipe to the saved-recipes file
        #[arg(long, value_name = "N")]
        save: Option<usize>,

        /// Ask which recipe to save after listing results
        #[arg(short, long)]
        interactive: bool,
    },

    /// Show one recipe's portions and instructions
    Detail {
        /// Recipe name (case-insensitive)
        name: String,

        /// Append the recipe to the saved-recipes file
        #[arg(long)]
        save: bool,
    },

    /// Show node and edge counts
    Stats,
}

/// Open the database, apply migrations and wrap it as the graph store
async fn open_store(settings: &Settings) -> Result<Arc<dyn GraphStore>> {
    let pool = db::init_pool_with_config(&settings.database).await?;
    db::run_migrations(&pool).await?;
    Ok(Arc::new(SqliteGraphStore::new(pool)))
}

/// Dispatch one command. Arguments are checked before the database is opened.
pub async fn run(cli: Cli, settings: &Settings) -> Result<()> {
    match cli.command {
        Commands::Migrate => {
            open_store(settings).await?;
            println!("\u{2713} Database migrations completed successfully");
        }
        Commands::Build { corpus, unmatched } => {
            let corpus = corpus.unwrap_or_else(|| settings.corpus.path.clone());
            let policy = unmatched.unwrap_or(settings.corpus.unmatched);
            info!("Building graph from {} ({:?} unmatched)", corpus.display(), policy);

            let store = open_store(settings).await?;
            commands::build(store, &corpus, policy).await?;
        }
        Commands::Recommend {
            ingredients,
            mode,
            save,
            interactive,
        } => {
            let config = &settings.recommender;
            let args = validate_ingredients(&ingredients, config.max_ingredients)?;
            let mode = mode.unwrap_or(config.mode);

            let store = open_store(settings).await?;
            let results = commands::recommend_validated(store, config, &args, mode).await?;

            if let Some(choice) = save {
                commands::save_choice(&results, choice, &config.save_path).await?;
            } else if interactive {
                commands::prompt_and_save(&results, &config.save_path).await?;
            }
        }
        Commands::Detail { name, save } => {
            let store = open_store(settings).await?;
            let save_path = save.then_some(settings.recommender.save_path.as_path());
            commands::detail(store, &name, save_path).await?;
        }
        Commands::Stats => {
            let store = open_store(settings).await?;
            commands::stats(store).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CorpusConfig, DatabaseConfig, RecommenderConfig};
    use crate::Error;

    #[test]
    fn test_parse_recommend() {
        let cli = Cli::parse_from([
            "mealgraph",
            "recommend",
            "egg",
            "soy milk",
            "--mode",
            "scored",
            "--save",
            "2",
        ]);

        match cli.command {
            Commands::Recommend {
                ingredients,
                mode,
                save,
                interactive,
            } => {
                assert_eq!(ingredients, vec!["egg", "soy milk"]);
                assert_eq!(mode, Some(MatchMode::Scored));
                assert_eq!(save, Some(2));
                assert!(!interactive);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_recommend_requires_an_ingredient() {
        assert!(Cli::try_parse_from(["mealgraph", "recommend"]).is_err());
    }

    #[test]
    fn test_parse_build() {
        let cli = Cli::parse_from(["mealgraph", "build", "--corpus", "foods.json", "--unmatched", "drop"]);
        match cli.command {
            Commands::Build { corpus, unmatched } => {
                assert_eq!(corpus, Some(PathBuf::from("foods.json")));
                assert_eq!(unmatched, Some(UnmatchedPolicy::Drop));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_recommend_args_never_open_the_database() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let settings = Settings {
            database: DatabaseConfig {
                url: format!("sqlite:{}", data_dir.join("mealgraph.db").display()),
                ..DatabaseConfig::in_memory()
            },
            corpus: CorpusConfig {
                path: PathBuf::from("foods.json"),
                unmatched: UnmatchedPolicy::Keep,
            },
            recommender: RecommenderConfig::default(),
        };

        let cli = Cli::parse_from(["mealgraph", "recommend", "egg", "milk2"]);
        let err = run(cli, &settings).await.unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(err.exit_code(), 1);
        assert!(!data_dir.exists());
    }
}
