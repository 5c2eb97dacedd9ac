use crate::corpus::UnmatchedPolicy;
use crate::error::{Error, Result};
use crate::recommend::MatchMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub corpus: CorpusConfig,
    pub recommender: RecommenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    pub path: PathBuf,
    pub unmatched: UnmatchedPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommenderConfig {
    pub max_ingredients: usize,
    pub top_n: usize,
    pub typo_distance: usize,
    pub mode: MatchMode,
    pub save_path: PathBuf,
}

impl DatabaseConfig {
    /// Single-connection in-memory store, used by tests and dry runs
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            connection_timeout_seconds: 30,
            idle_timeout_seconds: 600,
        }
    }
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            max_ingredients: 5,
            top_n: 3,
            typo_distance: 1,
            mode: MatchMode::Conjunctive,
            save_path: PathBuf::from("Saved_Recipes.txt"),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: &str) -> Result<T> {
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| Error::Config(format!("Invalid {key} value")))
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:./data/mealgraph.db".to_string());

        let max_connections = env_or("DATABASE_MAX_CONNECTIONS", "5")?;
        let min_connections = env_or("DATABASE_MIN_CONNECTIONS", "1")?;
        let connection_timeout_seconds = env_or("DATABASE_CONNECTION_TIMEOUT", "30")?;
        let idle_timeout_seconds = env_or("DATABASE_IDLE_TIMEOUT", "600")?;

        let corpus_path = std::env::var("CORPUS_PATH")
            .unwrap_or_else(|_| "foods.json".to_string())
            .into();
        let unmatched = env_or("UNMATCHED_RECIPES", "keep")?;

        let max_ingredients = env_or("MAX_INGREDIENTS", "5")?;
        let top_n = env_or("TOP_N", "3")?;
        let typo_distance = env_or("TYPO_DISTANCE", "1")?;
        let mode = env_or("RECOMMEND_MODE", "conjunctive")?;
        let save_path = std::env::var("SAVE_PATH")
            .unwrap_or_else(|_| "Saved_Recipes.txt".to_string())
            .into();

        Ok(Settings {
            database: DatabaseConfig {
                url: database_url,
                max_connections,
                min_connections,
                connection_timeout_seconds,
                idle_timeout_seconds,
            },
            corpus: CorpusConfig {
                path: corpus_path,
                unmatched,
            },
            recommender: RecommenderConfig {
                max_ingredients,
                top_n,
                typo_distance,
                mode,
                save_path,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            return Err(Error::Config(
                "DATABASE_MAX_CONNECTIONS must be non-zero".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(Error::Config(
                "DATABASE_MIN_CONNECTIONS cannot exceed DATABASE_MAX_CONNECTIONS".to_string(),
            ));
        }

        if self.recommender.max_ingredients == 0 {
            return Err(Error::Config("MAX_INGREDIENTS must be non-zero".to_string()));
        }

        if self.recommender.top_n == 0 {
            return Err(Error::Config("TOP_N must be non-zero".to_string()));
        }

        Ok(())
    }
}
