use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Recipe node
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub instructions: String,
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecipe {
    pub name: String,
    pub instructions: String,
    pub source_url: Option<String>,
}

/// IngredientPortion node: a raw portion string such as "2 cups whole milk"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct IngredientPortion {
    pub id: i64,
    pub text: String,
}

/// CanonicalIngredient node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CanonicalIngredient {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// MADE_WITH edge, addressed by the identities of both endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortionLink {
    pub recipe: String,
    pub portion: String,
    pub position: i64,
}

/// HAS_THE_ITEM edge, addressed by the identities of both endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientLink {
    pub recipe: String,
    pub ingredient: String,
}

/// A recipe together with its ordered MADE_WITH portion strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDetail {
    pub name: String,
    pub instructions: String,
    pub portions: Vec<String>,
}

/// Node and edge totals of the graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct GraphCounts {
    pub recipes: i64,
    pub portions: i64,
    pub ingredients: i64,
    pub made_with: i64,
    pub has_item: i64,
}
