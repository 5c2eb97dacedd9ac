use crate::db::{models::*, name_key, DbPool, BULK_CHUNK};
use crate::error::{Error, Result};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;

/// Merge a recipe by name; an existing recipe is returned untouched
pub async fn upsert_recipe(pool: &DbPool, new_recipe: &NewRecipe) -> Result<Recipe> {
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO recipes (name, name_key, instructions, source_url, created_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(name_key) DO NOTHING
        "#,
    )
    .bind(&new_recipe.name)
    .bind(name_key(&new_recipe.name))
    .bind(&new_recipe.instructions)
    .bind(&new_recipe.source_url)
    .bind(now)
    .execute(pool)
    .await?;

    get_recipe_by_name(pool, &new_recipe.name)
        .await?
        .ok_or_else(|| Error::QueryFailed(format!("Recipe '{}' was not stored", new_recipe.name)))
}

/// Get recipe by name (case-insensitive)
pub async fn get_recipe_by_name(pool: &DbPool, name: &str) -> Result<Option<Recipe>> {
    let recipe = sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE name_key = ?")
        .bind(name_key(name))
        .fetch_optional(pool)
        .await?;

    Ok(recipe)
}

/// Merge a portion string by exact text
pub async fn upsert_portion(pool: &DbPool, text: &str) -> Result<IngredientPortion> {
    sqlx::query("INSERT INTO portions (text) VALUES (?) ON CONFLICT(text) DO NOTHING")
        .bind(text)
        .execute(pool)
        .await?;

    get_portion(pool, text)
        .await?
        .ok_or_else(|| Error::QueryFailed(format!("Portion '{text}' was not stored")))
}

/// Get portion by exact text
pub async fn get_portion(pool: &DbPool, text: &str) -> Result<Option<IngredientPortion>> {
    let portion = sqlx::query_as::<_, IngredientPortion>("SELECT * FROM portions WHERE text = ?")
        .bind(text)
        .fetch_optional(pool)
        .await?;

    Ok(portion)
}

/// Link a recipe to a portion (MADE_WITH). Both endpoints must already exist.
pub async fn link_made_with(
    pool: &DbPool,
    recipe_name: &str,
    portion_text: &str,
    position: i64,
) -> Result<()> {
    let recipe = get_recipe_by_name(pool, recipe_name)
        .await?
        .ok_or_else(|| Error::QueryFailed(format!("Cannot link missing recipe '{recipe_name}'")))?;
    let portion = get_portion(pool, portion_text).await?.ok_or_else(|| {
        Error::QueryFailed(format!("Cannot link missing portion '{portion_text}'"))
    })?;

    sqlx::query(
        "INSERT OR IGNORE INTO recipe_portions (recipe_id, portion_id, position) VALUES (?, ?, ?)",
    )
    .bind(recipe.id)
    .bind(portion.id)
    .bind(position)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get the ordered portion strings of a recipe
pub async fn get_recipe_portions(pool: &DbPool, recipe_id: i64) -> Result<Vec<String>> {
    let portions: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT p.text
        FROM portions p
        JOIN recipe_portions rp ON rp.portion_id = p.id
        WHERE rp.recipe_id = ?
        ORDER BY rp.position, p.id
        "#,
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(portions)
}

/// Get portions for multiple recipes in a single query (batch loading to avoid N+1)
pub async fn get_portions_for_recipes(
    pool: &DbPool,
    recipe_ids: &[i64],
) -> Result<HashMap<i64, Vec<String>>> {
    let mut result: HashMap<i64, Vec<String>> = HashMap::new();

    for chunk in recipe_ids.chunks(BULK_CHUNK) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT rp.recipe_id, p.text FROM recipe_portions rp \
             JOIN portions p ON p.id = rp.portion_id WHERE rp.recipe_id IN (",
        );
        let mut ids = builder.separated(", ");
        for id in chunk {
            ids.push_bind(*id);
        }
        ids.push_unseparated(") ORDER BY rp.recipe_id, rp.position, p.id");

        let rows: Vec<(i64, String)> = builder.build_query_as().fetch_all(pool).await?;
        for (recipe_id, text) in rows {
            result.entry(recipe_id).or_default().push(text);
        }
    }

    Ok(result)
}

/// Attach portions to recipes, keeping the recipes' order
pub async fn with_portions(pool: &DbPool, recipes: Vec<Recipe>) -> Result<Vec<RecipeDetail>> {
    let ids: Vec<i64> = recipes.iter().map(|r| r.id).collect();
    let mut portions = get_portions_for_recipes(pool, &ids).await?;

    Ok(recipes
        .into_iter()
        .map(|recipe| RecipeDetail {
            portions: portions.remove(&recipe.id).unwrap_or_default(),
            name: recipe.name,
            instructions: recipe.instructions,
        })
        .collect())
}

/// Get instructions and portions of a recipe by name (case-insensitive)
pub async fn get_recipe_detail(pool: &DbPool, name: &str) -> Result<Option<RecipeDetail>> {
    let Some(recipe) = get_recipe_by_name(pool, name).await? else {
        return Ok(None);
    };

    let portions = get_recipe_portions(pool, recipe.id).await?;

    Ok(Some(RecipeDetail {
        name: recipe.name,
        instructions: recipe.instructions,
        portions,
    }))
}

/// List every recipe with its portions, in insertion order
pub async fn list_recipes_with_portions(pool: &DbPool) -> Result<Vec<RecipeDetail>> {
    let recipes = sqlx::query_as::<_, Recipe>("SELECT * FROM recipes ORDER BY id")
        .fetch_all(pool)
        .await?;

    with_portions(pool, recipes).await
}

/// Bulk merge of recipe nodes. Returns the number of newly created recipes.
pub async fn insert_recipes(conn: &mut SqliteConnection, recipes: &[NewRecipe]) -> Result<u64> {
    let now = Utc::now();
    let mut created = 0;

    for chunk in recipes.chunks(BULK_CHUNK) {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT INTO recipes (name, name_key, instructions, source_url, created_at) ");
        builder.push_values(chunk, |mut row, recipe| {
            row.push_bind(recipe.name.clone())
                .push_bind(name_key(&recipe.name))
                .push_bind(recipe.instructions.clone())
                .push_bind(recipe.source_url.clone())
                .push_bind(now);
        });
        builder.push(" ON CONFLICT(name_key) DO NOTHING");

        created += builder.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(created)
}

/// Bulk merge of portion nodes. Returns the number of newly created portions.
pub async fn insert_portions(conn: &mut SqliteConnection, portions: &[String]) -> Result<u64> {
    let mut created = 0;

    for chunk in portions.chunks(BULK_CHUNK) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("INSERT INTO portions (text) ");
        builder.push_values(chunk, |mut row, text| {
            row.push_bind(text.clone());
        });
        builder.push(" ON CONFLICT(text) DO NOTHING");

        created += builder.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(created)
}

/// Bulk merge of MADE_WITH edges. Links whose endpoints are absent are not created.
pub async fn insert_portion_links(
    conn: &mut SqliteConnection,
    links: &[PortionLink],
) -> Result<u64> {
    let mut created = 0;

    for chunk in links.chunks(BULK_CHUNK) {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("WITH links (recipe_key, portion_text, position) AS (");
        builder.push_values(chunk, |mut row, link| {
            row.push_bind(name_key(&link.recipe))
                .push_bind(link.portion.clone())
                .push_bind(link.position);
        });
        builder.push(
            r#")
            INSERT OR IGNORE INTO recipe_portions (recipe_id, portion_id, position)
            SELECT r.id, p.id, links.position
            FROM links
            JOIN recipes r ON r.name_key = links.recipe_key
            JOIN portions p ON p.text = links.portion_text
            "#,
        );

        created += builder.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(created)
}
