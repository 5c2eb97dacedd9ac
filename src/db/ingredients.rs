use crate::db::recipes::get_recipe_by_name;
use crate::db::{models::*, name_key, DbPool, BULK_CHUNK};
use crate::error::{Error, Result};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

/// Merge a canonical ingredient by name (case-insensitive)
pub async fn upsert_ingredient(pool: &DbPool, name: &str) -> Result<CanonicalIngredient> {
    sqlx::query(
        "INSERT INTO ingredients (name, name_key, created_at) VALUES (?, ?, ?) ON CONFLICT(name_key) DO NOTHING",
    )
    .bind(name)
    .bind(name_key(name))
    .bind(Utc::now())
    .execute(pool)
    .await?;

    find_ingredient_exact(pool, name)
        .await?
        .ok_or_else(|| Error::QueryFailed(format!("Ingredient '{name}' was not stored")))
}

/// Find an ingredient whose name equals `name`, ignoring case
pub async fn find_ingredient_exact(pool: &DbPool, name: &str) -> Result<Option<CanonicalIngredient>> {
    let ingredient =
        sqlx::query_as::<_, CanonicalIngredient>("SELECT * FROM ingredients WHERE name_key = ?")
            .bind(name_key(name))
            .fetch_optional(pool)
            .await?;

    Ok(ingredient)
}

/// Find ingredients whose name contains `needle`, ignoring case, ordered by name
pub async fn find_ingredients_containing(
    pool: &DbPool,
    needle: &str,
) -> Result<Vec<CanonicalIngredient>> {
    if needle.is_empty() {
        return Ok(Vec::new());
    }

    // instr() instead of LIKE so '%' and '_' in user text stay literal
    let ingredients = sqlx::query_as::<_, CanonicalIngredient>(
        r#"
        SELECT * FROM ingredients
        WHERE instr(name_key, ?) > 0
        ORDER BY name_key
        "#,
    )
    .bind(needle.to_lowercase())
    .fetch_all(pool)
    .await?;

    Ok(ingredients)
}

/// List every canonical ingredient ordered by name
pub async fn list_ingredients(pool: &DbPool) -> Result<Vec<CanonicalIngredient>> {
    let ingredients =
        sqlx::query_as::<_, CanonicalIngredient>("SELECT * FROM ingredients ORDER BY name_key")
            .fetch_all(pool)
            .await?;

    Ok(ingredients)
}

/// Link a recipe to a canonical ingredient (HAS_THE_ITEM). Both endpoints must already exist.
pub async fn link_has_item(pool: &DbPool, recipe_name: &str, ingredient_name: &str) -> Result<()> {
    let recipe = get_recipe_by_name(pool, recipe_name)
        .await?
        .ok_or_else(|| Error::QueryFailed(format!("Cannot link missing recipe '{recipe_name}'")))?;
    let ingredient = find_ingredient_exact(pool, ingredient_name)
        .await?
        .ok_or_else(|| {
            Error::QueryFailed(format!("Cannot link missing ingredient '{ingredient_name}'"))
        })?;

    sqlx::query("INSERT OR IGNORE INTO recipe_ingredients (recipe_id, ingredient_id) VALUES (?, ?)")
        .bind(recipe.id)
        .bind(ingredient.id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Recipes whose HAS_THE_ITEM set contains every one of `names`, ordered by name
pub async fn recipes_with_all(pool: &DbPool, names: &[String]) -> Result<Vec<Recipe>> {
    let mut wanted: Vec<String> = names
        .iter()
        .map(|name| name_key(name))
        .filter(|name| !name.is_empty())
        .collect();
    wanted.sort();
    wanted.dedup();

    if wanted.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        r#"
        SELECT r.*
        FROM recipes r
        JOIN recipe_ingredients ri ON ri.recipe_id = r.id
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE i.name_key IN ("#,
    );
    let mut separated = builder.separated(", ");
    for name in &wanted {
        separated.push_bind(name.clone());
    }
    separated.push_unseparated(") GROUP BY r.id HAVING COUNT(DISTINCT i.id) = ");
    builder.push_bind(wanted.len() as i64);
    builder.push(" ORDER BY r.name_key");

    let recipes = builder.build_query_as::<Recipe>().fetch_all(pool).await?;
    Ok(recipes)
}

/// Bulk merge of ingredient nodes. Returns the number of newly created ingredients.
pub async fn insert_ingredients(conn: &mut SqliteConnection, names: &[String]) -> Result<u64> {
    let now = Utc::now();
    let mut created = 0;

    for chunk in names.chunks(BULK_CHUNK) {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT INTO ingredients (name, name_key, created_at) ");
        builder.push_values(chunk, |mut row, name| {
            row.push_bind(name.clone())
                .push_bind(name_key(name))
                .push_bind(now);
        });
        builder.push(" ON CONFLICT(name_key) DO NOTHING");

        created += builder.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(created)
}

/// Bulk merge of HAS_THE_ITEM edges. Links whose endpoints are absent are not created.
pub async fn insert_ingredient_links(
    conn: &mut SqliteConnection,
    links: &[IngredientLink],
) -> Result<u64> {
    let mut created = 0;

    for chunk in links.chunks(BULK_CHUNK) {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("WITH links (recipe_key, ingredient_key) AS (");
        builder.push_values(chunk, |mut row, link| {
            row.push_bind(name_key(&link.recipe))
                .push_bind(name_key(&link.ingredient));
        });
        builder.push(
            r#")
            INSERT OR IGNORE INTO recipe_ingredients (recipe_id, ingredient_id)
            SELECT r.id, i.id
            FROM links
            JOIN recipes r ON r.name_key = links.recipe_key
            JOIN ingredients i ON i.name_key = links.ingredient_key
            "#,
        );

        created += builder.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::recipes::upsert_recipe;
    use crate::db::{init_pool, run_migrations};

    async fn seeded_pool() -> DbPool {
        let pool = init_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        for name in ["Milk", "Oat Milk", "Soy Milk", "Egg"] {
            upsert_ingredient(&pool, name).await.unwrap();
        }

        let recipes = [
            ("Pancakes", vec!["Milk", "Egg"]),
            ("Custard", vec!["Milk", "Egg"]),
            ("Latte", vec!["Oat Milk"]),
            ("Omelette", vec!["Egg"]),
        ];
        for (name, items) in recipes {
            upsert_recipe(
                &pool,
                &NewRecipe {
                    name: name.to_string(),
                    instructions: String::new(),
                    source_url: None,
                },
            )
            .await
            .unwrap();
            for item in items {
                link_has_item(&pool, name, item).await.unwrap();
            }
        }

        pool
    }

    #[tokio::test]
    async fn test_ingredient_merge_is_case_insensitive() {
        let pool = seeded_pool().await;

        let first = upsert_ingredient(&pool, "milk").await.unwrap();
        assert_eq!(first.name, "Milk");

        let found = find_ingredient_exact(&pool, "MILK").await.unwrap();
        assert!(found.is_some());
        assert_eq!(list_ingredients(&pool).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_find_ingredients_containing() {
        let pool = seeded_pool().await;

        let names: Vec<String> = find_ingredients_containing(&pool, "MILK")
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["Milk", "Oat Milk", "Soy Milk"]);

        assert!(find_ingredients_containing(&pool, "").await.unwrap().is_empty());
        assert!(find_ingredients_containing(&pool, "%").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recipes_with_all() {
        let pool = seeded_pool().await;

        let names = |recipes: Vec<Recipe>| -> Vec<String> {
            recipes.into_iter().map(|r| r.name).collect()
        };

        let egg = recipes_with_all(&pool, &["egg".to_string()]).await.unwrap();
        assert_eq!(names(egg), vec!["Custard", "Omelette", "Pancakes"]);

        let both = recipes_with_all(&pool, &["Egg".to_string(), "milk".to_string()])
            .await
            .unwrap();
        assert_eq!(names(both), vec!["Custard", "Pancakes"]);

        let duplicated = recipes_with_all(&pool, &["Egg".to_string(), "egg".to_string()])
            .await
            .unwrap();
        assert_eq!(duplicated.len(), 3);

        assert!(recipes_with_all(&pool, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_ascii_names_fold_case() {
        let pool = seeded_pool().await;
        upsert_ingredient(&pool, "Éclair").await.unwrap();
        upsert_ingredient(&pool, "Şeker").await.unwrap();
        upsert_recipe(
            &pool,
            &NewRecipe {
                name: "Profiterole".to_string(),
                instructions: String::new(),
                source_url: None,
            },
        )
        .await
        .unwrap();
        link_has_item(&pool, "profiterole", "éclair").await.unwrap();

        let merged = upsert_ingredient(&pool, "ŞEKER").await.unwrap();
        assert_eq!(merged.name, "Şeker");
        assert!(find_ingredient_exact(&pool, "éCLAIR").await.unwrap().is_some());

        let found = find_ingredients_containing(&pool, "éclair").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Éclair");

        let recipes = recipes_with_all(&pool, &["Éclair".to_string()]).await.unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].name, "Profiterole");
    }
}
