use mealgraph::corpus::{CorpusBuilder, UnmatchedPolicy};
use mealgraph::db::models::GraphCounts;
use mealgraph::normalizer::Normalizer;
use mealgraph::store::{BatchReport, GraphStore, SqliteGraphStore};
use mealgraph::Error;
use std::path::PathBuf;
use std::sync::Arc;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/foods.json")
}

async fn sqlite_store() -> Arc<SqliteGraphStore> {
    // Single connection so every query sees the same in-memory database
    let pool = mealgraph::db::init_pool("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Arc::new(SqliteGraphStore::new(pool))
}

#[tokio::test]
async fn test_build_from_fixture() {
    let store = sqlite_store().await;
    let builder = CorpusBuilder::new(store.clone(), Normalizer::new(), UnmatchedPolicy::Keep);

    let report = builder
        .build_from_file(&fixture())
        .await
        .expect("Build failed");

    assert_eq!(report.records_read, 20);
    // null name, unknown TYPE, duplicate meal
    assert_eq!(report.records_skipped, 3);
    assert_eq!(report.vocabulary_size, 11);
    assert_eq!(report.recipes_written, 6);
    assert_eq!(report.unmatched, vec!["Plain Ice"]);
    assert_eq!(report.corpus_digest.len(), 64);

    let counts = store.counts().await.unwrap();
    assert_eq!(
        counts,
        GraphCounts {
            recipes: 6,
            portions: 12,
            // Tomato is in the vocabulary but no recipe uses it
            ingredients: 10,
            made_with: 16,
            has_item: 15,
        }
    );

    let soup = store
        .recipe_detail("EGG DROP SOUP")
        .await
        .unwrap()
        .expect("Egg Drop Soup missing");
    assert_eq!(
        soup.portions,
        vec!["1 tbs sesame oil", "4 cups water", "2 eggs"]
    );
    assert!(soup.instructions.starts_with("Bring the water"));
}

#[tokio::test]
async fn test_build_twice_is_idempotent() {
    let store = sqlite_store().await;
    let builder = CorpusBuilder::new(store.clone(), Normalizer::new(), UnmatchedPolicy::Keep);

    builder.build_from_file(&fixture()).await.unwrap();
    let once = store.counts().await.unwrap();

    let second = builder.build_from_file(&fixture()).await.unwrap();
    assert_eq!(second.batch, BatchReport::default());
    assert_eq!(store.counts().await.unwrap(), once);
}

#[tokio::test]
async fn test_longest_ingredient_wins() {
    let store = sqlite_store().await;
    let builder = CorpusBuilder::new(store.clone(), Normalizer::new(), UnmatchedPolicy::Keep);
    builder.build_from_file(&fixture()).await.unwrap();

    let with_milk = store.recipes_with_all(&["Milk".to_string()]).await.unwrap();
    let names: Vec<_> = with_milk.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Pancakes"]);

    let with_soy = store
        .recipes_with_all(&["Soy Milk".to_string()])
        .await
        .unwrap();
    assert_eq!(with_soy.len(), 1);
    assert_eq!(with_soy[0].name, "Vegan Pancakes");
}

#[tokio::test]
async fn test_drop_policy_leaves_out_unmatched_recipes() {
    let store = sqlite_store().await;
    let builder = CorpusBuilder::new(store.clone(), Normalizer::new(), UnmatchedPolicy::Drop);

    let report = builder.build_from_file(&fixture()).await.unwrap();
    assert_eq!(report.recipes_written, 5);
    assert_eq!(report.unmatched, vec!["Plain Ice"]);
    assert!(store.recipe_detail("Plain Ice").await.unwrap().is_none());
}

#[tokio::test]
async fn test_malformed_corpus_writes_nothing() {
    let store = sqlite_store().await;
    let builder = CorpusBuilder::new(store.clone(), Normalizer::new(), UnmatchedPolicy::Keep);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("foods.json");
    std::fs::write(&path, r#"[{"TYPE": "INGREDIENT", "Food Name": "Milk"},"#).unwrap();

    let result = builder.build_from_file(&path).await;
    match result {
        Err(e @ Error::Input(_)) => assert_eq!(e.exit_code(), 2),
        other => panic!("expected input error, got {other:?}"),
    }
    assert_eq!(store.counts().await.unwrap(), GraphCounts::default());

    let missing = builder.build_from_file(&dir.path().join("absent.json")).await;
    assert!(matches!(missing, Err(Error::Input(_))));
}
