use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, warn};

/// One scraped page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRecord {
    Meal(MealRecord),
    Ingredient(IngredientRecord),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealRecord {
    pub name: String,
    pub portions: Vec<String>,
    pub instructions: String,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientRecord {
    pub name: String,
}

/// Wire shape of a record. Keys follow the scraper (`"Food Name"`); the
/// underscore spelling is accepted as well.
#[derive(Debug, Deserialize)]
#[serde(tag = "TYPE")]
enum WireRecord {
    #[serde(rename = "MEAL")]
    Meal {
        #[serde(rename = "Food Name", alias = "Food_Name", default)]
        name: Option<String>,
        #[serde(rename = "Ingredients Used", alias = "Ingredients_Used", default)]
        ingredients_used: Vec<Value>,
        #[serde(rename = "Instructions", default)]
        instructions: Option<String>,
        #[serde(rename = "Meal URL", alias = "Meal_URL", default)]
        meal_url: Option<String>,
    },
    #[serde(rename = "INGREDIENT")]
    Ingredient {
        #[serde(rename = "Food Name", alias = "Food_Name", default)]
        name: Option<String>,
    },
}

/// Records read from a corpus file, with what had to be skipped
#[derive(Debug, Clone, Default)]
pub struct LoadedCorpus {
    pub records: Vec<RawRecord>,
    pub total: usize,
    pub skipped: usize,
    /// SHA-256 of the file contents, hex encoded
    pub digest: String,
}

/// Read and parse a corpus file. An unreadable file or a document that is not a
/// JSON array is an `Input` error; individual bad records are skipped.
pub async fn load_records(path: &Path) -> Result<LoadedCorpus> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Error::Input(format!("Cannot read corpus {}: {e}", path.display())))?;

    let mut corpus = parse_records(&bytes)
        .map_err(|e| Error::Input(format!("Malformed corpus {}: {e}", path.display())))?;
    corpus.digest = format!("{:x}", Sha256::digest(&bytes));

    Ok(corpus)
}

/// Parse a JSON array of tagged records
pub fn parse_records(bytes: &[u8]) -> std::result::Result<LoadedCorpus, serde_json::Error> {
    let values: Vec<Value> = serde_json::from_slice(bytes)?;
    let total = values.len();

    let mut records = Vec::with_capacity(total);
    let mut skipped = 0;

    for (index, value) in values.into_iter().enumerate() {
        match convert(value) {
            Ok(record) => records.push(record),
            Err(reason) => {
                warn!("Skipping record {}: {}", index, reason);
                skipped += 1;
            }
        }
    }

    debug!("Parsed {} of {} corpus records", records.len(), total);

    Ok(LoadedCorpus {
        records,
        total,
        skipped,
        digest: String::new(),
    })
}

fn convert(value: Value) -> std::result::Result<RawRecord, String> {
    let wire: WireRecord = serde_json::from_value(value).map_err(|e| e.to_string())?;

    match wire {
        WireRecord::Meal {
            name,
            ingredients_used,
            instructions,
            meal_url,
        } => {
            let name = non_empty(name).ok_or("meal has no name")?;

            let mut portions = Vec::with_capacity(ingredients_used.len());
            for entry in ingredients_used {
                match entry {
                    Value::String(text) if !text.trim().is_empty() => portions.push(text),
                    Value::String(_) => {}
                    other => warn!("Dropping non-string portion {} in '{}'", other, name),
                }
            }

            Ok(RawRecord::Meal(MealRecord {
                name,
                portions,
                instructions: instructions.unwrap_or_default(),
                source_url: meal_url,
            }))
        }
        WireRecord::Ingredient { name } => {
            let name = non_empty(name).ok_or("ingredient has no name")?;
            Ok(RawRecord::Ingredient(IngredientRecord { name }))
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scraper_records() {
        let json = br#"[
            {"TYPE": "MEAL", "Food Name": " Egg Drop Soup ",
             "Ingredients Used": ["1 tbs sesame oil", "4 cups water", "2 eggs"],
             "Instructions": "Boil the water.", "Meal URL": "https://www.themealdb.com/meal/1"},
            {"TYPE": "INGREDIENT", "Food Name": "Eggs"},
            {"TYPE": "INGREDIENT", "Food_Name": "Water"}
        ]"#;

        let corpus = parse_records(json).unwrap();
        assert_eq!(corpus.total, 3);
        assert_eq!(corpus.skipped, 0);

        match &corpus.records[0] {
            RawRecord::Meal(meal) => {
                assert_eq!(meal.name, "Egg Drop Soup");
                assert_eq!(meal.portions.len(), 3);
                assert_eq!(meal.source_url.as_deref(), Some("https://www.themealdb.com/meal/1"));
            }
            other => panic!("expected a meal, got {other:?}"),
        }
        assert_eq!(
            corpus.records[2],
            RawRecord::Ingredient(IngredientRecord {
                name: "Water".to_string()
            })
        );
    }

    #[test]
    fn test_bad_records_are_skipped() {
        let json = br#"[
            {"TYPE": "INGREDIENT", "Food Name": null},
            {"TYPE": "INGREDIENT", "Food Name": 42},
            {"TYPE": "DRINK", "Food Name": "Tea"},
            {"Food Name": "No tag"},
            {"TYPE": "MEAL", "Food Name": "Toast", "Ingredients Used": ["bread", 3, ""]}
        ]"#;

        let corpus = parse_records(json).unwrap();
        assert_eq!(corpus.total, 5);
        assert_eq!(corpus.skipped, 4);

        match &corpus.records[0] {
            RawRecord::Meal(meal) => {
                assert_eq!(meal.portions, vec!["bread"]);
                assert_eq!(meal.instructions, "");
            }
            other => panic!("expected a meal, got {other:?}"),
        }
    }

    #[test]
    fn test_non_array_document_is_rejected() {
        assert!(parse_records(br#"{"TYPE": "MEAL"}"#).is_err());
        assert!(parse_records(b"not json").is_err());
    }

    #[tokio::test]
    async fn test_missing_file_is_input_error() {
        let result = load_records(Path::new("/nonexistent/foods.json")).await;
        assert!(matches!(result, Err(Error::Input(_))));
    }
}
