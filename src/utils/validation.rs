// Validation utilities
use crate::error::{Error, Result};
use tracing::warn;
use url::Url;

/// Ingredient arguments that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientArgs {
    pub tokens: Vec<String>,
    /// How many trailing arguments were ignored
    pub dropped: usize,
}

/// Validate the ingredient names given on the command line.
///
/// Any token containing a digit rejects the whole input. Blank tokens are
/// ignored, and only the first `max` remaining tokens are kept.
pub fn validate_ingredients(raw: &[String], max: usize) -> Result<IngredientArgs> {
    let offending: Vec<&str> = raw
        .iter()
        .map(|t| t.trim())
        .filter(|t| t.chars().any(|c| c.is_ascii_digit()))
        .collect();
    if !offending.is_empty() {
        return Err(Error::Validation(format!(
            "Ingredient names cannot contain numbers: {}",
            offending.join(", ")
        )));
    }

    let mut tokens: Vec<String> = raw
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if tokens.is_empty() {
        return Err(Error::Validation(
            "At least one ingredient is required".to_string(),
        ));
    }

    let dropped = tokens.len().saturating_sub(max);
    if dropped > 0 {
        warn!(
            "Only the first {} ingredients are used, ignoring: {}",
            max,
            tokens[max..].join(", ")
        );
        tokens.truncate(max);
    }

    Ok(IngredientArgs { tokens, dropped })
}

/// Validate a recipe source URL: absolute, http or https, with a host
pub fn validate_source_url(url_str: &str) -> Result<Url> {
    let url = Url::parse(url_str.trim())
        .map_err(|e| Error::Validation(format!("Invalid URL '{url_str}': {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(Error::Validation(format!(
                "URL must use http or https scheme, got {other}: {url_str}"
            )))
        }
    }

    if url.host_str().is_none() {
        return Err(Error::Validation("URL must have a valid host".to_string()));
    }

    Ok(url)
}
