use crate::db::models::CanonicalIngredient;
use crate::error::{AmbiguousToken, Error, Result};
use crate::normalizer::Normalizer;
use crate::store::GraphStore;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a single user token resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// The only candidate, and it is what the user typed
    Exact(CanonicalIngredient),
    /// The only candidate, under a different name than typed
    SingleSuggestion(CanonicalIngredient),
    /// Two or more candidates, ordered by name
    Ambiguous(Vec<CanonicalIngredient>),
    NoMatch,
}

impl ResolutionOutcome {
    pub fn ingredient(&self) -> Option<&CanonicalIngredient> {
        match self {
            ResolutionOutcome::Exact(i) | ResolutionOutcome::SingleSuggestion(i) => Some(i),
            _ => None,
        }
    }
}

pub struct IngredientResolver {
    store: Arc<dyn GraphStore>,
    normalizer: Normalizer,
    typo_distance: usize,
}

impl IngredientResolver {
    pub fn new(store: Arc<dyn GraphStore>, normalizer: Normalizer, typo_distance: usize) -> Self {
        Self {
            store,
            normalizer,
            typo_distance,
        }
    }

    /// Resolve one user token against the canonical vocabulary
    pub async fn resolve(&self, user_text: &str) -> Result<ResolutionOutcome> {
        let needle = self.normalizer.normalize_as_string(user_text);
        if needle.is_empty() {
            debug!("'{}' normalizes to nothing", user_text);
            return Ok(ResolutionOutcome::NoMatch);
        }

        let mut candidates = self.store.find_ingredients_containing(&needle).await?;

        let outcome = match candidates.len() {
            0 => self.closest(&needle).await?,
            1 => {
                let only = candidates.remove(0);
                if only.name.to_lowercase() == user_text.trim().to_lowercase() {
                    ResolutionOutcome::Exact(only)
                } else {
                    ResolutionOutcome::SingleSuggestion(only)
                }
            }
            _ => ResolutionOutcome::Ambiguous(candidates),
        };

        debug!(?outcome, "Resolved '{}'", user_text);
        Ok(outcome)
    }

    /// Typo fallback: the unique nearest ingredient within `typo_distance` edits
    async fn closest(&self, needle: &str) -> Result<ResolutionOutcome> {
        if self.typo_distance == 0 {
            return Ok(ResolutionOutcome::NoMatch);
        }

        let mut best: Option<usize> = None;
        let mut nearest = Vec::new();

        for ingredient in self.store.list_ingredients().await? {
            let distance = levenshtein(needle, &ingredient.name.to_lowercase());
            if distance > self.typo_distance {
                continue;
            }
            match best {
                Some(d) if distance > d => {}
                Some(d) if distance == d => nearest.push(ingredient),
                _ => {
                    best = Some(distance);
                    nearest = vec![ingredient];
                }
            }
        }

        Ok(match nearest.len() {
            1 => ResolutionOutcome::SingleSuggestion(nearest.remove(0)),
            _ => ResolutionOutcome::NoMatch,
        })
    }

    /// Resolve a batch of tokens.
    ///
    /// Any ambiguous token fails the whole batch with every ambiguity listed.
    /// Tokens with no match are dropped; the rest are de-duplicated in input order.
    pub async fn resolve_all(&self, tokens: &[String]) -> Result<Vec<CanonicalIngredient>> {
        let mut resolved = Vec::new();
        let mut ambiguous = Vec::new();
        let mut seen = HashSet::new();

        for token in tokens {
            match self.resolve(token).await? {
                ResolutionOutcome::Exact(ingredient) => {
                    if seen.insert(ingredient.name.to_lowercase()) {
                        resolved.push(ingredient);
                    }
                }
                ResolutionOutcome::SingleSuggestion(ingredient) => {
                    info!("Using '{}' for '{}'", ingredient.name, token);
                    if seen.insert(ingredient.name.to_lowercase()) {
                        resolved.push(ingredient);
                    }
                }
                ResolutionOutcome::Ambiguous(candidates) => ambiguous.push(AmbiguousToken {
                    input: token.clone(),
                    candidates: candidates.into_iter().map(|c| c.name).collect(),
                }),
                ResolutionOutcome::NoMatch => warn!("No ingredient matches '{}'", token),
            }
        }

        if !ambiguous.is_empty() {
            return Err(Error::Ambiguity(ambiguous));
        }

        Ok(resolved)
    }
}

/// Edit distance between two strings, counted in characters
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryGraphStore;

    async fn resolver(vocabulary: &[&str]) -> IngredientResolver {
        let store = Arc::new(InMemoryGraphStore::new());
        for name in vocabulary {
            store.upsert_canonical_ingredient(name).await.unwrap();
        }
        IngredientResolver::new(store, Normalizer::new(), 1)
    }

    fn names(outcome: &ResolutionOutcome) -> Vec<String> {
        match outcome {
            ResolutionOutcome::Ambiguous(candidates) => {
                candidates.iter().map(|c| c.name.clone()).collect()
            }
            other => other.ingredient().map(|i| vec![i.name.clone()]).unwrap_or_default(),
        }
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("milk", "milk"), 0);
        assert_eq!(levenshtein("milkk", "milk"), 1);
        assert_eq!(levenshtein("mlik", "milk"), 2);
        assert_eq!(levenshtein("", "egg"), 3);
        assert_eq!(levenshtein("crème", "creme"), 1);
    }

    #[tokio::test]
    async fn test_exact_and_suggestion() {
        let resolver = resolver(&["Milk", "Egg"]).await;

        let outcome = resolver.resolve(" MILK ").await.unwrap();
        assert!(matches!(outcome, ResolutionOutcome::Exact(_)));

        let outcome = resolver.resolve("eggs").await.unwrap();
        assert!(matches!(outcome, ResolutionOutcome::SingleSuggestion(_)));
        assert_eq!(names(&outcome), vec!["Egg"]);
    }

    #[tokio::test]
    async fn test_ambiguous_lists_every_candidate() {
        let resolver = resolver(&["Soy Milk", "Milk", "Oat Milk"]).await;

        let outcome = resolver.resolve("milk").await.unwrap();
        assert!(matches!(outcome, ResolutionOutcome::Ambiguous(_)));
        assert_eq!(names(&outcome), vec!["Milk", "Oat Milk", "Soy Milk"]);
    }

    #[tokio::test]
    async fn test_typo_becomes_suggestion() {
        let resolver = resolver(&["Milk"]).await;

        let outcome = resolver.resolve("milkk").await.unwrap();
        assert!(matches!(outcome, ResolutionOutcome::SingleSuggestion(_)));
        assert_eq!(names(&outcome), vec!["Milk"]);

        let outcome = resolver.resolve("mlikk").await.unwrap();
        assert_eq!(outcome, ResolutionOutcome::NoMatch);
    }

    #[tokio::test]
    async fn test_typo_tie_is_no_match() {
        let resolver = resolver(&["Rice", "Mice"]).await;
        assert_eq!(
            resolver.resolve("bice").await.unwrap(),
            ResolutionOutcome::NoMatch
        );
    }

    #[tokio::test]
    async fn test_no_match_and_empty_input() {
        let resolver = resolver(&["Milk"]).await;
        assert_eq!(
            resolver.resolve("saffron").await.unwrap(),
            ResolutionOutcome::NoMatch
        );
        assert_eq!(
            resolver.resolve("42 !!").await.unwrap(),
            ResolutionOutcome::NoMatch
        );
    }

    #[tokio::test]
    async fn test_resolve_all_aborts_on_ambiguity() {
        let resolver = resolver(&["Milk", "Oat Milk", "Soy Milk", "Egg"]).await;

        let result = resolver
            .resolve_all(&["egg".to_string(), "milk".to_string()])
            .await;

        match result {
            Err(Error::Ambiguity(tokens)) => {
                assert_eq!(tokens.len(), 1);
                assert_eq!(tokens[0].input, "milk");
                assert_eq!(tokens[0].candidates, vec!["Milk", "Oat Milk", "Soy Milk"]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resolve_all_drops_unknown_and_duplicates() {
        let resolver = resolver(&["Egg", "Water"]).await;

        let resolved = resolver
            .resolve_all(&[
                "eggs".to_string(),
                "saffron".to_string(),
                "Egg".to_string(),
                "water".to_string(),
            ])
            .await
            .unwrap();

        let names: Vec<_> = resolved.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Egg", "Water"]);
    }
}
