//! Rule-based English noun lemmatizer.
//!
//! Covers the plural forms that show up in ingredient names. Irregular forms are
//! looked up first, then suffix rules are tried in order. Output is always a
//! fixed point: lemmatizing a lemma returns it unchanged.

/// Plurals the suffix rules would get wrong.
const IRREGULAR: &[(&str, &str)] = &[
    ("leaves", "leaf"),
    ("loaves", "loaf"),
    ("halves", "half"),
    ("knives", "knife"),
    ("calves", "calf"),
    ("tomatoes", "tomato"),
    ("potatoes", "potato"),
    ("cookies", "cookie"),
    ("brownies", "brownie"),
    ("quiches", "quiche"),
    ("geese", "goose"),
    ("teeth", "tooth"),
    ("feet", "foot"),
    ("mice", "mouse"),
    ("children", "child"),
    ("molasses", "molasses"),
    ("series", "series"),
    ("species", "species"),
];

/// Words ending in these are singular as written.
const SINGULAR_ENDINGS: &[&str] = &["ss", "us", "is"];

/// Reduce a lowercase token to its dictionary base form.
pub fn lemmatize(word: &str) -> String {
    if let Some((_, lemma)) = IRREGULAR.iter().find(|(plural, _)| *plural == word) {
        return (*lemma).to_string();
    }

    let len = word.chars().count();
    if len <= 3 || SINGULAR_ENDINGS.iter().any(|end| word.ends_with(end)) {
        return word.to_string();
    }

    if let Some(stem) = word.strip_suffix("sses") {
        return format!("{stem}ss");
    }
    if len > 4 {
        if let Some(stem) = word.strip_suffix("ies") {
            return format!("{stem}y");
        }
    }
    if len > 5 {
        if let Some(stem) = word.strip_suffix("oes") {
            return format!("{stem}o");
        }
    }
    for (suffix, replacement) in [("ches", "ch"), ("shes", "sh"), ("xes", "x")] {
        if let Some(stem) = word.strip_suffix(suffix) {
            return format!("{stem}{replacement}");
        }
    }

    match word.strip_suffix('s') {
        Some(stem) if !SINGULAR_ENDINGS.iter().any(|end| stem.ends_with(end)) => stem.to_string(),
        _ => word.to_string(),
    }
}
