//! Append-only saved-recipe file.

use crate::db::models::RecipeDetail;
use crate::error::Result;
use crate::utils::sanitize::sanitize_text;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Render one recipe as a saved block
pub fn format_saved_block(recipe: &RecipeDetail) -> String {
    let mut block = String::new();

    block.push('\n');
    block.push_str(&"=".repeat(40));
    block.push('\n');
    block.push_str(&format!("RECIPE: {}\n", sanitize_text(&recipe.name).to_uppercase()));
    block.push_str(&"-".repeat(40));
    block.push('\n');
    block.push_str("INGREDIENTS:\n");
    for portion in &recipe.portions {
        block.push_str(&format!(" - {}\n", sanitize_text(portion)));
    }
    block.push('\n');
    block.push_str("INSTRUCTIONS:\n");
    block.push_str(&sanitize_text(&recipe.instructions));
    block.push('\n');
    block.push_str(&"=".repeat(40));
    block.push('\n');

    block
}

/// Append a recipe to the saved-recipes file, creating it if needed
pub async fn append_recipe(path: &Path, recipe: &RecipeDetail) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format_saved_block(recipe).as_bytes()).await?;
    file.flush().await?;

    info!("Saved '{}' to {}", recipe.name, path.display());
    Ok(())
}
