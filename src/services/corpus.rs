use std::path::Path;

use anyhow::{Context, Result};

use crate::models::Recipe;

const EMBEDDED_RECIPES: &str = include_str!("../../data/recipes.json");

/// The searchable recipe collection, loaded once at startup.
#[derive(Debug, Clone)]
pub struct RecipeCorpus {
    recipes: Vec<Recipe>,
}

impl RecipeCorpus {
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self { recipes }
    }

    /// Load the corpus from `path`, falling back to the built-in recipes on any failure.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match read_recipes(path) {
            Ok(recipes) => {
                log::info!("📚 Loaded {} recipes from {}", recipes.len(), path.display());
                Self::new(recipes)
            }
            Err(e) => {
                log::warn!("⚠️ Using embedded recipes: {:#}", e);
                Self::embedded()
            }
        }
    }

    pub fn embedded() -> Self {
        // The embedded file is checked by the tests below.
        let recipes = serde_json::from_str(EMBEDDED_RECIPES).unwrap_or_default();
        Self::new(recipes)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Case-insensitive substring match on name, description, ingredients or collection.
    pub fn search(&self, query: &str) -> Vec<&Recipe> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.recipes
            .iter()
            .filter(|recipe| {
                recipe.name.to_lowercase().contains(&needle)
                    || recipe.description.to_lowercase().contains(&needle)
                    || recipe
                        .ingredient_list()
                        .as_slice()
                        .iter()
                        .any(|i| i.to_lowercase().contains(&needle))
                    || recipe.collection.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn find(&self, name: &str) -> Option<&Recipe> {
        let name = name.trim();
        self.recipes
            .iter()
            .find(|recipe| recipe.name.eq_ignore_ascii_case(name))
    }
}

fn read_recipes(path: &Path) -> Result<Vec<Recipe>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let recipes: Vec<Recipe> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    if recipes.is_empty() {
        anyhow::bail!("{} contains no recipes", path.display());
    }
    Ok(recipes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_corpus_parses() {
        let parsed: Vec<Recipe> = serde_json::from_str(EMBEDDED_RECIPES).unwrap();
        assert_eq!(parsed.len(), 6);

        let corpus = RecipeCorpus::embedded();
        let biryani = corpus.find("paneer biryani").unwrap();
        assert_eq!(biryani.ingredient_list().len(), 16);
        assert!(biryani.image.is_none());
        assert!(biryani.nutrition_html.contains("420 calories"));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let corpus = RecipeCorpus::load("/definitely/not/here/recipe.json");
        assert_eq!(corpus.len(), 6);
    }

    #[test]
    fn test_loads_file_from_disk() {
        let path = std::env::temp_dir().join(format!("flavorai-corpus-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[{"name":"Lemon Rice","collection":"collection/south-indian/","image":null,
                "descripition":"Tangy rice","ingredients":"['2 cups rice', '1 lemon']",
                "steps":"[]","Neutretion":""}]"#,
        )
        .unwrap();

        let corpus = RecipeCorpus::load(&path);
        std::fs::remove_file(&path).ok();

        assert_eq!(corpus.len(), 1);
        assert!(corpus.find("Lemon Rice").is_some());
    }

    #[test]
    fn test_search_fields() {
        let corpus = RecipeCorpus::embedded();

        let by_name: Vec<_> = corpus.search("PIZZA").iter().map(|r| r.name.as_str()).collect();
        assert_eq!(by_name, vec!["Margherita Pizza"]);

        let by_ingredient = corpus.search("chickpeas");
        assert_eq!(by_ingredient.len(), 1);

        let by_collection = corpus.search("vegan-recipes");
        assert_eq!(by_collection.len(), 2);

        assert!(corpus.search("   ").is_empty());
        assert!(corpus.search("zzzz").is_empty());
    }
}
