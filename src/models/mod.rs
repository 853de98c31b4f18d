pub mod enrichment;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use enrichment::{
    CulturalInfo, Enrichment, EnrichmentRecord, GeneratedImage, GeneratedRecipe, Nutrition,
    RecipeSuggestion, RequestStatus, SourceProvider, Substitution,
};

/// A recipe as stored in the corpus JSON. Field spellings follow the corpus files.
/// The corpus `steps` column is not loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    #[serde(default)]
    pub collection: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(rename = "descripition", default)]
    pub description: String,
    #[serde(default)]
    pub ingredients: String,
    #[serde(rename = "Neutretion", default)]
    pub nutrition_html: String,
}

impl Recipe {
    pub fn ingredient_list(&self) -> IngredientList {
        IngredientList::parse(&self.ingredients)
    }
}

/// What the user is after, derived from the wording of the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Direct,
    Discovery,
    Ingredients,
    Context,
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Intent::Direct => "direct",
            Intent::Discovery => "discovery",
            Intent::Ingredients => "ingredients",
            Intent::Context => "context",
        };
        write!(f, "{}", s)
    }
}

impl Intent {
    /// Whether the front-end should expect several suggestions instead of one recipe.
    pub fn expects_suggestions(&self) -> bool {
        !matches!(self, Intent::Direct)
    }
}

/// A classified user query. Built once through `RecipeQuery::classify` and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeQuery {
    text: String,
    intent: Intent,
}

impl RecipeQuery {
    pub fn classify(text: &str) -> Self {
        let text = text.trim().to_string();
        let intent = crate::services::classifier::classify(&text);
        Self { text, intent }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }
}

static QUOTED_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)""#).expect("valid quoted item regex")
});

/// Ordered ingredient strings, quantity and name combined ("2 cups basmati rice").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IngredientList(Vec<String>);

impl IngredientList {
    /// Parse the corpus form `"['2 cups rice', '1 onion']"`.
    ///
    /// Items may be single or double quoted. A list without quotes is split on commas.
    pub fn parse(source: &str) -> Self {
        let inner = source
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .trim();

        if inner.is_empty() {
            return Self::default();
        }

        let quoted: Vec<String> = QUOTED_ITEM
            .captures_iter(inner)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| m.as_str().replace("\\'", "'").replace("\\\"", "\"").trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();

        if !quoted.is_empty() {
            return Self(quoted);
        }

        Self(
            inner
                .split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// The leading `n` ingredients (fewer if the list is shorter).
    pub fn leading(&self, n: usize) -> &[String] {
        &self.0[..n.min(self.0.len())]
    }
}

impl From<Vec<String>> for IngredientList {
    fn from(items: Vec<String>) -> Self {
        Self(items)
    }
}

/// Everything the enrichment core is allowed to know about a selected recipe.
///
/// No steps here: instructions are AI-generated or null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeContext {
    pub name: String,
    pub description: String,
    pub ingredients: IngredientList,
    pub has_image: bool,
}

impl From<&Recipe> for RecipeContext {
    fn from(recipe: &Recipe) -> Self {
        Self {
            name: recipe.name.clone(),
            description: recipe.description.clone(),
            ingredients: recipe.ingredient_list(),
            has_image: recipe.image.as_deref().map_or(false, |img| !img.trim().is_empty()),
        }
    }
}
