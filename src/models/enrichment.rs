use serde::{Deserialize, Serialize};

pub const PREP_TIME_RANGE: (u32, u32) = (15, 120);
pub const CALORIES_RANGE: (u32, u32) = (150, 800);
pub const PROTEIN_RANGE: (u32, u32) = (5, 50);
pub const CARBS_RANGE: (u32, u32) = (10, 100);
pub const FAT_RANGE: (u32, u32) = (2, 40);

pub fn clamp_to((min, max): (u32, u32), value: u32) -> u32 {
    value.clamp(min, max)
}

/// Which backend produced the authoritative fields of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceProvider {
    Gemini,
    HuggingFace,
    LocalEstimate,
}

impl std::fmt::Display for SourceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SourceProvider::Gemini => "gemini",
            SourceProvider::HuggingFace => "hugging-face",
            SourceProvider::LocalEstimate => "local-estimate",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nutrition {
    pub calories: u32,
    pub protein_grams: u32,
    pub carbs_grams: u32,
    pub fat_grams: u32,
}

impl Nutrition {
    pub fn clamped(self) -> Self {
        Self {
            calories: clamp_to(CALORIES_RANGE, self.calories),
            protein_grams: clamp_to(PROTEIN_RANGE, self.protein_grams),
            carbs_grams: clamp_to(CARBS_RANGE, self.carbs_grams),
            fat_grams: clamp_to(FAT_RANGE, self.fat_grams),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    pub original: String,
    pub substitute: String,
    pub ratio: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CulturalInfo {
    pub origin: Option<String>,
    pub history: Option<String>,
    pub significance: Option<String>,
    pub season: Option<String>,
    pub serving: Option<String>,
    pub tips: Option<String>,
}

impl CulturalInfo {
    pub fn is_empty(&self) -> bool {
        self.origin.is_none()
            && self.history.is_none()
            && self.significance.is_none()
            && self.season.is_none()
            && self.serving.is_none()
            && self.tips.is_none()
    }
}

/// An illustration for a recipe: an https URL or a `data:` URI carrying the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub uri: String,
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentRecord {
    pub prep_time_minutes: u32,
    pub nutrition: Nutrition,
    pub substitutions: Vec<Substitution>,
    pub cultural_info: Option<CulturalInfo>,
    pub instructions: Option<Vec<String>>,
    pub image: Option<GeneratedImage>,
    pub source_provider: SourceProvider,
}

impl EnrichmentRecord {
    pub fn is_ai_generated(&self) -> bool {
        self.source_provider != SourceProvider::LocalEstimate
    }
}

/// The record plus the status text shown next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    pub record: EnrichmentRecord,
    pub message: String,
    pub setup_required: bool,
    pub search_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSuggestion {
    pub name: String,
    pub description: Option<String>,
    pub cuisine: Option<String>,
    pub prep_time_minutes: Option<u32>,
}

/// A recipe written from scratch by a provider for a query the corpus could not answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedRecipe {
    pub name: String,
    pub description: Option<String>,
    pub ingredients: Vec<String>,
    pub enrichment: Enrichment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Idle,
    Loading,
    Succeeded,
    Failed,
}
