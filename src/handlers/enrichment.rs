use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::AttemptFailure;
use crate::models::{
    Enrichment, EnrichmentRecord, GeneratedImage, GeneratedRecipe, IngredientList, Nutrition,
    RecipeContext, RecipeQuery, RecipeSuggestion, SourceProvider, Substitution,
};
use crate::services::estimator;
use crate::services::gemini::GeminiService;
use crate::services::huggingface::{HuggingFaceImageService, HuggingFaceTextService};
use crate::services::openai::OpenAiImageService;
use crate::services::parser::{self, ExpectedShape, ParsedEnrichment, ParsedResponse};
use crate::services::prompt::{self, PromptStyle};
use crate::services::provider::{GenerationOptions, ImageProvider, TextProvider};
use crate::services::retry::{retry_with_jitter, RetryPolicy};

const SEARCH_BASE_URL: &str = "https://www.google.com/search";

/// Position of a request in the provider priority list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    TryingProvider(usize),
    Success,
    AllProvidersExhausted,
}

/// An answer accepted from one provider.
struct Accepted<T> {
    value: T,
    tag: SourceProvider,
    provider: String,
}

/// Runs requests down the configured provider list and composes the results.
pub struct EnrichmentHandler {
    text_providers: Vec<Arc<dyn TextProvider>>,
    image_providers: Vec<Arc<dyn ImageProvider>>,
    retry: RetryPolicy,
    options: GenerationOptions,
}

impl EnrichmentHandler {
    pub fn new(
        text_providers: Vec<Arc<dyn TextProvider>>,
        image_providers: Vec<Arc<dyn ImageProvider>>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            text_providers,
            image_providers,
            retry,
            options: GenerationOptions::default(),
        }
    }

    /// Priority order: Gemini, each Hugging Face text model; DALL-E, each diffusion model.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut text: Vec<Arc<dyn TextProvider>> = Vec::new();
        let mut image: Vec<Arc<dyn ImageProvider>> = Vec::new();

        if let Some(key) = &config.gemini_api_key {
            text.push(Arc::new(GeminiService::new(
                key.clone(),
                config.gemini_model.clone(),
                config.gemini_base_url.clone(),
            )));
        }

        if let Some(key) = &config.openai_api_key {
            image.push(Arc::new(OpenAiImageService::new(
                key.clone(),
                config.openai_image_model.clone(),
                config.openai_base_url.clone(),
            )));
        }

        if let Some(key) = &config.hf_api_key {
            for model in &config.hf_text_models {
                text.push(Arc::new(HuggingFaceTextService::new(
                    key.clone(),
                    model.clone(),
                    config.hf_base_url.clone(),
                )));
            }
            for model in &config.hf_image_models {
                image.push(Arc::new(HuggingFaceImageService::new(
                    key.clone(),
                    model.clone(),
                    config.hf_base_url.clone(),
                )));
            }
        }

        log::info!(
            "✅ Provider chain ready: {} text, {} image",
            text.len(),
            image.len()
        );

        Self::new(text, image, config.retry)
    }

    pub fn setup_required(&self) -> bool {
        self.text_providers.is_empty()
    }

    /// Enrich a selected recipe. Always returns a complete record.
    pub async fn enrich(&self, context: &RecipeContext) -> Enrichment {
        log::info!("🍽️ Enriching recipe: {}", context.name);

        let accepted = self
            .run_chain(
                "enrichment",
                |style| prompt::enrichment_prompt(context, style),
                |text| match parser::parse(text, ExpectedShape::Enrichment) {
                    ParsedResponse::Enrichment(parsed) if parsed.has_headline() => Some(parsed),
                    _ => None,
                },
            )
            .await;

        let (record, provider) = match accepted {
            Some(accepted) => (
                compose_record(context, accepted.value, accepted.tag),
                Some(accepted.provider),
            ),
            None => (estimator::local_record(context), None),
        };

        self.finish(context, record, provider.as_deref()).await
    }

    /// Dish suggestions for discovery, ingredient and context queries.
    pub async fn suggest(&self, query: &RecipeQuery) -> Vec<RecipeSuggestion> {
        if !query.intent().expects_suggestions() {
            log::debug!("Direct query, no suggestions requested: {}", query.text());
            return Vec::new();
        }

        self.run_chain(
            "suggestions",
            |style| prompt::query_prompt(query, style),
            |text| match parser::parse(text, ExpectedShape::Suggestions) {
                ParsedResponse::Suggestions(suggestions) if !suggestions.is_empty() => {
                    Some(suggestions)
                }
                _ => None,
            },
        )
        .await
        .map(|accepted| accepted.value)
        .unwrap_or_default()
    }

    /// Write a recipe for a direct query the corpus could not answer.
    pub async fn generate_recipe(&self, query: &RecipeQuery) -> Option<GeneratedRecipe> {
        if query.intent().expects_suggestions() {
            return None;
        }

        let accepted = self
            .run_chain(
                "recipe generation",
                |style| prompt::query_prompt(query, style),
                |text| match parser::parse(text, ExpectedShape::Recipe) {
                    ParsedResponse::Recipe(recipe) if recipe.is_usable() => Some(recipe),
                    _ => None,
                },
            )
            .await?;

        let parsed = accepted.value;
        let name = parsed.name.unwrap_or_default();
        let context = RecipeContext {
            name: name.clone(),
            description: parsed.description.clone().unwrap_or_default(),
            ingredients: IngredientList::from(parsed.ingredients.clone()),
            has_image: false,
        };

        let record = compose_record(&context, parsed.enrichment, accepted.tag);
        let enrichment = self
            .finish(&context, record, Some(&accepted.provider))
            .await;

        Some(GeneratedRecipe {
            name,
            description: parsed.description,
            ingredients: parsed.ingredients,
            enrichment,
        })
    }

    async fn finish(
        &self,
        context: &RecipeContext,
        mut record: EnrichmentRecord,
        provider: Option<&str>,
    ) -> Enrichment {
        record.image = self.generate_image(context).await;
        log::info!(
            "🏁 Enrichment for {} ready (AI generated: {}, image: {})",
            context.name,
            record.is_ai_generated(),
            record.image.is_some()
        );

        let setup_required = self.setup_required();
        let message = match provider {
            Some(name) => format!(
                "🤖 AI analysis by {} ({})",
                record.source_provider, name
            ),
            None if setup_required => {
                "❌ AI unavailable - add GEMINI_API_KEY or HF_API_KEY to .env".to_string()
            }
            None => "⚠️ AI providers did not answer - showing local estimates".to_string(),
        };

        Enrichment {
            record,
            message,
            setup_required,
            search_url: search_url(&context.name),
        }
    }

    async fn run_chain<T, P, A>(&self, purpose: &str, prompt_for: P, accept: A) -> Option<Accepted<T>>
    where
        P: Fn(PromptStyle) -> String,
        A: Fn(&str) -> Option<T>,
    {
        let mut accepted = None;
        let mut state = if self.text_providers.is_empty() {
            ChainState::AllProvidersExhausted
        } else {
            ChainState::TryingProvider(0)
        };

        loop {
            state = match state {
                ChainState::TryingProvider(i) => {
                    let provider = &self.text_providers[i];
                    let prompt = prompt_for(provider.prompt_style());

                    match self.attempt(provider.as_ref(), &prompt, &accept).await {
                        Ok(value) => {
                            log::info!("✅ {} answered by {}", purpose, provider.name());
                            accepted = Some(Accepted {
                                value,
                                tag: provider.tag(),
                                provider: provider.name().to_string(),
                            });
                            ChainState::Success
                        }
                        Err(failure) => {
                            log::warn!("🔄 {} failed, moving on: {}", purpose, failure);
                            if i + 1 < self.text_providers.len() {
                                ChainState::TryingProvider(i + 1)
                            } else {
                                ChainState::AllProvidersExhausted
                            }
                        }
                    }
                }
                ChainState::Success => return accepted,
                ChainState::AllProvidersExhausted => {
                    log::warn!("⚠️ No provider produced {}", purpose);
                    return None;
                }
            };
        }
    }

    async fn attempt<T, A>(
        &self,
        provider: &dyn TextProvider,
        prompt: &str,
        accept: &A,
    ) -> Result<T, AttemptFailure>
    where
        A: Fn(&str) -> Option<T>,
    {
        let response = retry_with_jitter(provider.name(), &self.retry, || {
            provider.generate(prompt, &self.options)
        })
        .await?;

        let text = response.into_text();
        log::debug!("📄 {} replied with {} chars", provider.name(), text.len());

        accept(&text).ok_or_else(|| AttemptFailure::ParseIncomplete {
            provider: provider.name().to_string(),
        })
    }

    /// First image provider to answer wins; failures leave the record without an image.
    async fn generate_image(&self, context: &RecipeContext) -> Option<GeneratedImage> {
        if context.has_image || self.image_providers.is_empty() {
            return None;
        }

        for provider in &self.image_providers {
            let prompt = prompt::image_prompt(context, provider.image_style());
            let result = retry_with_jitter(provider.name(), &self.retry, || {
                provider.generate_image(&prompt)
            })
            .await;

            match result.map(|response| response.into_image()) {
                Ok(Some(image)) => {
                    log::info!("🎨 Image generated by {}", provider.name());
                    return Some(image);
                }
                Ok(None) => log::warn!("🔄 {} returned no image", provider.name()),
                Err(e) => log::warn!("🔄 Image generation failed: {}", e),
            }
        }

        None
    }
}

/// Merge an accepted parse over the local estimate, field by field.
fn compose_record(
    context: &RecipeContext,
    parsed: ParsedEnrichment,
    tag: SourceProvider,
) -> EnrichmentRecord {
    let seed = estimator::local_record(context);

    let nutrition = Nutrition {
        calories: parsed.calories.unwrap_or(seed.nutrition.calories),
        protein_grams: parsed.protein_grams.unwrap_or(seed.nutrition.protein_grams),
        carbs_grams: parsed.carbs_grams.unwrap_or(seed.nutrition.carbs_grams),
        fat_grams: parsed.fat_grams.unwrap_or(seed.nutrition.fat_grams),
    };

    let substitutions = parsed
        .substitutions(&context.ingredients)
        .into_iter()
        .zip(parsed.alternatives.iter())
        .map(|(slot, recovered)| backfill(slot, recovered.is_some()))
        .collect();

    EnrichmentRecord {
        prep_time_minutes: parsed.prep_time_minutes.unwrap_or(seed.prep_time_minutes),
        nutrition,
        substitutions,
        cultural_info: parsed.cultural_info,
        instructions: parsed.instructions,
        image: None,
        source_provider: tag,
    }
}

fn backfill(slot: Substitution, recovered: bool) -> Substitution {
    if recovered {
        return slot;
    }
    match estimator::lookup_substitute(&slot.original) {
        Some((substitute, ratio)) => Substitution {
            substitute: substitute.to_string(),
            ratio: ratio.to_string(),
            ..slot
        },
        None => slot,
    }
}

/// Web-search link for "<name> recipe cooking instructions".
pub fn search_url(recipe_name: &str) -> String {
    let term = format!("{} recipe cooking instructions", recipe_name);
    url::Url::parse_with_params(SEARCH_BASE_URL, &[("q", term.as_str())])
        .map(String::from)
        .unwrap_or_else(|_| SEARCH_BASE_URL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::models::{Intent, Recipe};
    use crate::services::prompt::ImageStyle;
    use crate::services::provider::{GeminiReply, ProviderResponse};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replies are served in order; an empty queue answers 404.
    struct FakeText {
        name: String,
        tag: SourceProvider,
        replies: Mutex<VecDeque<Result<String, u16>>>,
        calls: AtomicU32,
    }

    impl FakeText {
        fn new(name: &str, tag: SourceProvider, replies: Vec<Result<&str, u16>>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                tag,
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string))
                        .collect(),
                ),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl TextProvider for FakeText {
        fn tag(&self) -> SourceProvider {
            self.tag
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn prompt_style(&self) -> PromptStyle {
            PromptStyle::Detailed
        }

        async fn generate(
            &self,
            _prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<ProviderResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.replies.lock().unwrap().pop_front().unwrap_or(Err(404));
            match next {
                Ok(text) => {
                    let body = serde_json::json!({
                        "candidates": [{"content": {"parts": [{"text": text}]}}]
                    });
                    let reply: GeminiReply = serde_json::from_value(body).unwrap();
                    Ok(ProviderResponse::Gemini(reply))
                }
                Err(status) => Err(ProviderError::from_status(&self.name, status, "")),
            }
        }
    }

    struct FakeImage {
        uri: Option<&'static str>,
        calls: AtomicU32,
    }

    impl FakeImage {
        fn new(uri: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                uri,
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl ImageProvider for FakeImage {
        fn name(&self) -> &str {
            "fake-image"
        }

        fn image_style(&self) -> ImageStyle {
            ImageStyle::Photo
        }

        async fn generate_image(&self, _prompt: &str) -> Result<ProviderResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.uri {
                Some(uri) => Ok(ProviderResponse::OpenAiImage {
                    model: "fake".to_string(),
                    reply: serde_json::from_value(serde_json::json!({"data": [{"url": uri}]}))
                        .unwrap(),
                }),
                None => Err(ProviderError::from_status("fake-image", 400, "content policy")),
            }
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            call_timeout: Duration::from_secs(1),
        }
    }

    fn handler(text: Vec<Arc<FakeText>>, image: Vec<Arc<FakeImage>>) -> EnrichmentHandler {
        EnrichmentHandler::new(
            text.into_iter().map(|p| p as Arc<dyn TextProvider>).collect(),
            image.into_iter().map(|p| p as Arc<dyn ImageProvider>).collect(),
            fast_retry(),
        )
    }

    fn tofu_stir_fry() -> RecipeContext {
        RecipeContext {
            name: "Tofu Stir Fry".to_string(),
            description: "Quick weeknight stir fry".to_string(),
            ingredients: IngredientList::from(vec![
                "tofu".to_string(),
                "1 medium onion".to_string(),
                "quail eggs".to_string(),
            ]),
            has_image: true,
        }
    }

    fn paneer_biryani() -> RecipeContext {
        let recipe: Recipe = serde_json::from_value(serde_json::json!({
            "name": "Paneer Biryani",
            "collection": "collection/indian-recipes/",
            "image": null,
            "descripition": "A fragrant rice dish.",
            "ingredients": "['2 cups basmati rice', '250g paneer cubes', '1 large onion sliced', \
                '1/2 cup yogurt', '2 tbsp ginger-garlic paste', '1 tsp red chili powder', \
                '1/2 tsp turmeric', '1 tsp garam masala', '4-5 green cardamom', '2 bay leaves', \
                '1 cinnamon stick', 'Saffron soaked in milk', 'Fresh mint leaves', \
                'Fried onions', 'Ghee', 'Salt to taste']",
            "steps": "['Soak rice', 'Layer and cook']",
            "Neutretion": ""
        }))
        .unwrap();
        RecipeContext::from(&recipe)
    }

    #[tokio::test]
    async fn test_second_provider_answers_after_first_fails() {
        let gemini = FakeText::new("gemini", SourceProvider::Gemini, vec![Err(401)]);
        let hf = FakeText::new(
            "hugging-face/google/flan-t5-base",
            SourceProvider::HuggingFace,
            vec![Ok("PREP_TIME: 40\nCALORIES: 350\nALT1: Tempeh\n")],
        );

        let enrichment = handler(vec![gemini.clone(), hf.clone()], vec![])
            .enrich(&tofu_stir_fry())
            .await;
        let record = &enrichment.record;

        assert_eq!(record.source_provider, SourceProvider::HuggingFace);
        assert_eq!(record.prep_time_minutes, 40);
        assert_eq!(record.nutrition.calories, 350);
        assert_eq!(
            record.substitutions[0],
            Substitution {
                original: "tofu".to_string(),
                substitute: "tempeh".to_string(),
                ratio: "1:1".to_string(),
            }
        );
        // unrecovered slots come from the lookup table, then the generic fallback
        assert_eq!(record.substitutions[1].substitute, "shallots or leeks");
        assert_eq!(record.substitutions[2].substitute, "similar ingredient");
        assert!(record.cultural_info.is_none());
        assert!(record.instructions.is_none());
        assert!(!enrichment.setup_required);
        assert!(enrichment.message.contains("hugging-face/google/flan-t5-base"));

        // 401 is not retried
        assert_eq!(gemini.calls(), 1);
        assert_eq!(hf.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_providers_uses_local_estimate() {
        let enrichment = handler(vec![], vec![]).enrich(&paneer_biryani()).await;
        let record = &enrichment.record;

        assert!(enrichment.setup_required);
        assert_eq!(record.source_provider, SourceProvider::LocalEstimate);
        assert_eq!(record.prep_time_minutes, 75);
        assert_eq!(record.nutrition.calories, 460);
        assert_eq!(record.substitutions.len(), 3);
        assert!(record.cultural_info.is_none());
        assert!(record.instructions.is_none());
        assert!(record.image.is_none());
        assert!((150..=800).contains(&record.nutrition.calories));
        assert!((5..=50).contains(&record.nutrition.protein_grams));
        assert!((10..=100).contains(&record.nutrition.carbs_grams));
        assert!((2..=40).contains(&record.nutrition.fat_grams));
        assert!(enrichment.search_url.starts_with("https://www.google.com/search?q=Paneer+Biryani"));
    }

    #[tokio::test]
    async fn test_declined_answer_moves_on_without_retry() {
        let chatty = FakeText::new(
            "chatty",
            SourceProvider::HuggingFace,
            vec![Ok("I am sorry, I cannot help with that.")],
        );

        let enrichment = handler(vec![chatty.clone()], vec![])
            .enrich(&tofu_stir_fry())
            .await;

        assert_eq!(chatty.calls(), 1);
        assert_eq!(enrichment.record.source_provider, SourceProvider::LocalEstimate);
        assert!(!enrichment.setup_required);
    }

    #[tokio::test]
    async fn test_rate_limited_provider_is_retried() {
        let gemini = FakeText::new(
            "gemini",
            SourceProvider::Gemini,
            vec![
                Err(429),
                Ok("PREP_TIME: 9999\nPROTEIN: 22\nORIGIN: Sichuan, China\nSTEP: Press the tofu dry.\nSTEP: Fry until golden."),
            ],
        );

        let record = handler(vec![gemini.clone()], vec![])
            .enrich(&tofu_stir_fry())
            .await
            .record;

        assert_eq!(gemini.calls(), 2);
        assert_eq!(record.source_provider, SourceProvider::Gemini);
        assert_eq!(record.prep_time_minutes, 120);
        assert_eq!(record.nutrition.protein_grams, 22);
        assert_eq!(
            record.cultural_info.unwrap().origin.as_deref(),
            Some("Sichuan, China")
        );
        assert_eq!(record.instructions.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_image_cascade() {
        let failing = FakeImage::new(None);
        let working = FakeImage::new(Some("https://img.example/biryani.png"));

        let enrichment = handler(vec![], vec![failing.clone(), working.clone()])
            .enrich(&paneer_biryani())
            .await;

        let image = enrichment.record.image.unwrap();
        assert_eq!(image.uri, "https://img.example/biryani.png");
        assert_eq!(enrichment.record.source_provider, SourceProvider::LocalEstimate);
        assert_eq!(failing.calls(), 1);
        assert_eq!(working.calls(), 1);
    }

    #[tokio::test]
    async fn test_recipes_with_images_skip_generation() {
        let working = FakeImage::new(Some("https://img.example/x.png"));

        let enrichment = handler(vec![], vec![working.clone()])
            .enrich(&tofu_stir_fry())
            .await;

        assert!(enrichment.record.image.is_none());
        assert_eq!(working.calls(), 0);
    }

    #[tokio::test]
    async fn test_suggestions() {
        let gemini = FakeText::new(
            "gemini",
            SourceProvider::Gemini,
            vec![Ok("NAME: Miso Soup\nCUISINE: Japanese\nTIME: 15\n\nNAME: Congee\nTIME: 60")],
        );
        let handler = handler(vec![gemini], vec![]);

        let query = RecipeQuery::classify("what goes with grilled salmon");
        assert_eq!(query.intent(), Intent::Discovery);
        let suggestions = handler.suggest(&query).await;
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].cuisine.as_deref(), Some("Japanese"));

        let direct = RecipeQuery::classify("lemon rice recipe");
        assert!(handler.suggest(&direct).await.is_empty());
    }

    #[tokio::test]
    async fn test_suggestions_without_providers_are_empty() {
        let query = RecipeQuery::classify("vegan dinner");
        assert!(handler(vec![], vec![]).suggest(&query).await.is_empty());
    }

    #[tokio::test]
    async fn test_generate_recipe() {
        let gemini = FakeText::new(
            "gemini",
            SourceProvider::Gemini,
            vec![Ok(
                "NAME: Lemon Rice\nDESCRIPTION: Tangy South Indian rice.\n\
                 INGREDIENT: 2 cups cooked rice\nINGREDIENT: 1 lemon\nINGREDIENT: 1 tbsp oil\n\
                 PREP_TIME: 20\nSTEP: Heat the oil and add mustard seeds.",
            )],
        );

        let generated = handler(vec![gemini], vec![])
            .generate_recipe(&RecipeQuery::classify("I want to eat lemon rice"))
            .await
            .unwrap();

        assert_eq!(generated.name, "Lemon Rice");
        assert_eq!(generated.ingredients.len(), 3);
        assert_eq!(generated.enrichment.record.prep_time_minutes, 20);
        assert_eq!(generated.enrichment.record.source_provider, SourceProvider::Gemini);
        assert_eq!(generated.enrichment.record.substitutions[2].substitute, "butter or avocado oil");
    }

    #[tokio::test]
    async fn test_unusable_recipe_yields_none() {
        let gemini = FakeText::new("gemini", SourceProvider::Gemini, vec![Ok("NAME: Mystery")]);
        let generated = handler(vec![gemini], vec![])
            .generate_recipe(&RecipeQuery::classify("mystery dish"))
            .await;
        assert!(generated.is_none());
    }

    #[test]
    fn test_search_url_is_encoded() {
        assert_eq!(
            search_url("Chickpea & Potato Curry"),
            "https://www.google.com/search?q=Chickpea+%26+Potato+Curry+recipe+cooking+instructions"
        );
    }
}
