use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderValue, StatusCode},
    routing::get,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::{EnrichmentHandler, SelectionSlot, SelectionSnapshot};
use crate::models::{Enrichment, GeneratedRecipe, Recipe, RecipeContext, RecipeQuery, RecipeSuggestion};
use crate::services::RecipeCorpus;

pub struct AppState {
    pub corpus: RecipeCorpus,
    pub enrichment: Arc<EnrichmentHandler>,
    pub selection: SelectionSlot,
}

impl AppState {
    pub fn new(corpus: RecipeCorpus, enrichment: Arc<EnrichmentHandler>) -> Self {
        Self {
            corpus,
            enrichment,
            selection: SelectionSlot::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub query: RecipeQuery,
    pub recipes: Vec<Recipe>,
    pub suggestions: Vec<RecipeSuggestion>,
    pub generated: Option<GeneratedRecipe>,
}

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub name: String,
}

pub fn create_router(state: Arc<AppState>, cors_origin: Option<&str>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/api/recipes", get(search_recipes))
        .route("/api/query", post(run_query))
        .route(
            "/api/selection",
            get(get_selection).post(select_recipe).delete(clear_selection),
        )
        .with_state(state)
        .layer(cors_layer(cors_origin))
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin.map(HeaderValue::from_str) {
        Some(Ok(value)) => layer.allow_origin(value),
        Some(Err(e)) => {
            log::warn!("⚠️ Invalid CORS_ALLOW_ORIGIN ({}), allowing any origin", e);
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}

async fn root_handler() -> &'static str {
    "FlavorAI Enrichment Server - Use /api/recipes, /api/query and /api/selection"
}

async fn health_check() -> &'static str {
    "OK"
}

async fn search_recipes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<Recipe>> {
    let results: Vec<Recipe> = state.corpus.search(&params.q).into_iter().cloned().collect();
    log::debug!("🔎 Search '{}' matched {} recipes", params.q, results.len());
    Json(results)
}

async fn run_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, StatusCode> {
    if request.query.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let query = RecipeQuery::classify(&request.query);
    log::info!("💬 Query '{}' classified as {}", query.text(), query.intent());

    let recipes: Vec<Recipe> = state.corpus.search(query.text()).into_iter().cloned().collect();

    let (suggestions, generated) = if query.intent().expects_suggestions() {
        (state.enrichment.suggest(&query).await, None)
    } else if recipes.is_empty() {
        (Vec::new(), state.enrichment.generate_recipe(&query).await)
    } else {
        (Vec::new(), None)
    };

    Ok(Json(QueryResponse {
        query,
        recipes,
        suggestions,
        generated,
    }))
}

async fn select_recipe(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectionRequest>,
) -> Result<Json<Enrichment>, StatusCode> {
    let recipe = state
        .corpus
        .find(&request.name)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)?;

    let context = RecipeContext::from(&recipe);
    let generation = state.selection.begin(recipe).await;

    let handler = state.enrichment.clone();
    let task = tokio::spawn(async move { handler.enrich(&context).await });
    state.selection.attach(generation, task.abort_handle()).await;

    match task.await {
        Ok(enrichment) => {
            if state.selection.complete(generation, enrichment.clone()).await {
                Ok(Json(enrichment))
            } else {
                Err(StatusCode::CONFLICT)
            }
        }
        Err(e) if e.is_cancelled() => {
            log::info!("🔄 Enrichment for generation {} was superseded", generation);
            Err(StatusCode::CONFLICT)
        }
        Err(e) => {
            log::error!("❌ Enrichment task failed: {}", e);
            state.selection.fail(generation).await;
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn get_selection(State(state): State<Arc<AppState>>) -> Json<SelectionSnapshot> {
    Json(state.selection.snapshot().await)
}

async fn clear_selection(State(state): State<Arc<AppState>>) -> StatusCode {
    state.selection.reset().await;
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::retry::RetryPolicy;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use tower::ServiceExt;

    fn app() -> Router {
        let handler = Arc::new(EnrichmentHandler::new(vec![], vec![], RetryPolicy::default()));
        let state = Arc::new(AppState::new(RecipeCorpus::embedded(), handler));
        create_router(state, None)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        let request = builder
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    fn json(bytes: &[u8]) -> serde_json::Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (status, body) = send(&app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");
    }

    #[tokio::test]
    async fn test_search() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/api/recipes?q=tofu", None).await;
        assert_eq!(status, StatusCode::OK);
        let results = json(&body);
        assert_eq!(results.as_array().unwrap().len(), 1);
        assert_eq!(results[0]["name"], "Crispy Tofu with Black Pepper Sauce");
        assert!(results[0].get("descripition").is_some());
        assert!(results[0].get("steps").is_none());

        let (_, body) = send(&app, Method::GET, "/api/recipes", None).await;
        assert!(json(&body).as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_direct_hits_corpus() {
        let (status, body) = send(
            &app(),
            Method::POST,
            "/api/query",
            Some(r#"{"query":"Paneer Biryani"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let response = json(&body);
        assert_eq!(response["query"]["intent"], "direct");
        assert_eq!(response["recipes"].as_array().unwrap().len(), 1);
        assert!(response["generated"].is_null());
    }

    #[tokio::test]
    async fn test_query_without_providers_degrades() {
        let app = app();

        let (_, body) = send(&app, Method::POST, "/api/query", Some(r#"{"query":"vegan dinner"}"#)).await;
        let response = json(&body);
        assert_eq!(response["query"]["intent"], "context");
        assert!(response["suggestions"].as_array().unwrap().is_empty());

        let (_, body) = send(
            &app,
            Method::POST,
            "/api/query",
            Some(r#"{"query":"I want to eat shakshuka"}"#),
        )
        .await;
        let response = json(&body);
        assert!(response["recipes"].as_array().unwrap().is_empty());
        assert!(response["generated"].is_null());
    }

    #[tokio::test]
    async fn test_query_rejects_bad_bodies() {
        let app = app();
        let (status, _) = send(&app, Method::POST, "/api/query", Some(r#"{"query":"   "}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::POST, "/api/query", Some(r#"{"text":"pizza"}"#)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_selection_flow() {
        let app = app();

        let (status, _) = send(&app, Method::POST, "/api/selection", Some(r#"{"name":"Unknown Dish"}"#)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/selection",
            Some(r#"{"name":"paneer biryani"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let enrichment = json(&body);
        assert_eq!(enrichment["record"]["sourceProvider"], "local-estimate");
        assert_eq!(enrichment["record"]["prepTimeMinutes"], 75);
        assert_eq!(enrichment["setupRequired"], true);
        assert!(enrichment["record"]["instructions"].is_null());

        let (_, body) = send(&app, Method::GET, "/api/selection", None).await;
        let snapshot = json(&body);
        assert_eq!(snapshot["status"], "succeeded");
        assert_eq!(snapshot["recipe"]["name"], "Paneer Biryani");
        assert!(snapshot["recipe"].get("steps").is_none());

        let (status, _) = send(&app, Method::DELETE, "/api/selection", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(&app, Method::GET, "/api/selection", None).await;
        let snapshot = json(&body);
        assert_eq!(snapshot["status"], "idle");
        assert!(snapshot["recipe"].is_null());
    }
}
