use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;

use crate::models::{Enrichment, Recipe, RequestStatus};

/// The recipe the user picked and, once ready, its enrichment. Replaced wholesale, never patched.
#[derive(Debug, Clone, Serialize)]
pub struct SelectedEnrichment {
    pub recipe: Recipe,
    pub enrichment: Option<Enrichment>,
    pub selected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionSnapshot {
    pub status: RequestStatus,
    pub recipe: Option<Recipe>,
    pub enrichment: Option<Enrichment>,
    pub selected_at: Option<DateTime<Utc>>,
}

struct SlotState {
    generation: u64,
    status: RequestStatus,
    current: Option<Arc<SelectedEnrichment>>,
    in_flight: Option<AbortHandle>,
}

impl SlotState {
    /// Abort any running chain and move to a new generation.
    fn supersede(&mut self) -> u64 {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
        self.generation += 1;
        self.generation
    }
}

/// Holds at most one selection. Each `begin` or `reset` invalidates earlier work.
pub struct SelectionSlot {
    state: Mutex<SlotState>,
}

impl Default for SelectionSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionSlot {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                generation: 0,
                status: RequestStatus::Idle,
                current: None,
                in_flight: None,
            }),
        }
    }

    /// Start a selection and return its generation.
    pub async fn begin(&self, recipe: Recipe) -> u64 {
        let mut state = self.state.lock().await;
        let generation = state.supersede();
        log::info!("📌 Selected {} (generation {})", recipe.name, generation);

        state.status = RequestStatus::Loading;
        state.current = Some(Arc::new(SelectedEnrichment {
            recipe,
            enrichment: None,
            selected_at: Utc::now(),
        }));
        generation
    }

    /// Register the task computing `generation`. A task for a superseded generation is aborted.
    pub async fn attach(&self, generation: u64, handle: AbortHandle) -> bool {
        let mut state = self.state.lock().await;
        if state.generation != generation {
            handle.abort();
            return false;
        }
        state.in_flight = Some(handle);
        true
    }

    /// Store the result for `generation`. Stale completions are discarded.
    pub async fn complete(&self, generation: u64, enrichment: Enrichment) -> bool {
        let mut state = self.state.lock().await;
        if state.generation != generation {
            log::debug!(
                "Discarding stale enrichment (generation {}, current {})",
                generation,
                state.generation
            );
            return false;
        }

        let Some(current) = state.current.as_ref() else {
            return false;
        };
        let replacement = SelectedEnrichment {
            recipe: current.recipe.clone(),
            enrichment: Some(enrichment),
            selected_at: current.selected_at,
        };

        state.current = Some(Arc::new(replacement));
        state.status = RequestStatus::Succeeded;
        state.in_flight = None;
        true
    }

    pub async fn fail(&self, generation: u64) -> bool {
        let mut state = self.state.lock().await;
        if state.generation != generation {
            return false;
        }
        state.status = RequestStatus::Failed;
        state.in_flight = None;
        true
    }

    /// Back to search: drop the selection and abort its chain.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        let generation = state.supersede();
        log::info!("🔙 Selection cleared (generation {})", generation);
        state.status = RequestStatus::Idle;
        state.current = None;
    }

    pub async fn snapshot(&self) -> SelectionSnapshot {
        let state = self.state.lock().await;
        let current = state.current.clone();
        SelectionSnapshot {
            status: state.status,
            recipe: current.as_ref().map(|c| c.recipe.clone()),
            enrichment: current.as_ref().and_then(|c| c.enrichment.clone()),
            selected_at: current.map(|c| c.selected_at),
        }
    }
}
