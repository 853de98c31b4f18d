pub mod enrichment;
pub mod selection;

pub use enrichment::EnrichmentHandler;
pub use selection::{SelectionSlot, SelectionSnapshot};
