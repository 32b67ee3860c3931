//! Dead-man's-switch saved filters.
//!
//! - `mod.rs`: `FilterReport` built from a saved filter
//! - `handlers.rs`: Admin-only REST handlers

mod handlers;

use addons_db::SavedFilter;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

pub use handlers::{SetFlagBody, list_handler, set_flag_handler};

/// A flagged filter with the outcome of evaluating its domain.
#[derive(Debug, Serialize)]
pub struct FilterReport {
    pub id: Uuid,
    pub name: String,
    pub model_name: String,
    pub domain: String,
    pub is_dead_mans_switch_filter: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluated_domain: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<SavedFilter> for FilterReport {
    fn from(filter: SavedFilter) -> Self {
        let (evaluated_domain, error) = match filter.evaluate_domain() {
            Ok(domain) => (Some(domain.to_json()), None),
            Err(e) => {
                warn!(filter_id = %filter.id, error = %e, "Saved filter domain rejected");
                (None, Some(e.to_string()))
            }
        };

        Self {
            id: filter.id,
            name: filter.name,
            model_name: filter.model_name,
            domain: filter.domain,
            is_dead_mans_switch_filter: filter.is_dead_mans_switch_filter,
            evaluated_domain,
            error,
        }
    }
}
