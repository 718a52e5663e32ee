//! REST endpoint handlers organized by resource.

pub mod department;
pub mod ingest;
pub mod job;
pub mod machine;
pub mod system;
pub mod workflow;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(department::routes())
        .merge(machine::routes())
        .merge(job::routes())
        .merge(workflow::routes())
        .merge(ingest::routes())
}
