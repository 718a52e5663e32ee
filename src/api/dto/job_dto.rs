//! Job listing query parameters.

use serde::Deserialize;

/// Query string of `GET /jobs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobListQuery {
    /// Optional status filter, matched case-insensitively.
    #[serde(default)]
    pub status: Option<String>,
}
