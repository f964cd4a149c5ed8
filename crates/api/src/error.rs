//! Errors raised while talking to a subgraph endpoint.

use crate::types::GraphQlError;

/// Failure of a single subgraph request.
///
/// The pagination loop consumes these: transport-level failures are retried,
/// query-level failures stop the fetch. Neither escapes [`crate::SubgraphClient`].
#[derive(Debug, thiserror::Error)]
pub enum SubgraphError {
    /// Network failure, timeout, or a body that was not valid JSON.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),

    /// Endpoint answered with a non-success HTTP status.
    #[error("endpoint returned HTTP {status}")]
    Status { status: u16 },

    /// Endpoint answered but reported application-level errors.
    #[error("query returned {} error(s): {}", .0.len(), join_messages(.0))]
    Query(Vec<GraphQlError>),

    /// Entity list did not match the expected record shape.
    #[error("failed to decode `{entity}` page: {source}")]
    Decode {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl SubgraphError {
    /// Whether the request is worth sending again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. })
    }
}

impl From<reqwest::Error> for SubgraphError {
    fn from(error: reqwest::Error) -> Self {
        // The gateway URL embeds the API key
        Self::Transport(error.without_url())
    }
}

fn join_messages(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
