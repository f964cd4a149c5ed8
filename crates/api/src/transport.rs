//! Request transport for subgraph queries.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::error::SubgraphError;
use crate::types::{GraphQlResponse, QueryVariables};

/// Body of a GraphQL POST.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest<'a> {
    pub query: &'a str,
    pub variables: &'a QueryVariables,
}

/// Sends one query document to an endpoint and returns the decoded envelope.
///
/// Implementations report transport problems only. Application-level
/// `errors` are left in the envelope for the caller to inspect.
#[async_trait]
pub trait QueryTransport: Send + Sync {
    async fn execute(
        &self,
        endpoint: &str,
        request: &QueryRequest<'_>,
    ) -> Result<GraphQlResponse, SubgraphError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, SubgraphError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10).min(timeout))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl QueryTransport for HttpTransport {
    async fn execute(
        &self,
        endpoint: &str,
        request: &QueryRequest<'_>,
    ) -> Result<GraphQlResponse, SubgraphError> {
        let response = self.client.post(endpoint).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubgraphError::Status {
                status: status.as_u16(),
            });
        }

        Ok(response.json::<GraphQlResponse>().await?)
    }
}
