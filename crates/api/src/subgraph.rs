//! Paginated subgraph client.

use alloy::primitives::Address;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::error::SubgraphError;
use crate::queries::{endpoint, Entity, DEFAULT_GATEWAY_URL};
use crate::transport::{HttpTransport, QueryRequest, QueryTransport};
use crate::types::{GraphQlResponse, ProtocolVersion, QueryVariables, RawAction, RawLiquidation};

/// Paging and rate-limit settings.
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// Records requested per page
    pub page_size: u32,
    /// Attempts per page before giving up on the fetch
    pub max_retries: u32,
    /// Sleep between pages; also the linear backoff step
    pub rate_limit_delay: Duration,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 1000,
            max_retries: 3,
            rate_limit_delay: Duration::from_millis(500),
        }
    }
}

/// How a paginated fetch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// Upstream signalled end of data
    Complete,
    /// A page kept failing at the transport level
    RetriesExhausted,
    /// Upstream rejected the query or returned an undecodable page
    QueryFailed,
}

/// Records accumulated by a fetch, plus how it ended.
///
/// Anything other than [`FetchStatus::Complete`] means `records` may be short.
#[derive(Debug, Clone)]
pub struct FetchOutcome<T> {
    pub records: Vec<T>,
    pub pages: u32,
    pub status: FetchStatus,
}

impl<T> FetchOutcome<T> {
    pub fn is_complete(&self) -> bool {
        self.status == FetchStatus::Complete
    }

    pub fn map<U>(self, f: impl FnOnce(Vec<T>) -> Vec<U>) -> FetchOutcome<U> {
        FetchOutcome {
            records: f(self.records),
            pages: self.pages,
            status: self.status,
        }
    }
}

/// The Graph gateway client for Aave subgraphs.
pub struct SubgraphClient<T = HttpTransport> {
    transport: T,
    gateway_url: String,
    api_key: String,
    pagination: PaginationConfig,
}

impl<T> std::fmt::Debug for SubgraphClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubgraphClient")
            .field("gateway_url", &self.gateway_url)
            .field("pagination", &self.pagination)
            .finish_non_exhaustive()
    }
}

impl SubgraphClient<HttpTransport> {
    /// Create a client against the public gateway.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, SubgraphError> {
        Ok(Self::with_transport(HttpTransport::new(timeout)?, api_key))
    }
}

impl<T: QueryTransport> SubgraphClient<T> {
    /// Create a client over an arbitrary transport.
    pub fn with_transport(transport: T, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            api_key: api_key.into(),
            pagination: PaginationConfig::default(),
        }
    }

    /// Override the gateway base URL.
    pub fn with_gateway_url(mut self, gateway_url: impl Into<String>) -> Self {
        self.gateway_url = gateway_url.into();
        self
    }

    /// Override paging settings.
    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn pagination(&self) -> &PaginationConfig {
        &self.pagination
    }

    /// Query endpoint serving `version`.
    pub fn endpoint_for(&self, version: ProtocolVersion) -> String {
        endpoint(&self.gateway_url, &self.api_key, version.subgraph_id())
    }

    /// All liquidations of `asset` since `timestamp_from` on one subgraph.
    #[instrument(skip(self), fields(asset = %asset))]
    pub async fn fetch_liquidations(
        &self,
        version: ProtocolVersion,
        asset: Address,
        timestamp_from: i64,
    ) -> FetchOutcome<RawLiquidation> {
        info!(%version, timestamp_from, "Fetching liquidations");

        let outcome = self
            .fetch_all(
                &self.endpoint_for(version),
                Entity::Liquidates,
                QueryVariables::for_asset(&asset, timestamp_from),
            )
            .await;

        info!(
            %version,
            fetched = outcome.records.len(),
            pages = outcome.pages,
            status = ?outcome.status,
            "Liquidation fetch finished"
        );
        outcome
    }

    /// All deposits or repays of `account` inside `[timestamp_from, timestamp_to]`.
    #[instrument(skip(self), fields(account = %account))]
    pub async fn fetch_account_actions(
        &self,
        version: ProtocolVersion,
        entity: Entity,
        account: Address,
        timestamp_from: i64,
        timestamp_to: i64,
    ) -> FetchOutcome<RawAction> {
        self.fetch_all(
            &self.endpoint_for(version),
            entity,
            QueryVariables::for_account(&account, timestamp_from, timestamp_to),
        )
        .await
    }

    /// Page through `entity` on `endpoint` until upstream runs dry.
    ///
    /// `base.first` and `base.skip` are overwritten per page. Never fails:
    /// transport and query problems end the loop and are reported in
    /// [`FetchOutcome::status`].
    pub async fn fetch_all<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        entity: Entity,
        base: QueryVariables,
    ) -> FetchOutcome<R> {
        let page_size = self.pagination.page_size.max(1);
        let mut records: Vec<R> = Vec::new();
        let mut pages = 0;
        let mut skip = 0;

        let status = loop {
            let variables = QueryVariables {
                first: page_size,
                skip,
                ..base.clone()
            };

            let response = match self.request_with_retry(endpoint, entity, &variables).await {
                Ok(response) => response,
                Err(status) => break status,
            };

            let page: Vec<R> = match decode_page(entity, response) {
                Ok(page) => page,
                Err(e) => {
                    error!(entity = entity.key(), skip, error = %e, "Dropping undecodable page");
                    break FetchStatus::QueryFailed;
                }
            };
            pages += 1;

            if page.is_empty() {
                break FetchStatus::Complete;
            }

            let page_len = page.len();
            records.extend(page);

            debug!(
                entity = entity.key(),
                page = pages,
                fetched = page_len,
                total_so_far = records.len(),
                "Fetched page"
            );

            if page_len < page_size as usize {
                break FetchStatus::Complete;
            }

            skip += page_size;
            tokio::time::sleep(self.pagination.rate_limit_delay).await;
        };

        FetchOutcome {
            records,
            pages,
            status,
        }
    }

    /// Send one page request, retrying transport failures with linear backoff.
    async fn request_with_retry(
        &self,
        endpoint: &str,
        entity: Entity,
        variables: &QueryVariables,
    ) -> Result<GraphQlResponse, FetchStatus> {
        let request = QueryRequest {
            query: entity.query(),
            variables,
        };
        let attempts = self.pagination.max_retries.max(1);

        for attempt in 1..=attempts {
            match self.transport.execute(endpoint, &request).await {
                Ok(response) => {
                    if let Some(errors) = response.errors.as_ref().filter(|e| !e.is_empty()) {
                        let err = SubgraphError::Query(errors.clone());
                        error!(
                            entity = entity.key(),
                            skip = variables.skip,
                            errors = ?errors,
                            "{}",
                            err
                        );
                        return Err(FetchStatus::QueryFailed);
                    }
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!(
                        entity = entity.key(),
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "Subgraph request failed, backing off"
                    );
                    tokio::time::sleep(self.pagination.rate_limit_delay * attempt).await;
                }
                Err(e) => {
                    error!(
                        entity = entity.key(),
                        attempt,
                        skip = variables.skip,
                        error = %e,
                        "All retries exhausted, returning partial result"
                    );
                    return Err(FetchStatus::RetriesExhausted);
                }
            }
        }

        Err(FetchStatus::RetriesExhausted)
    }
}

/// Pull the entity list out of `data`; a missing key is an empty page.
fn decode_page<R: DeserializeOwned>(
    entity: Entity,
    response: GraphQlResponse,
) -> Result<Vec<R>, SubgraphError> {
    let Some(value) = response.data.and_then(|mut data| data.remove(entity.key())) else {
        return Ok(Vec::new());
    };

    serde_json::from_value(value).map_err(|source| SubgraphError::Decode {
        entity: entity.key(),
        source,
    })
}
