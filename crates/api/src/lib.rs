//! Aave subgraph client for wrapped-BTC liquidation analytics.
//!
//! This crate provides:
//! - Query documents and endpoints for the Aave V2/V3 subgraphs
//! - Raw wire types with string-or-number decoding
//! - A paginated, retrying client that returns partial results instead of failing

mod error;
mod queries;
mod subgraph;
mod transport;
mod types;

pub use error::SubgraphError;
pub use queries::{
    endpoint, Entity, AAVE_V2_SUBGRAPH_ID, AAVE_V3_SUBGRAPH_ID, DEFAULT_GATEWAY_URL,
    LIQUIDATIONS_QUERY, USER_DEPOSITS_QUERY, USER_REPAYS_QUERY,
};
pub use subgraph::{FetchOutcome, FetchStatus, PaginationConfig, SubgraphClient};
pub use transport::{HttpTransport, QueryRequest, QueryTransport};
pub use types::{
    subgraph_address, AccountRef, GraphQlError, GraphQlResponse, ProtocolVersion, QueryVariables,
    RawAction, RawAsset, RawLiquidation, RawMarket,
};
