//! GraphQL documents and endpoints for The Graph gateway.

/// Aave V2 (Messari schema) subgraph on Ethereum mainnet.
pub const AAVE_V2_SUBGRAPH_ID: &str = "C2zniPn45RnLDGzVeGZCx2Sw3GXrbc9gL4ZfL8B8Em2j";

/// Aave V3 (Messari schema) subgraph on Ethereum mainnet.
pub const AAVE_V3_SUBGRAPH_ID: &str = "JCNWRypm7FYwV8fx5HhzZPSFaMxgkPuw4TnR3Gpi81zk";

/// Default gateway base URL.
pub const DEFAULT_GATEWAY_URL: &str = "https://gateway.thegraph.com/api";

/// Build the query endpoint for a subgraph deployment.
pub fn endpoint(gateway_url: &str, api_key: &str, subgraph_id: &str) -> String {
    format!(
        "{}/{}/subgraphs/id/{}",
        gateway_url.trim_end_matches('/'),
        api_key,
        subgraph_id
    )
}

/// Entity collections the client knows how to page through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Liquidates,
    Deposits,
    Repays,
}

impl Entity {
    /// Key of the entity list under `data`.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Liquidates => "liquidates",
            Self::Deposits => "deposits",
            Self::Repays => "repays",
        }
    }

    /// Query document for this entity.
    pub fn query(&self) -> &'static str {
        match self {
            Self::Liquidates => LIQUIDATIONS_QUERY,
            Self::Deposits => USER_DEPOSITS_QUERY,
            Self::Repays => USER_REPAYS_QUERY,
        }
    }
}

pub const LIQUIDATIONS_QUERY: &str = r#"
query GetLiquidations($first: Int!, $skip: Int!, $timestampFrom: Int!, $asset: String!) {
  liquidates(
    first: $first
    skip: $skip
    where: { timestamp_gte: $timestampFrom, asset: $asset }
    orderBy: timestamp
    orderDirection: desc
  ) {
    id
    hash
    blockNumber
    timestamp
    liquidator { id }
    liquidatee { id }
    market { id name }
    asset { id symbol name decimals }
    amount
    amountUSD
  }
}
"#;

pub const USER_DEPOSITS_QUERY: &str = r#"
query GetDeposits($first: Int!, $skip: Int!, $account: String!, $timestampFrom: Int!, $timestampTo: Int!) {
  deposits(
    first: $first
    skip: $skip
    where: { account: $account, timestamp_gte: $timestampFrom, timestamp_lte: $timestampTo }
    orderBy: timestamp
    orderDirection: desc
  ) {
    id
    hash
    timestamp
    account { id }
    market { id name }
    asset { id symbol decimals }
    amount
    amountUSD
  }
}
"#;

pub const USER_REPAYS_QUERY: &str = r#"
query GetRepays($first: Int!, $skip: Int!, $account: String!, $timestampFrom: Int!, $timestampTo: Int!) {
  repays(
    first: $first
    skip: $skip
    where: { account: $account, timestamp_gte: $timestampFrom, timestamp_lte: $timestampTo }
    orderBy: timestamp
    orderDirection: desc
  ) {
    id
    hash
    timestamp
    account { id }
    market { id name }
    asset { id symbol decimals }
    amount
    amountUSD
  }
}
"#;
