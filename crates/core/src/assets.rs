//! Registry of wrapped-BTC collateral assets tracked on Aave.
//!
//! Each entry carries the token address used to filter liquidations, the
//! display symbol, the token decimals, and which Aave deployments list it.

use alloy::primitives::{address, Address};
use liquidations_api::ProtocolVersion;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Collateral asset configuration.
#[derive(Debug, Clone)]
pub struct Asset {
    /// Registry key (e.g., "wbtc")
    pub key: &'static str,
    /// Display symbol (e.g., "wBTC")
    pub symbol: &'static str,
    /// Human-readable token name
    pub name: &'static str,
    /// Token contract address on Ethereum mainnet
    pub address: Address,
    /// Token decimals
    pub decimals: u8,
    /// Aave deployments that list this asset
    pub subgraphs: &'static [ProtocolVersion],
    /// Whether pre-rename data files may exist for this asset
    pub legacy_files: bool,
}

impl Asset {
    /// Whether liquidations of this asset are served by `version`.
    pub fn supports(&self, version: ProtocolVersion) -> bool {
        self.subgraphs.contains(&version)
    }
}

/// wBTC - Wrapped BTC (listed on V2 and V3)
pub const WBTC: Asset = Asset {
    key: "wbtc",
    symbol: "wBTC",
    name: "Wrapped BTC",
    address: address!("2260fac5e5542a773aa44fbcfedf7c193bc2c599"),
    decimals: 8,
    subgraphs: &[ProtocolVersion::V2, ProtocolVersion::V3],
    legacy_files: true,
};

/// cbBTC - Coinbase Wrapped BTC (V3 only)
pub const CBBTC: Asset = Asset {
    key: "cbbtc",
    symbol: "cbBTC",
    name: "Coinbase Wrapped BTC",
    address: address!("cbb7c0000ab88b473b1f5afd9ef808440eed33bf"),
    decimals: 8,
    subgraphs: &[ProtocolVersion::V3],
    legacy_files: false,
};

/// All tracked assets, in display order.
pub static ASSETS: &[Asset] = &[WBTC, CBBTC];

/// Lookup failure for an asset key.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Unknown asset: {key}. Available: {available}")]
    Unknown { key: String, available: String },
}

/// Asset lookup tables.
pub struct AssetRegistry {
    by_key: HashMap<&'static str, &'static Asset>,
    by_address: HashMap<Address, &'static Asset>,
}

impl AssetRegistry {
    /// Build lookup tables from [`ASSETS`].
    pub fn new() -> Self {
        let mut by_key = HashMap::with_capacity(ASSETS.len());
        let mut by_address = HashMap::with_capacity(ASSETS.len());

        for asset in ASSETS {
            by_key.insert(asset.key, asset);
            by_address.insert(asset.address, asset);
        }

        Self { by_key, by_address }
    }

    /// Get asset by registry key, failing with the list of valid keys.
    pub fn get(&self, key: &str) -> Result<&'static Asset, AssetError> {
        self.by_key
            .get(key.to_lowercase().as_str())
            .copied()
            .ok_or_else(|| AssetError::Unknown {
                key: key.to_string(),
                available: self.keys().collect::<Vec<_>>().join(", "),
            })
    }

    /// Get asset by token address.
    pub fn get_by_address(&self, address: &Address) -> Option<&'static Asset> {
        self.by_address.get(address).copied()
    }

    /// Registry keys in display order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> {
        ASSETS.iter().map(|a| a.key)
    }

    /// Resolve a CLI-style selection: a single key or `all`.
    pub fn select(&self, selection: &str) -> Result<Vec<&'static Asset>, AssetError> {
        if selection.eq_ignore_ascii_case("all") {
            Ok(ASSETS.iter().collect())
        } else {
            Ok(vec![self.get(selection)?])
        }
    }
}

impl Default for AssetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global asset registry instance.
pub static REGISTRY: LazyLock<AssetRegistry> = LazyLock::new(AssetRegistry::new);

/// Get configuration for an asset by its key.
pub fn get_asset_config(key: &str) -> Result<&'static Asset, AssetError> {
    REGISTRY.get(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let wbtc = get_asset_config("wbtc").unwrap();
        assert_eq!(wbtc.symbol, "wBTC");
        assert_eq!(wbtc.decimals, 8);
        assert!(wbtc.supports(ProtocolVersion::V2));

        let cbbtc = get_asset_config("cbBTC").unwrap();
        assert!(!cbbtc.supports(ProtocolVersion::V2));
        assert!(cbbtc.supports(ProtocolVersion::V3));
    }

    #[test]
    fn test_unknown_asset_lists_available() {
        let err = get_asset_config("tbtc").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("tbtc"));
        assert!(msg.contains("wbtc, cbbtc"));
    }

    #[test]
    fn test_lookup_by_address() {
        let registry = AssetRegistry::new();
        let addr: Address = "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599".parse().unwrap();
        assert_eq!(registry.get_by_address(&addr).unwrap().key, "wbtc");
    }

    #[test]
    fn test_select_all() {
        let registry = AssetRegistry::new();
        assert_eq!(registry.select("all").unwrap().len(), ASSETS.len());
        assert_eq!(registry.select("cbbtc").unwrap()[0].symbol, "cbBTC");
        assert!(registry.select("nope").is_err());
    }
}
