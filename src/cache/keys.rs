//! Cache key generation and management

use std::fmt;

/// Separator between the key components in the rendered form
pub const KEY_SEPARATOR: char = '-';

/// Identifies one cached asset listing: who, on which chain, which asset set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetCacheKey {
    pub address: String,
    pub chain_type: String,
    pub supported_assets_key: String,
}

impl AssetCacheKey {
    /// Create a new asset listing key
    pub fn new(address: &str, chain_type: &str, supported_assets_key: &str) -> Self {
        Self {
            address: address.to_string(),
            chain_type: chain_type.to_string(),
            supported_assets_key: supported_assets_key.to_string(),
        }
    }

    /// Split a rendered key back into its components.
    ///
    /// The address and chain never contain the separator, so everything after
    /// the second one belongs to the asset-set signature.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(3, KEY_SEPARATOR);
        let address = parts.next().filter(|s| !s.is_empty())?;
        let chain_type = parts.next().filter(|s| !s.is_empty())?;
        let supported_assets_key = parts.next()?;

        Some(Self::new(address, chain_type, supported_assets_key))
    }

    /// Whether a rendered key belongs to `address`
    pub fn belongs_to(raw: &str, address: &str) -> bool {
        raw.strip_prefix(address)
            .map(|rest| rest.starts_with(KEY_SEPARATOR))
            .unwrap_or(false)
    }
}

impl fmt::Display for AssetCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}",
            self.address, KEY_SEPARATOR, self.chain_type, KEY_SEPARATOR, self.supported_assets_key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_separator_joined_form() {
        let key = AssetCacheKey::new("0xabc", "ethereum", "native,erc20");
        assert_eq!(key.to_string(), "0xabc-ethereum-native,erc20");
    }

    #[test]
    fn parse_keeps_separators_in_asset_signature() {
        let key = AssetCacheKey::parse("0xabc-ethereum-native-erc20").unwrap();
        assert_eq!(key.address, "0xabc");
        assert_eq!(key.chain_type, "ethereum");
        assert_eq!(key.supported_assets_key, "native-erc20");
    }

    #[test]
    fn parse_rejects_incomplete_keys() {
        assert!(AssetCacheKey::parse("0xabc").is_none());
        assert!(AssetCacheKey::parse("0xabc-ethereum").is_none());
        assert!(AssetCacheKey::parse("-ethereum-native").is_none());
    }

    #[test]
    fn belongs_to_matches_whole_address_only() {
        assert!(AssetCacheKey::belongs_to("0xabc-ethereum-native", "0xabc"));
        assert!(!AssetCacheKey::belongs_to("0xabcd-ethereum-native", "0xabc"));
        assert!(!AssetCacheKey::belongs_to("0xab", "0xabc"));
    }
}
