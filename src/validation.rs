use thiserror::Error;

use crate::cache::keys::{AssetCacheKey, KEY_SEPARATOR};

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid {0}: {1}")]
    InvalidParameter(String, String),
}

/// Addresses and chain names become the leading components of a cache key,
/// so they must not contain the key separator or whitespace.
fn validate_key_component(name: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingParameter(name.to_string()));
    }

    if value.contains(KEY_SEPARATOR) || value.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidParameter(
            name.to_string(),
            value.to_string(),
        ));
    }

    Ok(())
}

pub fn validate_address(address: &str) -> Result<(), ValidationError> {
    validate_key_component("address", address)
}

pub fn validate_chain_type(chain_type: &str) -> Result<(), ValidationError> {
    validate_key_component("chain", chain_type)
}

pub fn validate_supported_assets_key(supported_assets_key: &str) -> Result<(), ValidationError> {
    if supported_assets_key.trim().is_empty() {
        return Err(ValidationError::MissingParameter("assets".to_string()));
    }

    Ok(())
}

/// Validate all three components and build the key
pub fn validate_cache_key(
    address: &str,
    chain_type: &str,
    supported_assets_key: &str,
) -> Result<AssetCacheKey, ValidationError> {
    validate_address(address)?;
    validate_chain_type(chain_type)?;
    validate_supported_assets_key(supported_assets_key)?;

    Ok(AssetCacheKey::new(address, chain_type, supported_assets_key))
}
