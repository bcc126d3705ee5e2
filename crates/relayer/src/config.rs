//! Relayer configuration, read from the environment.

use alloy_primitives::{address, Address};
use amm::DexConfig;
use eyre::WrapErr;
use std::str::FromStr;

/// Owner of the order manager on a fresh devnet.
pub const DEFAULT_OWNER: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");

#[derive(Debug, Clone)]
pub struct RelayerConfig {
    /// Chain id bound into order signatures (`CHAIN_ID`).
    pub chain_id: u64,
    /// Maximum orders per batch (`CHUNK_SIZE`).
    pub chunk_size: usize,
    /// Protocol fee recipient; zero leaves the fee off (`FEE_TO`).
    pub fee_to: Address,
    /// Identities allowed to submit batches (`EXECUTORS`, comma separated).
    pub executors: Vec<Address>,
    /// Owner of the order manager and fee setter of the factory (`OWNER`).
    pub owner: Address,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        let dex = DexConfig::default();
        Self {
            chain_id: dex.chain_id,
            chunk_size: dex.chunk_size,
            fee_to: Address::ZERO,
            executors: vec![DEFAULT_OWNER],
            owner: DEFAULT_OWNER,
        }
    }
}

impl RelayerConfig {
    /// Load the configuration from process environment variables.
    pub fn from_env() -> eyre::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load the configuration from `lookup`, falling back to defaults for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> eyre::Result<Self> {
        let mut config = Self::default();
        if let Some(chain_id) = parse(&lookup, "CHAIN_ID")? {
            config.chain_id = chain_id;
        }
        if let Some(chunk_size) = parse(&lookup, "CHUNK_SIZE")? {
            config.chunk_size = chunk_size;
        }
        if let Some(fee_to) = parse(&lookup, "FEE_TO")? {
            config.fee_to = fee_to;
        }
        if let Some(owner) = parse(&lookup, "OWNER")? {
            config.owner = owner;
            config.executors = vec![owner];
        }
        if let Some(executors) = lookup("EXECUTORS") {
            config.executors = executors
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<Address>().wrap_err_with(|| format!("invalid executor {s}")))
                .collect::<eyre::Result<_>>()?;
        }
        if config.chunk_size == 0 {
            eyre::bail!("CHUNK_SIZE must be positive");
        }
        Ok(config)
    }

    /// Engine configuration derived from this relayer configuration.
    pub fn dex_config(&self) -> DexConfig {
        DexConfig::default()
            .with_chain_id(self.chain_id)
            .with_chunk_size(self.chunk_size)
            .with_fee_to_setter(self.owner)
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> eyre::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(name)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .wrap_err_with(|| format!("invalid {name}: {value}"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RelayerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.chain_id, 1);
        assert_eq!(config.chunk_size, 50);
        assert_eq!(config.executors, vec![DEFAULT_OWNER]);
        assert_eq!(config.dex_config().fee_to_setter, DEFAULT_OWNER);
    }

    #[test]
    fn test_overrides() {
        let config = RelayerConfig::from_lookup(lookup(&[
            ("CHAIN_ID", "10"),
            ("CHUNK_SIZE", "2"),
            ("OWNER", "0x0000000000000000000000000000000000000a11"),
            (
                "EXECUTORS",
                "0x00000000000000000000000000000000000000e1, 0x00000000000000000000000000000000000000e2",
            ),
        ]))
        .unwrap();
        assert_eq!(config.chain_id, 10);
        assert_eq!(config.chunk_size, 2);
        assert_eq!(config.owner, address!("0000000000000000000000000000000000000a11"));
        assert_eq!(
            config.executors,
            vec![
                address!("00000000000000000000000000000000000000e1"),
                address!("00000000000000000000000000000000000000e2"),
            ]
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(RelayerConfig::from_lookup(lookup(&[("CHAIN_ID", "mainnet")])).is_err());
        assert!(RelayerConfig::from_lookup(lookup(&[("CHUNK_SIZE", "0")])).is_err());
        assert!(RelayerConfig::from_lookup(lookup(&[("EXECUTORS", "0x1234")])).is_err());
    }
}
