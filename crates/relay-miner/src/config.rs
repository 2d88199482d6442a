//! Matcher configuration.

use std::path::Path;

use relay_types::TokenPair;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config file: {0}")]
	Io(#[from] std::io::Error),
	#[error("failed to parse config: {0}")]
	Parse(#[from] toml::de::Error),
}

/// Tuning knobs for the timing matcher.
#[derive(Debug, Clone, Deserialize)]
pub struct MatcherConfig {
	/// Max orders fetched per side per market per round.
	#[serde(default = "default_round_orders_count")]
	pub round_orders_count: usize,
	/// Minimum block gap between consecutive rounds.
	#[serde(default = "default_duration")]
	pub duration: u64,
	/// Idleness threshold, in blocks, applied to excluded order hashes
	/// before the order store surfaces them again.
	#[serde(default = "default_delayed_number")]
	pub delayed_number: u64,
	/// Trading pairs to instantiate markets for.
	#[serde(default)]
	pub token_pairs: Vec<TokenPair>,
}

fn default_round_orders_count() -> usize {
	20
}

fn default_duration() -> u64 {
	2
}

fn default_delayed_number() -> u64 {
	30
}

impl Default for MatcherConfig {
	fn default() -> Self {
		Self {
			round_orders_count: default_round_orders_count(),
			duration: default_duration(),
			delayed_number: default_delayed_number(),
			token_pairs: Vec::new(),
		}
	}
}

impl MatcherConfig {
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let raw = std::fs::read_to_string(path)?;
		Ok(toml::from_str(&raw)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_fields_take_defaults() {
		let config: MatcherConfig = toml::from_str("duration = 10").unwrap();
		assert_eq!(config.duration, 10);
		assert_eq!(config.round_orders_count, 20);
		assert_eq!(config.delayed_number, 30);
		assert!(config.token_pairs.is_empty());
	}

	#[test]
	fn token_pairs_parse() {
		let config: MatcherConfig = toml::from_str(
			r#"
			[[token_pairs]]
			token_a = "0x0101010101010101010101010101010101010101"
			token_b = "0x0202020202020202020202020202020202020202"
			"#,
		)
		.unwrap();
		assert_eq!(config.token_pairs.len(), 1);
	}
}
