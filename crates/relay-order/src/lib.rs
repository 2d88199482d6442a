use async_trait::async_trait;
use relay_types::{Address, OrderHash, OrderState};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrderError {
	#[error("order store query failed: {0}")]
	Query(String),
	#[error("unknown market {token_s}/{token_b}")]
	UnknownMarket { token_s: Address, token_b: Address },
}

/// Filtering applied to a miner-orders query.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
	/// Order hashes the matcher wants withheld from this round.
	pub exclude_hashes: Vec<OrderHash>,
	/// Excluded hashes only resurface after sitting idle for this many
	/// blocks, keeping unmatchable orders from thrashing every round.
	pub delayed_count: u64,
}

/// The order store as the miner sees it.
///
/// `miner_orders` returns owned fill views; callers are free to layer
/// in-flight adjustments on top without touching the persisted record.
#[async_trait]
pub trait OrderManager: Send + Sync {
	async fn miner_orders(
		&self,
		protocol: Address,
		token_s: Address,
		token_b: Address,
		limit: usize,
		query: &OrderQuery,
	) -> Result<Vec<OrderState>, OrderError>;

	/// Whether an order's remaining amount is below the store's dust
	/// threshold on either side.
	fn is_fully_finished(&self, order: &OrderState) -> bool;
}
