//! Events exchanged between the relay services.
//!
//! One payload type per topic; the bus is a typed channel, not a
//! dynamically dispatched registry.

use crate::{BlockNumber, RingHash, RingSubmitInfo, TxHash};

/// Unified event type carried by the relay event bus.
#[derive(Debug, Clone)]
pub enum RelayEvent {
	/// A new block was observed on chain.
	BlockNew(BlockEvent),
	/// A submitted ring settled on chain.
	RingMined(RingMinedEvent),
	/// A submitted ring was rejected before or during settlement.
	RingSubmitFailed(RingSubmitFailedEvent),
	/// A market finished a round and produced a batch of ring candidates.
	NewRings(NewRingsEvent),
}

impl RelayEvent {
	/// Stable topic label, used for log lines and bus diagnostics.
	pub fn topic(&self) -> &'static str {
		match self {
			RelayEvent::BlockNew(_) => "block_new",
			RelayEvent::RingMined(_) => "ring_mined",
			RelayEvent::RingSubmitFailed(_) => "ring_submit_failed",
			RelayEvent::NewRings(_) => "miner_new_rings",
		}
	}
}

#[derive(Debug, Clone)]
pub struct BlockEvent {
	pub block_number: BlockNumber,
}

#[derive(Debug, Clone)]
pub struct RingMinedEvent {
	pub ring_hash: RingHash,
	pub tx_hash: TxHash,
	pub block_number: BlockNumber,
}

#[derive(Debug, Clone)]
pub struct RingSubmitFailedEvent {
	pub ring_hash: RingHash,
	pub reason: String,
}

#[derive(Debug, Clone)]
pub struct NewRingsEvent {
	pub rings: Vec<RingSubmitInfo>,
}
