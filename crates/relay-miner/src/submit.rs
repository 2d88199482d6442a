//! Ring submission interface.

use async_trait::async_trait;
use relay_types::{Address, Ring, RingSubmitInfo};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmitError {
	#[error("submit info generation failed: {0}")]
	Generation(String),
	#[error("gas estimation failed: {0}")]
	GasEstimation(String),
}

/// A protocol contract the submitter can settle through, with the fee
/// token it charges in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolInfo {
	pub contract_address: Address,
	pub lrc_token_address: Address,
}

/// Transaction construction and broadcast for rings.
///
/// The matcher only ever calls `generate_ring_submit_info`; driving the
/// resulting transactions on chain happens off the `NewRings` event.
#[async_trait]
pub trait Submitter: Send + Sync {
	/// Protocol contracts registered with this submitter; the matcher
	/// instantiates one market per protocol and token pair.
	fn protocols(&self) -> &[ProtocolInfo];

	/// Wraps an evaluated ring in a submission candidate, assigning its
	/// ring hash and accounting gas.
	async fn generate_ring_submit_info(&self, ring: Ring) -> Result<RingSubmitInfo, SubmitError>;
}
