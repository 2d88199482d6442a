//! Settlement outcome reconciliation.

use std::sync::Arc;

use relay_types::RingHash;
use tracing::{info, warn};

use crate::registry::MatchRegistry;

/// Consumes ring-mined and ring-submit-failed outcomes, releasing the
/// corresponding in-flight fills from the registry. This is the only place
/// the registry shrinks.
pub struct SettlementReconciler {
	registry: Arc<MatchRegistry>,
}

impl SettlementReconciler {
	pub fn new(registry: Arc<MatchRegistry>) -> Self {
		Self { registry }
	}

	/// The ring settled; its fills are now reflected in the order store's
	/// dealt amounts, so the in-flight adjustment must stop.
	pub fn on_ring_mined(&self, ring_hash: RingHash) {
		info!(ring_hash = %ring_hash, "ring mined");
		self.registry.remove_ring(&ring_hash);
	}

	/// The ring was rejected; the fills never happened and the orders are
	/// immediately fillable again.
	pub fn on_ring_failed(&self, ring_hash: RingHash, reason: &str) {
		warn!(ring_hash = %ring_hash, reason, "ring submit failed");
		self.registry.remove_ring(&ring_hash);
	}
}
