//! Block-gated round scheduling across markets.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use relay_account::AccountManager;
use relay_order::OrderManager;
use relay_types::{BlockEvent, RelayEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::balance_cache::BalanceCache;
use crate::config::MatcherConfig;
use crate::evaluate::Evaluator;
use crate::event_bus::EventBus;
use crate::market::Market;
use crate::reconcile::SettlementReconciler;
use crate::registry::MatchRegistry;
use crate::submit::Submitter;

/// The round engine: listens for block ticks, fans matching out across
/// markets, and feeds settlement outcomes to the reconciler.
///
/// Rounds are strictly serialized; a new tick is only considered once the
/// previous round's workers have joined. The balance cache built for a
/// round never outlives it.
pub struct TimingMatcher {
	markets: Vec<Arc<Market>>,
	registry: Arc<MatchRegistry>,
	reconciler: SettlementReconciler,
	account_manager: Arc<dyn AccountManager>,
	event_bus: EventBus,
	duration: u64,
	last_block_number: AtomicU64,
}

impl TimingMatcher {
	/// Instantiates one market per registered protocol and configured
	/// token pair, deduplicating `(A, B)` against `(B, A)`.
	pub fn new(
		config: &MatcherConfig,
		order_manager: Arc<dyn OrderManager>,
		evaluator: Arc<dyn Evaluator>,
		submitter: Arc<dyn Submitter>,
		account_manager: Arc<dyn AccountManager>,
		event_bus: EventBus,
	) -> Self {
		let registry = Arc::new(MatchRegistry::new());
		let mut markets = Vec::new();
		let mut seen_pairs = HashSet::new();
		for pair in &config.token_pairs {
			if !seen_pairs.insert(pair.canonical()) {
				debug!(token_a = %pair.token_a, token_b = %pair.token_b, "duplicate token pair skipped");
				continue;
			}
			for protocol in submitter.protocols() {
				markets.push(Arc::new(Market::new(
					*protocol,
					*pair,
					config.round_orders_count,
					config.delayed_number,
					order_manager.clone(),
					evaluator.clone(),
					submitter.clone(),
					registry.clone(),
					event_bus.clone(),
				)));
			}
		}
		info!(
			markets = markets.len(),
			duration = config.duration,
			"timing matcher constructed"
		);

		Self {
			markets,
			reconciler: SettlementReconciler::new(registry.clone()),
			registry,
			account_manager,
			event_bus,
			duration: config.duration,
			last_block_number: AtomicU64::new(0),
		}
	}

	pub fn markets(&self) -> &[Arc<Market>] {
		&self.markets
	}

	pub fn registry(&self) -> Arc<MatchRegistry> {
		self.registry.clone()
	}

	/// Drives rounds and reconciliation until `shutdown` fires. Dropping
	/// the bus receiver on exit unsubscribes; an in-flight round drains
	/// before the loop returns because rounds are awaited inline.
	pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
		let mut events = self.event_bus.subscribe();
		loop {
			tokio::select! {
				received = events.recv() => match received {
					Ok(RelayEvent::BlockNew(event)) => {
						self.on_block(event).await;
					}
					Ok(RelayEvent::RingMined(event)) => {
						self.reconciler.on_ring_mined(event.ring_hash);
					}
					Ok(RelayEvent::RingSubmitFailed(event)) => {
						self.reconciler.on_ring_failed(event.ring_hash, &event.reason);
					}
					// Our own output; the submitter side drives it.
					Ok(RelayEvent::NewRings(_)) => {}
					Err(RecvError::Lagged(skipped)) => {
						warn!(skipped, "event bus receiver lagged");
					}
					Err(RecvError::Closed) => break,
				},
				_ = shutdown.changed() => break,
			}
		}
		info!("timing matcher stopped");
	}

	/// Gates on the block cadence; when due, runs one round: a fresh
	/// balance cache, one worker per market, joined before returning.
	/// Returns whether a round ran.
	pub async fn on_block(&self, event: BlockEvent) -> bool {
		let last = self.last_block_number.load(Ordering::Acquire);
		if last + self.duration > event.block_number {
			debug!(
				block = event.block_number,
				last, "tick inside the round gap dropped"
			);
			return false;
		}
		self.last_block_number
			.store(event.block_number, Ordering::Release);

		let round = event.block_number;
		let balances = Arc::new(BalanceCache::new(self.account_manager.clone()));
		let mut workers = JoinSet::new();
		for market in &self.markets {
			let market = market.clone();
			let balances = balances.clone();
			workers.spawn(async move { market.match_round(round, &balances).await });
		}
		while let Some(joined) = workers.join_next().await {
			match joined {
				Ok(Ok(rings)) => debug!(rings = rings.len(), "market round complete"),
				Ok(Err(err)) => warn!(%err, "market skipped its round"),
				Err(err) => error!(%err, "market worker panicked"),
			}
		}
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::evaluate::EvaluateError;
	use crate::submit::{ProtocolInfo, SubmitError};
	use async_trait::async_trait;
	use num_bigint::BigInt;
	use num_rational::BigRational;
	use num_traits::Zero;
	use relay_account::{AccountError, TokenBalance};
	use relay_order::{OrderError, OrderQuery};
	use relay_types::{
		keccak256, Address, Bytes, Order, OrderState, Ring, RingMinedEvent, RingSubmitInfo,
		TokenPair, B256, U256,
	};
	use std::time::Duration;

	fn addr(byte: u8) -> Address {
		Address::repeat_byte(byte)
	}

	fn protocol_info(byte: u8) -> ProtocolInfo {
		ProtocolInfo {
			contract_address: addr(byte),
			lrc_token_address: addr(0x1c),
		}
	}

	fn sell(token_s: Address, token_b: Address, owner: u8, amount_s: i64, amount_b: i64) -> OrderState {
		OrderState::new(Order::new(
			addr(0xcc),
			addr(owner),
			token_s,
			token_b,
			BigInt::from(amount_s),
			BigInt::from(amount_b),
			BigInt::from(10),
		))
	}

	struct StoreOrderManager {
		orders: Vec<OrderState>,
	}

	#[async_trait]
	impl OrderManager for StoreOrderManager {
		async fn miner_orders(
			&self,
			_protocol: Address,
			token_s: Address,
			_token_b: Address,
			limit: usize,
			query: &OrderQuery,
		) -> Result<Vec<OrderState>, OrderError> {
			Ok(self
				.orders
				.iter()
				.filter(|order| order.raw_order.token_s == token_s)
				.filter(|order| !query.exclude_hashes.contains(&order.raw_order.hash))
				.take(limit)
				.cloned()
				.collect())
		}

		fn is_fully_finished(&self, order: &OrderState) -> bool {
			order.available_amount_s().is_zero() || order.available_amount_b().is_zero()
		}
	}

	struct AmpleAccountManager;

	#[async_trait]
	impl AccountManager for AmpleAccountManager {
		async fn balance_and_allowance(
			&self,
			_owner: Address,
			_token: Address,
		) -> Result<TokenBalance, AccountError> {
			Ok(TokenBalance::new(
				BigInt::from(1_000_000_000i64),
				BigInt::from(1_000_000_000i64),
			))
		}
	}

	/// Proposes consuming both orders entirely.
	struct FullFillEvaluator;

	#[async_trait]
	impl Evaluator for FullFillEvaluator {
		async fn compute_ring(&self, ring: &mut Ring) -> Result<(), EvaluateError> {
			for filled in ring.orders.iter_mut() {
				filled.fill_amount_s =
					BigRational::from_integer(filled.order_state.available_amount_s());
				filled.fill_amount_b =
					BigRational::from_integer(filled.order_state.available_amount_b());
			}
			ring.received = BigInt::from(1);
			Ok(())
		}
	}

	struct HashSubmitter {
		protocols: Vec<ProtocolInfo>,
	}

	#[async_trait]
	impl Submitter for HashSubmitter {
		fn protocols(&self) -> &[ProtocolInfo] {
			&self.protocols
		}

		async fn generate_ring_submit_info(
			&self,
			ring: Ring,
		) -> Result<RingSubmitInfo, SubmitError> {
			let mut buf = Vec::new();
			for order in &ring.orders {
				buf.extend_from_slice(order.order_state.raw_order.hash.as_slice());
			}
			let ring_hash = keccak256(&buf);
			let received = ring.received.clone();
			Ok(RingSubmitInfo {
				ring,
				ring_hash,
				received,
				gas_limit: U256::from(500_000u64),
				submit_tx_data: Bytes::new(),
			})
		}
	}

	fn matcher_with(
		config: MatcherConfig,
		orders: Vec<OrderState>,
		protocols: Vec<ProtocolInfo>,
		event_bus: EventBus,
	) -> TimingMatcher {
		TimingMatcher::new(
			&config,
			Arc::new(StoreOrderManager { orders }),
			Arc::new(FullFillEvaluator),
			Arc::new(HashSubmitter { protocols }),
			Arc::new(AmpleAccountManager),
			event_bus,
		)
	}

	#[tokio::test]
	async fn construction_dedupes_pairs_across_protocols() {
		let config = MatcherConfig {
			token_pairs: vec![
				TokenPair::new(addr(0xa1), addr(0xb2)),
				// Same market, opposite orientation.
				TokenPair::new(addr(0xb2), addr(0xa1)),
				TokenPair::new(addr(0xc3), addr(0xd4)),
			],
			..MatcherConfig::default()
		};
		let matcher = matcher_with(
			config,
			Vec::new(),
			vec![protocol_info(0xcc), protocol_info(0xdd)],
			EventBus::new(16),
		);
		assert_eq!(matcher.markets().len(), 4);
	}

	#[tokio::test]
	async fn tick_gating_respects_duration() {
		let config = MatcherConfig {
			duration: 10,
			..MatcherConfig::default()
		};
		let matcher = matcher_with(config, Vec::new(), Vec::new(), EventBus::new(16));

		assert!(matcher.on_block(BlockEvent { block_number: 100 }).await);
		assert!(!matcher.on_block(BlockEvent { block_number: 105 }).await);
		assert!(!matcher.on_block(BlockEvent { block_number: 109 }).await);
		assert!(matcher.on_block(BlockEvent { block_number: 110 }).await);
		assert_eq!(matcher.last_block_number.load(Ordering::Acquire), 110);
	}

	#[tokio::test]
	async fn round_populates_registry_and_publishes() {
		let token_a = addr(0xa1);
		let token_b = addr(0xb2);
		let a = sell(token_a, token_b, 0x01, 100, 50);
		let b = sell(token_b, token_a, 0x02, 50, 100);
		let config = MatcherConfig {
			duration: 1,
			token_pairs: vec![TokenPair::new(token_a, token_b)],
			..MatcherConfig::default()
		};
		let event_bus = EventBus::new(16);
		let matcher = matcher_with(
			config,
			vec![a.clone(), b.clone()],
			vec![protocol_info(0xcc)],
			event_bus.clone(),
		);
		let mut events = event_bus.subscribe();

		assert!(matcher.on_block(BlockEvent { block_number: 100 }).await);

		assert_eq!(matcher.registry().tracked_orders(), 2);
		assert_eq!(matcher.registry().rounds_for(&a.raw_order.hash)[0].round, 100);
		match events.try_recv().unwrap() {
			RelayEvent::NewRings(event) => assert_eq!(event.rings.len(), 1),
			other => panic!("unexpected event: {other:?}"),
		}
	}

	#[tokio::test]
	async fn run_loop_reconciles_and_rematches() {
		let token_a = addr(0xa1);
		let token_b = addr(0xb2);
		let a = sell(token_a, token_b, 0x01, 100, 50);
		let b = sell(token_b, token_a, 0x02, 50, 100);
		let config = MatcherConfig {
			duration: 1,
			token_pairs: vec![TokenPair::new(token_a, token_b)],
			..MatcherConfig::default()
		};
		let event_bus = EventBus::new(64);
		let matcher = Arc::new(matcher_with(
			config,
			vec![a.clone(), b.clone()],
			vec![protocol_info(0xcc)],
			event_bus.clone(),
		));
		let registry = matcher.registry();

		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		let runner = {
			let matcher = matcher.clone();
			tokio::spawn(async move { matcher.run(shutdown_rx).await })
		};

		tokio::time::timeout(Duration::from_secs(10), async {
			// Keep ticking until the first round lands; publishes before the
			// run loop subscribes are simply missed.
			let mut block = 100;
			while registry.tracked_orders() != 2 {
				event_bus.publish(RelayEvent::BlockNew(BlockEvent { block_number: block }));
				block += 1;
				tokio::time::sleep(Duration::from_millis(10)).await;
			}

			// Settle the ring; the in-flight fills must disappear.
			let ring_hash = registry.rounds_for(&a.raw_order.hash)[0].ring_hash;
			while registry.tracked_orders() != 0 {
				event_bus.publish(RelayEvent::RingMined(RingMinedEvent {
					ring_hash,
					tx_hash: B256::repeat_byte(0x99),
					block_number: block,
				}));
				tokio::time::sleep(Duration::from_millis(10)).await;
			}

			// With the rounds reconciled away, the same orders match again:
			// availability no longer subtracts the removed rounds.
			while registry.tracked_orders() != 2 {
				event_bus.publish(RelayEvent::BlockNew(BlockEvent { block_number: block }));
				block += 1;
				tokio::time::sleep(Duration::from_millis(10)).await;
			}
		})
		.await
		.expect("matcher did not complete the submit/settle/resubmit cycle");

		shutdown_tx.send(true).unwrap();
		runner.await.unwrap();
	}
}
