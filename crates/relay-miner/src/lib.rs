//! Ring-matching core of the relay.
//!
//! A periodic engine gated by block-height ticks: each round it fans
//! matching out across per-pair markets, pairs sell-A-buy-B orders against
//! sell-B-buy-A orders under a price-validity predicate, picks the best
//! ring per seed order by the evaluator's `received`, and publishes the
//! round's batch for the submitter. In-flight fills are tracked in a
//! process-wide registry so overlapping rounds never double-commit an
//! order, and reconciled away as rings mine or fail on chain.
//!
//! Matcher state is ephemeral by design; nothing here survives a restart.

pub mod balance_cache;
pub mod config;
pub mod evaluate;
pub mod event_bus;
pub mod market;
pub mod matcher;
pub mod reconcile;
pub mod registry;
pub mod submit;

pub use balance_cache::BalanceCache;
pub use config::{ConfigError, MatcherConfig};
pub use evaluate::{price_valid, EvaluateError, Evaluator};
pub use event_bus::EventBus;
pub use market::Market;
pub use matcher::TimingMatcher;
pub use reconcile::SettlementReconciler;
pub use registry::{MatchRegistry, OrderMatchState, RoundState};
pub use submit::{ProtocolInfo, SubmitError, Submitter};
