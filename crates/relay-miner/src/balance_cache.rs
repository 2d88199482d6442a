//! Per-round memoized balance view.

use std::collections::HashMap;
use std::sync::Arc;

use relay_account::{AccountError, AccountManager, TokenBalance};
use relay_types::Address;
use tokio::sync::Mutex;

/// Memoizes `(owner, token)` balance lookups for the lifetime of one round.
///
/// Within a round the matcher treats owner balances as static: it is
/// planning submissions, not observing settlement. A fresh cache is built
/// at every round start and dropped when the round's workers join.
pub struct BalanceCache {
	account_manager: Arc<dyn AccountManager>,
	accounts: Mutex<HashMap<(Address, Address), TokenBalance>>,
}

impl BalanceCache {
	pub fn new(account_manager: Arc<dyn AccountManager>) -> Self {
		Self {
			account_manager,
			accounts: Mutex::new(HashMap::new()),
		}
	}

	/// The memoized balance and allowance for `(owner, token)`, querying
	/// the account service on first sight.
	///
	/// The lock is held across the underlying query so market workers
	/// racing on the same pair coalesce into a single call.
	pub async fn get(&self, owner: Address, token: Address) -> Result<TokenBalance, AccountError> {
		let mut accounts = self.accounts.lock().await;
		if let Some(balance) = accounts.get(&(owner, token)) {
			return Ok(balance.clone());
		}
		let fetched = self.account_manager.balance_and_allowance(owner, token).await?;
		accounts.insert((owner, token), fetched.clone());
		Ok(fetched)
	}
}
