use async_trait::async_trait;
use num_bigint::BigInt;
use num_rational::BigRational;
use relay_types::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccountError {
	#[error("balance query failed: {0}")]
	Rpc(String),
	#[error("unknown account {0}")]
	UnknownAccount(Address),
}

/// An owner's balance and protocol allowance for one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalance {
	pub balance: BigInt,
	pub allowance: BigInt,
}

impl TokenBalance {
	pub fn new(balance: BigInt, allowance: BigInt) -> Self {
		Self { balance, allowance }
	}

	/// What a settlement can actually move: the smaller of balance and
	/// allowance, as an exact rational.
	pub fn available(&self) -> BigRational {
		BigRational::from_integer(self.balance.clone().min(self.allowance.clone()))
	}
}

/// Live balance lookup against the wallet/account service.
#[async_trait]
pub trait AccountManager: Send + Sync {
	async fn balance_and_allowance(
		&self,
		owner: Address,
		token: Address,
	) -> Result<TokenBalance, AccountError>;
}
