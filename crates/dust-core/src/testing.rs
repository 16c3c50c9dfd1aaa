//! In-process settlement network and fixtures for orchestration tests.

use crate::engine::event_bus::EventBus;
use crate::handlers::Invoker;
use crate::orchestrator::BatchOrchestrator;
use async_trait::async_trait;
use dust_account::implementations::local::LocalAccount;
use dust_account::{AccountService, SignerRegistry};
use dust_contract::InvocationEncoder;
use dust_delivery::{DeliveryError, SubmissionInterface, SubmissionService};
use dust_types::{
	AccountSnapshot, AddressSchemeKind, ConfigSchema, ContractValue, DustItem, NetworkConfig,
	OperationKind, OperationRequest, RawResult, SecretString, SettlementPolicy, SignedSubmission,
	SubmissionHandle, SubmissionStatus, ValidationError,
};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const CONTRACT: &str = "CAAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQC526";
pub const ETH_REF: &str = "CABAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAFNSZ";
pub const SOL_REF: &str = "CABQGAYDAMBQGAYDAMBQGAYDAMBQGAYDAMBQGAYDAMBQGAYDAMBQGCK3";
pub const BASE_ASSET: &str = "CACAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAINCW";
pub const USDC_REF: &str = "CACQKBIFAUCQKBIFAUCQKBIFAUCQKBIFAUCQKBIFAUCQKBIFAUCQLC2U";

pub const SETTLEMENT_SEED: &str = "SADQOBYHA4DQOBYHA4DQOBYHA4DQOBYHA4DQOBYHA4DQOBYHA4DQP54X";
pub const SETTLEMENT_ADDRESS: &str = "GDVEU3DD4KOFECV66VIHWEZOYX4ZKR3WV27L464SIIPOU2IUI3JCZA57";
pub const SOL_SEED: &str = "SAFQWCYLBMFQWCYLBMFQWCYLBMFQWCYLBMFQWCYLBMFQWCYLBMFQX44I";

pub fn network_config() -> NetworkConfig {
	NetworkConfig {
		contract_address: CONTRACT.to_string(),
		network_passphrase: "Test SDF Network ; September 2015".to_string(),
		rpc_url: "http://localhost:8000".to_string(),
		address_scheme: AddressSchemeKind::Stellar,
		fee: 100,
		timeout_seconds: 30,
		poll_interval_ms: 1000,
	}
}

pub fn signer(seed: &str) -> Arc<AccountService> {
	let account = LocalAccount::new(&SecretString::from(seed), None).unwrap();
	Arc::new(AccountService::new(Box::new(account)))
}

/// Settlement account on `stellar`, with `ethereum` items signed by the
/// settlement account itself and `solana` items by a second account.
pub fn signers() -> SignerRegistry {
	let settlement = signer(SETTLEMENT_SEED);
	let mut map = HashMap::new();
	map.insert("stellar".to_string(), settlement.clone());
	map.insert("ethereum".to_string(), settlement);
	map.insert("solana".to_string(), signer(SOL_SEED));
	SignerRegistry::new(map, "stellar").unwrap()
}

pub fn item(chain: &str, asset_ref: &str, value: &str) -> DustItem {
	DustItem {
		owner_address: format!("0x{}owner", chain),
		source_chain: chain.to_string(),
		asset_id: chain.to_uppercase(),
		asset_ref: asset_ref.to_string(),
		raw_amount: Decimal::ONE,
		implied_value: Decimal::from_str(value).unwrap(),
	}
}

struct NoSchema;

impl ConfigSchema for NoSchema {
	fn validate(&self, _config: &toml::Value) -> Result<(), ValidationError> {
		Ok(())
	}
}

/// Settlement network double.
///
/// Enforces account sequences, lets deposits of chosen amounts hang or be
/// rejected, and can fail a number of settlement attempts.
#[derive(Clone, Default)]
pub struct FakeNetwork {
	hang: HashSet<u64>,
	reject: HashSet<u64>,
	settle_failures: Arc<AtomicUsize>,
	value: u64,
	sequences: Arc<Mutex<HashMap<String, u64>>>,
	statuses: Arc<Mutex<HashMap<String, SubmissionStatus>>>,
	log: Arc<Mutex<Vec<SignedSubmission>>>,
}

impl FakeNetwork {
	pub fn new() -> Self {
		Self {
			value: 109,
			..Default::default()
		}
	}

	/// Deposits of `amount` minor units are accepted but never resolve.
	pub fn hang_on(mut self, amount: u64) -> Self {
		self.hang.insert(amount);
		self
	}

	/// Deposits of `amount` minor units are refused on send.
	pub fn reject(mut self, amount: u64) -> Self {
		self.reject.insert(amount);
		self
	}

	/// The next `count` settlement submissions fail.
	pub fn fail_settlements(self, count: usize) -> Self {
		self.settle_failures.store(count, Ordering::SeqCst);
		self
	}

	/// Value returned by withdraw, swap and balance queries.
	pub fn returning(mut self, value: u64) -> Self {
		self.value = value;
		self
	}

	/// Every submission the network accepted, in acceptance order.
	pub fn submissions(&self) -> Vec<SignedSubmission> {
		self.log.lock().unwrap().clone()
	}

	pub fn submitted(&self, kind: OperationKind) -> Vec<SignedSubmission> {
		self.submissions()
			.into_iter()
			.filter(|s| s.request.operation == kind)
			.collect()
	}
}

fn deposit_amount(request: &OperationRequest) -> Option<u64> {
	match request.parameters.get(5) {
		Some(ContractValue::U64(amount)) => Some(*amount),
		_ => None,
	}
}

#[async_trait]
impl SubmissionInterface for FakeNetwork {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(NoSchema)
	}

	async fn load_account(&self, address: &str) -> Result<AccountSnapshot, DeliveryError> {
		let sequence = *self.sequences.lock().unwrap().get(address).unwrap_or(&0);
		Ok(AccountSnapshot {
			address: address.to_string(),
			sequence,
		})
	}

	async fn send(&self, submission: &SignedSubmission) -> Result<SubmissionHandle, DeliveryError> {
		tokio::task::yield_now().await;
		let request = &submission.request;
		if let Some(amount) = deposit_amount(request) {
			if self.reject.contains(&amount) {
				return Err(DeliveryError::Rejected("tx_insufficient_fee".to_string()));
			}
		}

		let mut sequences = self.sequences.lock().unwrap();
		let current = sequences.entry(submission.source.clone()).or_insert(0);
		if submission.sequence != *current + 1 {
			return Err(DeliveryError::Rejected(format!(
				"tx_bad_seq: expected {}, got {}",
				*current + 1,
				submission.sequence
			)));
		}
		*current = submission.sequence;
		drop(sequences);

		let status = match request.operation {
			OperationKind::Deposit => match deposit_amount(request) {
				Some(amount) if self.hang.contains(&amount) => SubmissionStatus::Pending,
				_ => SubmissionStatus::Success {
					result: RawResult::void(),
				},
			},
			OperationKind::Settle => {
				let failing = self
					.settle_failures
					.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
					.is_ok();
				if failing {
					SubmissionStatus::Failed {
						error: "settlement reverted".to_string(),
					}
				} else {
					SubmissionStatus::Success {
						result: RawResult::void(),
					}
				}
			},
			_ => SubmissionStatus::Success {
				result: RawResult::u64(self.value),
			},
		};

		let mut log = self.log.lock().unwrap();
		let handle = format!("{:064x}", log.len() + 1);
		log.push(submission.clone());
		self.statuses.lock().unwrap().insert(handle.clone(), status);
		Ok(SubmissionHandle(handle))
	}

	async fn get_status(&self, handle: &SubmissionHandle) -> Result<SubmissionStatus, DeliveryError> {
		tokio::task::yield_now().await;
		self.statuses
			.lock()
			.unwrap()
			.get(&handle.0)
			.cloned()
			.ok_or_else(|| DeliveryError::Network(format!("unknown handle {}", handle)))
	}

	async fn simulate(
		&self,
		_request: &OperationRequest,
		_source: &str,
	) -> Result<RawResult, DeliveryError> {
		Ok(RawResult::u64(self.value))
	}
}

pub fn invoker(network: &FakeNetwork) -> Arc<Invoker> {
	let config = network_config();
	let encoder = Arc::new(InvocationEncoder::new(config.clone()).unwrap());
	let submission = Arc::new(SubmissionService::new(Box::new(network.clone()), config));
	Arc::new(Invoker::new(encoder, submission))
}

pub fn orchestrator(network: &FakeNetwork, policy: SettlementPolicy) -> BatchOrchestrator {
	BatchOrchestrator::new(invoker(network), signers(), policy, EventBus::new(256))
}
