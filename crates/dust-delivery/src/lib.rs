//! Submission of signed contract invocations.
//!
//! [`SubmissionService`] drives one invocation through its network cycle:
//! load the source account, sign, send, then poll until the submission
//! resolves. Backends implementing [`SubmissionInterface`] only move bytes;
//! sequencing, signing and the timeout window live in the service.

use async_trait::async_trait;
use dashmap::DashMap;
use dust_account::AccountService;
use dust_types::{
	truncate_id, AccountSnapshot, ConfigSchema, ImplementationRegistry, InvocationError,
	NetworkConfig, OperationRequest, RawResult, SignedSubmission, SubmissionHandle,
	SubmissionStatus,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::instrument;

pub mod implementations {
	pub mod rpc;
}

#[derive(Debug, Error)]
pub enum DeliveryError {
	#[error("Network error: {0}")]
	Network(String),
	/// The network refused the submission.
	#[error("Submission rejected: {0}")]
	Rejected(String),
	#[error("Account not found: {0}")]
	AccountNotFound(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Transport to the settlement network.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SubmissionInterface: Send + Sync {
	/// Schema of this backend's config table.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Fetches the current state of `address`.
	async fn load_account(&self, address: &str) -> Result<AccountSnapshot, DeliveryError>;

	/// Sends a signed submission and returns the handle the network assigned.
	async fn send(&self, submission: &SignedSubmission) -> Result<SubmissionHandle, DeliveryError>;

	/// Reports the current status of a previously sent submission.
	async fn get_status(&self, handle: &SubmissionHandle)
		-> Result<SubmissionStatus, DeliveryError>;

	/// Evaluates a read-only request without submitting it.
	async fn simulate(
		&self,
		request: &OperationRequest,
		source: &str,
	) -> Result<RawResult, DeliveryError>;
}

pub type DeliveryFactory =
	fn(&toml::Value, &NetworkConfig) -> Result<Box<dyn SubmissionInterface>, DeliveryError>;

pub trait DeliveryRegistry: ImplementationRegistry<Factory = DeliveryFactory> {}

/// All registered submission backends as `(name, factory)` pairs.
pub fn get_all_implementations() -> Vec<(&'static str, DeliveryFactory)> {
	use implementations::rpc;

	vec![(rpc::Registry::NAME, rpc::Registry::factory())]
}

#[derive(Serialize)]
struct SigningEnvelope<'a> {
	source: &'a str,
	sequence: u64,
	request: &'a OperationRequest,
}

/// Bytes a submission's signature covers.
///
/// `sha256(sha256(passphrase) || json({source, sequence, request}))`. Binding
/// the passphrase keeps a signature from being replayed on another network.
pub fn signing_payload(
	passphrase: &str,
	source: &str,
	sequence: u64,
	request: &OperationRequest,
) -> Result<Vec<u8>, InvocationError> {
	let envelope = serde_json::to_vec(&SigningEnvelope {
		source,
		sequence,
		request,
	})
	.map_err(|e| InvocationError::Encoding(format!("Failed to serialize request: {}", e)))?;

	let network_id = Sha256::digest(passphrase.as_bytes());
	let mut hasher = Sha256::new();
	hasher.update(network_id);
	hasher.update(&envelope);
	Ok(hasher.finalize().to_vec())
}

/// Signs and submits requests, one logical sequence per account.
pub struct SubmissionService {
	backend: Box<dyn SubmissionInterface>,
	network: NetworkConfig,
	account_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SubmissionService {
	pub fn new(backend: Box<dyn SubmissionInterface>, network: NetworkConfig) -> Self {
		Self {
			backend,
			network,
			account_locks: DashMap::new(),
		}
	}

	fn account_lock(&self, address: &str) -> Arc<Mutex<()>> {
		self.account_locks
			.entry(address.to_string())
			.or_insert_with(|| Arc::new(Mutex::new(())))
			.clone()
	}

	/// Signs `request` with `signer`, submits it and waits for the result.
	///
	/// Submissions from the same account are serialized for the whole
	/// load, sign, send and resolve cycle. The cycle itself is bounded by the
	/// network timeout; waiting for the account lock is not.
	#[instrument(skip_all, fields(operation = %request.operation, account = %truncate_id(&signer.address())))]
	pub async fn invoke(
		&self,
		request: &OperationRequest,
		signer: &AccountService,
	) -> Result<RawResult, InvocationError> {
		let source = signer.address();
		let lock = self.account_lock(&source);
		let _guard = lock.lock().await;

		let seconds = self.network.timeout_seconds;
		match tokio::time::timeout(self.network.timeout(), self.submit(request, signer, &source))
			.await
		{
			Ok(result) => result,
			Err(_) => {
				tracing::warn!(seconds, "Submission timed out");
				Err(InvocationError::Timeout { seconds })
			},
		}
	}

	async fn submit(
		&self,
		request: &OperationRequest,
		signer: &AccountService,
		source: &str,
	) -> Result<RawResult, InvocationError> {
		let account = self
			.backend
			.load_account(source)
			.await
			.map_err(|e| InvocationError::Submission(e.to_string()))?;
		let sequence = account.sequence.checked_add(1).ok_or_else(|| {
			InvocationError::Submission("Account sequence exhausted".to_string())
		})?;

		let payload = signing_payload(&self.network.network_passphrase, source, sequence, request)?;
		let signature = signer
			.sign(&payload)
			.await
			.map_err(|e| InvocationError::Signing(e.to_string()))?;

		let submission = SignedSubmission {
			request: request.clone(),
			source: source.to_string(),
			sequence,
			public_key: signer.public_key(),
			signature,
		};
		let handle = self
			.backend
			.send(&submission)
			.await
			.map_err(|e| InvocationError::Submission(e.to_string()))?;
		tracing::debug!(handle = %truncate_id(&handle.0), sequence, "Submitted");

		self.await_resolution(&handle).await
	}

	async fn await_resolution(&self, handle: &SubmissionHandle) -> Result<RawResult, InvocationError> {
		loop {
			let status = self
				.backend
				.get_status(handle)
				.await
				.map_err(|e| InvocationError::Submission(e.to_string()))?;
			match status {
				SubmissionStatus::Pending => tokio::time::sleep(self.network.poll_interval()).await,
				SubmissionStatus::Success { result } => {
					tracing::debug!(handle = %truncate_id(&handle.0), "Resolved");
					return Ok(result);
				},
				SubmissionStatus::Failed { error } => {
					tracing::warn!(handle = %truncate_id(&handle.0), error = %error, "Submission failed");
					return Err(InvocationError::Submission(error));
				},
			}
		}
	}

	/// Evaluates a read-only request as `source` without submitting it.
	#[instrument(skip_all, fields(operation = %request.operation))]
	pub async fn simulate(
		&self,
		request: &OperationRequest,
		source: &str,
	) -> Result<RawResult, InvocationError> {
		let seconds = self.network.timeout_seconds;
		tokio::time::timeout(self.network.timeout(), self.backend.simulate(request, source))
			.await
			.map_err(|_| InvocationError::Timeout { seconds })?
			.map_err(|e| InvocationError::Submission(e.to_string()))
	}
}
