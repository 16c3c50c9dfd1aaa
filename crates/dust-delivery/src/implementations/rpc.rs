//! JSON-RPC 2.0 submission backend over HTTP.
//!
//! Methods used: `getAccount`, `sendTransaction`, `getTransaction` and
//! `simulateTransaction`. Signatures travel hex-encoded.

use crate::{DeliveryError, DeliveryFactory, DeliveryRegistry, SubmissionInterface};
use async_trait::async_trait;
use dust_types::{
	AccountSnapshot, ConfigSchema, Field, FieldType, ImplementationRegistry, NetworkConfig,
	OperationRequest, RawResult, Schema, SignedSubmission, SubmissionHandle, SubmissionStatus,
	ValidationError,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

pub struct RpcSubmissionSchema;

impl ConfigSchema for RpcSubmissionSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("rpc_url", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
							Ok(())
						},
						_ => Err("rpc_url must be an http(s) URL".to_string()),
					}
				}),
				Field::new(
					"request_timeout_ms",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
			],
		);
		schema.validate(config)
	}
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
	code: i64,
	message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
	result: Option<T>,
	error: Option<RpcErrorBody>,
}

#[derive(Debug, Serialize)]
struct WireSubmission<'a> {
	request: &'a OperationRequest,
	source: &'a str,
	sequence: u64,
	public_key: &'a str,
	signature: String,
}

#[derive(Debug, Deserialize)]
struct SendResult {
	hash: String,
	status: String,
	#[serde(default)]
	error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionResult {
	status: String,
	#[serde(default)]
	result: Option<RawResult>,
	#[serde(default)]
	error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SimulateResult {
	#[serde(default)]
	result: Option<RawResult>,
	#[serde(default)]
	error: Option<String>,
}

/// Unwraps a JSON-RPC response body into its `result`.
fn parse_response<T: DeserializeOwned>(method: &str, body: &str) -> Result<T, DeliveryError> {
	let response: RpcResponse<T> = serde_json::from_str(body)
		.map_err(|e| DeliveryError::Network(format!("Malformed {} response: {}", method, e)))?;
	match (response.result, response.error) {
		(_, Some(error)) if error.code == -32001 => Err(DeliveryError::AccountNotFound(error.message)),
		(_, Some(error)) => Err(DeliveryError::Network(format!(
			"{} failed ({}): {}",
			method, error.code, error.message
		))),
		(Some(result), None) => Ok(result),
		(None, None) => Err(DeliveryError::Network(format!("{} returned no result", method))),
	}
}

fn send_outcome(result: SendResult) -> Result<SubmissionHandle, DeliveryError> {
	match result.status.as_str() {
		"PENDING" | "DUPLICATE" => Ok(SubmissionHandle(result.hash)),
		_ => Err(DeliveryError::Rejected(
			result.error.unwrap_or_else(|| result.status.clone()),
		)),
	}
}

fn transaction_status(result: TransactionResult) -> Result<SubmissionStatus, DeliveryError> {
	match result.status.as_str() {
		"PENDING" | "NOT_FOUND" => Ok(SubmissionStatus::Pending),
		"SUCCESS" => Ok(SubmissionStatus::Success {
			result: result.result.unwrap_or_else(RawResult::void),
		}),
		"FAILED" => Ok(SubmissionStatus::Failed {
			error: result
				.error
				.unwrap_or_else(|| "Transaction failed".to_string()),
		}),
		other => Err(DeliveryError::Network(format!(
			"Unknown transaction status '{}'",
			other
		))),
	}
}

pub struct RpcSubmission {
	client: reqwest::Client,
	url: String,
	next_id: AtomicU64,
}

impl RpcSubmission {
	pub fn new(url: String, request_timeout: Duration) -> Result<Self, DeliveryError> {
		let client = reqwest::Client::builder()
			.timeout(request_timeout)
			.build()
			.map_err(|e| DeliveryError::Configuration(format!("Failed to build client: {}", e)))?;
		Ok(Self {
			client,
			url,
			next_id: AtomicU64::new(1),
		})
	}

	async fn call<T: DeserializeOwned>(
		&self,
		method: &str,
		params: serde_json::Value,
	) -> Result<T, DeliveryError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let body = json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": method,
			"params": params,
		});
		tracing::trace!(method, id, "RPC request");

		let response = self
			.client
			.post(&self.url)
			.json(&body)
			.send()
			.await
			.map_err(|e| DeliveryError::Network(e.to_string()))?;
		let status = response.status();
		if !status.is_success() {
			return Err(DeliveryError::Network(format!(
				"{} returned HTTP status {}",
				method, status
			)));
		}
		let text = response
			.text()
			.await
			.map_err(|e| DeliveryError::Network(e.to_string()))?;
		parse_response(method, &text)
	}
}

#[async_trait]
impl SubmissionInterface for RpcSubmission {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(RpcSubmissionSchema)
	}

	async fn load_account(&self, address: &str) -> Result<AccountSnapshot, DeliveryError> {
		self.call("getAccount", json!({ "address": address })).await
	}

	async fn send(&self, submission: &SignedSubmission) -> Result<SubmissionHandle, DeliveryError> {
		let wire = WireSubmission {
			request: &submission.request,
			source: &submission.source,
			sequence: submission.sequence,
			public_key: &submission.public_key,
			signature: hex::encode(&submission.signature),
		};
		let result: SendResult = self
			.call("sendTransaction", json!({ "transaction": wire }))
			.await?;
		send_outcome(result)
	}

	async fn get_status(
		&self,
		handle: &SubmissionHandle,
	) -> Result<SubmissionStatus, DeliveryError> {
		let result: TransactionResult = self
			.call("getTransaction", json!({ "hash": handle.0 }))
			.await?;
		transaction_status(result)
	}

	async fn simulate(
		&self,
		request: &OperationRequest,
		source: &str,
	) -> Result<RawResult, DeliveryError> {
		let result: SimulateResult = self
			.call(
				"simulateTransaction",
				json!({ "request": request, "source": source }),
			)
			.await?;
		match (result.result, result.error) {
			(_, Some(error)) => Err(DeliveryError::Rejected(error)),
			(Some(raw), None) => Ok(raw),
			(None, None) => Err(DeliveryError::Network(
				"simulateTransaction returned no value".to_string(),
			)),
		}
	}
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "rpc";
	type Factory = DeliveryFactory;

	fn factory() -> Self::Factory {
		create_rpc_submission
	}
}

impl DeliveryRegistry for Registry {}

/// Builds an [`RpcSubmission`]. `rpc_url` overrides `network.rpc_url`.
pub fn create_rpc_submission(
	config: &toml::Value,
	network: &NetworkConfig,
) -> Result<Box<dyn SubmissionInterface>, DeliveryError> {
	RpcSubmissionSchema
		.validate(config)
		.map_err(|e| DeliveryError::Configuration(format!("Invalid rpc config: {}", e)))?;

	let url = config
		.get("rpc_url")
		.and_then(|v| v.as_str())
		.unwrap_or(&network.rpc_url)
		.to_string();
	let timeout_ms = config
		.get("request_timeout_ms")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);

	tracing::debug!(url = %url, timeout_ms, "Configured rpc submission backend");
	Ok(Box::new(RpcSubmission::new(
		url,
		Duration::from_millis(timeout_ms),
	)?))
}
