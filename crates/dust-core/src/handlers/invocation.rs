//! Runs one operation through encode, submit and decode.

use dust_account::AccountService;
use dust_contract::{decode_for, InvocationEncoder};
use dust_delivery::SubmissionService;
use dust_types::{DecodedValue, InvocationError, OperationArgs};
use std::sync::Arc;

/// Drives a single contract operation end to end.
///
/// Read-only operations are simulated from the signer's address; everything
/// else is signed and submitted.
pub struct Invoker {
	encoder: Arc<InvocationEncoder>,
	submission: Arc<SubmissionService>,
}

impl Invoker {
	pub fn new(encoder: Arc<InvocationEncoder>, submission: Arc<SubmissionService>) -> Self {
		Self {
			encoder,
			submission,
		}
	}

	/// Whether `address` is valid on the settlement chain.
	pub fn is_settlement_address(&self, address: &str) -> bool {
		self.encoder.check_address(address).is_ok()
	}

	pub async fn invoke(
		&self,
		args: &OperationArgs,
		signer: &AccountService,
	) -> Result<DecodedValue, InvocationError> {
		let request = self.encoder.encode_args(args)?;
		let raw = if request.operation.is_read_only() {
			self.submission.simulate(&request, &signer.address()).await?
		} else {
			self.submission.invoke(&request, signer).await?
		};
		decode_for(request.operation, &raw)
	}
}
