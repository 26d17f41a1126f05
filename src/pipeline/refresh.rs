//! Refresh protocol with per-user singleflight guards.
//!
//! A 401 hands the rejected bearer token to [`RequestPipeline::refresh`]. The caller
//! waits on the user's [`RefreshGuard`]; once it holds the guard it compares the owner's
//! current access token with the rejected one. A mismatch means another task already
//! renewed the credentials, so the exchange is skipped and the caller simply retries.
//!
//! A failed exchange is remembered on the guard together with the token it tried to
//! replace. Callers that arrived before that exchange settled reuse its failure instead
//! of posting the same refresh token again; later callers start a new exchange.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	auth::{RefreshedTokens, TokenOwner, TokenSecret},
	http::{ApiHttpClient, TransportErrorMapper},
	obs::{self, CallKind, CallSpan, RefreshOutcome},
	pipeline::{RequestPipeline, decode_body},
	request::Method,
};

const GRANT_TYPE: &str = "refresh_token";

/// Per-user refresh coordination state.
#[derive(Debug)]
pub(crate) struct RefreshGuard {
	settled: AtomicU64,
	last_failure: AsyncMutex<Option<FailedExchange>>,
}
impl Default for RefreshGuard {
	fn default() -> Self {
		Self { settled: AtomicU64::new(0), last_failure: AsyncMutex::new(None) }
	}
}

#[derive(Debug)]
struct FailedExchange {
	rejected: TokenSecret,
	settled: u64,
	message: String,
	status: Option<u16>,
}
impl FailedExchange {
	fn new(rejected: &TokenSecret, settled: u64, error: &Error) -> Self {
		let message = match error {
			Error::Refresh { message, .. } => message.clone(),
			other => other.to_string(),
		};

		Self { rejected: rejected.clone(), settled, message, status: error.status() }
	}

	// Settled after the caller sampled the counter, for the token the caller holds.
	fn applies_to(&self, rejected: &TokenSecret, sampled: u64) -> bool {
		self.settled > sampled && self.rejected == *rejected
	}

	fn to_error(&self) -> Error {
		Error::Refresh { message: self.message.clone(), status: self.status }
	}
}

impl<C, M> RequestPipeline<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Renews the owner's credentials unless another caller already replaced `rejected`.
	pub(crate) async fn refresh(
		&self,
		owner: &dyn TokenOwner,
		rejected: &TokenSecret,
	) -> Result<()> {
		let span = CallSpan::new(CallKind::Refresh, "refresh");
		let guard = self.refresh_guard(owner.user_id());
		let sampled = guard.settled.load(Ordering::Acquire);
		let (outcome, result) =
			span.instrument(self.refresh_with_guard(&guard, sampled, owner, rejected)).await;

		self.release_refresh_guard(owner.user_id(), guard);
		obs::record_refresh(outcome);

		result
	}

	async fn refresh_with_guard(
		&self,
		guard: &RefreshGuard,
		sampled: u64,
		owner: &dyn TokenOwner,
		rejected: &TokenSecret,
	) -> (RefreshOutcome, Result<()>) {
		let mut last_failure = guard.last_failure.lock().await;

		if owner.access_token() != *rejected {
			self.metrics.record_coalesced_refresh();

			return (RefreshOutcome::Coalesced, Ok(()));
		}
		if let Some(failure) = last_failure.as_ref().filter(|f| f.applies_to(rejected, sampled)) {
			self.metrics.record_replayed_refresh_failure();

			return (RefreshOutcome::Replayed, Err(failure.to_error()));
		}

		self.metrics.record_refresh();

		let result = match self.exchange_refresh_token(owner, rejected).await {
			Ok(tokens) => owner.on_token_refreshed(tokens).await.map_err(Error::from),
			Err(e) => Err(e),
		};
		let settled = guard.settled.fetch_add(1, Ordering::AcqRel) + 1;

		match result {
			Ok(()) => {
				*last_failure = None;

				(RefreshOutcome::Renewed, Ok(()))
			},
			Err(e) => {
				self.metrics.record_refresh_failure();
				*last_failure = Some(FailedExchange::new(rejected, settled, &e));

				(RefreshOutcome::Failed, Err(e))
			},
		}
	}

	async fn exchange_refresh_token(
		&self,
		owner: &dyn TokenOwner,
		rejected: &TokenSecret,
	) -> Result<RefreshedTokens> {
		let config = self.config();
		let url = config.token_url()?;
		let payload = serde_json::json!({
			"grant_type": GRANT_TYPE,
			"refresh_token": owner.refresh_token(),
			"client_id": config.client_id,
			"client_secret": config.client_secret,
			"scope": config.scope,
		});
		let response = self.send(Method::Post, &url, Some(&payload), rejected).await?;
		let status = response.status().as_u16();

		if !response.status().is_success() {
			return Err(Error::Refresh {
				message: String::from_utf8_lossy(response.body()).into_owned(),
				status: Some(status),
			});
		}

		let body = decode_body(status, response.body())?;

		if let Some(message) = remote_error_message(&body) {
			return Err(Error::Refresh { message, status: Some(status) });
		}

		let tokens: RefreshedTokens = serde_path_to_error::deserialize(body)
			.map_err(|source| Error::Decode { source, status: Some(status) })?;

		if tokens.expires_in <= 0 {
			return Err(Error::Refresh {
				message: format!("token endpoint returned expires_in={}", tokens.expires_in),
				status: Some(status),
			});
		}

		Ok(tokens)
	}
}

/// Extracts the message of an error payload delivered with a success status.
///
/// The payload counts as an error when its `error` field is present and neither `null`
/// nor `false`; `"error": false` is treated as an explicit success marker.
fn remote_error_message(body: &Value) -> Option<String> {
	let error = body.get("error").filter(|v| !matches!(v, Value::Null | Value::Bool(false)))?;
	let text = |field: &str| body.get(field).and_then(Value::as_str).map(str::to_owned);

	Some(
		text("message")
			.or_else(|| text("error_description"))
			.or_else(|| error.as_str().map(str::to_owned))
			.unwrap_or_else(|| error.to_string()),
	)
}
