//! Optional observability helpers for pipeline calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `remoteauth.request` with the `call`
//!   (api/refresh) and `stage` (call site) fields.
//! - Enable `metrics` to count API calls (`remoteauth_api_call_total`, labeled by where the
//!   body came from) and refresh decisions (`remoteauth_refresh_total`, labeled by how the
//!   401 was resolved).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Kinds of outbound calls the pipeline performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// Business endpoint under `/api/v1`.
	Api,
	/// Refresh exchange against `/oauth/token`.
	Refresh,
}
impl CallKind {
	/// Returns a stable label suitable for span fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::Api => "api",
			CallKind::Refresh => "refresh",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// How an `execute` call produced its result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApiOutcome {
	/// Body returned from the response cache without network access.
	Cached,
	/// Body fetched from the remote API (possibly after a refresh).
	Fetched,
	/// Error surfaced to the caller.
	Failed,
}
impl ApiOutcome {
	/// Returns the `source` label used by the API call counter.
	pub const fn as_str(self) -> &'static str {
		match self {
			ApiOutcome::Cached => "cache",
			ApiOutcome::Fetched => "network",
			ApiOutcome::Failed => "error",
		}
	}
}

/// How a 401 was resolved by the refresh protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshOutcome {
	/// This caller exchanged the refresh token and the owner stored the result.
	Renewed,
	/// Another caller had already renewed the token; no exchange was sent.
	Coalesced,
	/// Another caller's exchange for the same rejected token failed; its error was reused.
	Replayed,
	/// This caller's exchange or the owner callback failed.
	Failed,
}
impl RefreshOutcome {
	/// Returns the `outcome` label used by the refresh counter.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshOutcome::Renewed => "renewed",
			RefreshOutcome::Coalesced => "coalesced",
			RefreshOutcome::Replayed => "replayed",
			RefreshOutcome::Failed => "failed",
		}
	}

	/// Returns `true` when the caller may retry its request.
	pub const fn allows_retry(self) -> bool {
		matches!(self, RefreshOutcome::Renewed | RefreshOutcome::Coalesced)
	}
}
