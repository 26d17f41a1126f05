// self
use crate::obs::{ApiOutcome, RefreshOutcome};

/// Counts one finished `execute` call by where its result came from.
pub fn record_api_call(outcome: ApiOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("remoteauth_api_call_total", "source" => outcome.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}

/// Counts one resolution of the refresh protocol.
pub fn record_refresh(outcome: RefreshOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("remoteauth_refresh_total", "outcome" => outcome.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}
