//! Async RemoteAuth SDK: call the RemoteAuth API on behalf of an authenticated user with
//! single-flight token refresh, bounded retries, and an optional GET response cache.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod pipeline;
pub mod request;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests and demos.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{MemoryTokenOwner, UserId},
		cache::{MemoryCache, ResponseCache},
		client::ReqwestRemoteAuth,
		config::ClientConfig,
		http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
		pipeline::{ReqwestPipeline, RequestPipeline},
	};

	/// Client identifier used by test configurations.
	pub const TEST_CLIENT_ID: &str = "client-test";
	/// Client secret used by test configurations.
	pub const TEST_CLIENT_SECRET: &str = "secret-test";

	/// Builds a configuration pointing at a mock server base URL.
	pub fn test_config(base_url: &str) -> ClientConfig {
		ClientConfig::builder()
			.base_url(Url::parse(base_url).expect("Mock server base URL should parse."))
			.client_id(TEST_CLIENT_ID)
			.client_secret(TEST_CLIENT_SECRET)
			.build()
			.expect("Test configuration should be valid.")
	}

	/// Constructs a reqwest-backed pipeline without a response cache.
	pub fn build_reqwest_test_pipeline(base_url: &str) -> ReqwestPipeline {
		RequestPipeline::with_http_client(
			test_config(base_url),
			ReqwestHttpClient::default(),
			ReqwestTransportErrorMapper,
		)
	}

	/// Constructs a reqwest-backed pipeline wired to a fresh [`MemoryCache`].
	pub fn build_cached_test_pipeline(base_url: &str) -> (ReqwestPipeline, Arc<MemoryCache>) {
		let cache_backend = Arc::new(MemoryCache::default());
		let cache: Arc<dyn ResponseCache> = cache_backend.clone();
		let pipeline = build_reqwest_test_pipeline(base_url).with_cache(cache);

		(pipeline, cache_backend)
	}

	/// Wraps a test pipeline in the endpoint client.
	pub fn build_reqwest_test_client(base_url: &str) -> ReqwestRemoteAuth {
		ReqwestRemoteAuth::new(build_reqwest_test_pipeline(base_url))
	}

	/// Creates an in-memory token owner holding `access`/`refresh` for `user`.
	pub fn test_owner(user: &str, access: &str, refresh: &str) -> MemoryTokenOwner {
		MemoryTokenOwner::new(
			UserId::new(user).expect("Test user identifier should be valid."),
			access,
			refresh,
			OffsetDateTime::now_utc() + Duration::hours(1),
		)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use {oauth2, serde_json, url};
#[cfg(test)] use {color_eyre as _, httpmock as _};
