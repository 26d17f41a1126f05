//! Authenticated request pipeline: cache short-circuit, dispatch, refresh-and-retry.
//!
//! [`RequestPipeline::execute`] runs one logical call on behalf of a
//! [`TokenOwner`]. GET responses are served from and written to the optional
//! [`ResponseCache`]. A 401 triggers at most one refresh exchange per call, after which
//! the descriptor is dispatched again with the renewed bearer token.

mod metrics;
mod refresh;

pub use metrics::PipelineMetrics;

use refresh::RefreshGuard;

// crates.io
use oauth2::{
	AsyncHttpClient, HttpResponse,
	http::{
		Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
// self
use crate::{
	_prelude::*,
	auth::{TokenOwner, TokenSecret, UserId},
	cache::{CacheKey, ResponseCache},
	config::ClientConfig,
	error::{ConfigError, StatusError},
	http::{self, ApiHttpClient, TransportErrorMapper},
	obs::{self, ApiOutcome, CallKind, CallSpan},
	request::{Method, RequestDescriptor},
};
#[cfg(feature = "reqwest")]
use crate::http::{ReqwestHttpClient, ReqwestTransportErrorMapper};

const JSON_MEDIA_TYPE: &str = "application/json";

#[cfg(feature = "reqwest")]
/// Pipeline specialized for the crate's default reqwest transport stack.
pub type ReqwestPipeline = RequestPipeline<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Executes authenticated calls against the RemoteAuth API.
///
/// The pipeline owns the transport, the static [`ClientConfig`], the optional response
/// cache, and one refresh guard per [`UserId`]. Clones share all of them, so a single
/// pipeline can be handed to many tasks while still issuing at most one refresh per
/// user at a time.
pub struct RequestPipeline<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Shared counters for pipeline activity.
	pub metrics: Arc<PipelineMetrics>,
	config: ClientConfig,
	cache: Option<Arc<dyn ResponseCache>>,
	refresh_guards: Arc<Mutex<HashMap<UserId, Arc<RefreshGuard>>>>,
}
impl<C, M> RequestPipeline<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a pipeline that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		config: ClientConfig,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			metrics: Default::default(),
			config,
			cache: None,
			refresh_guards: Default::default(),
		}
	}

	/// Attaches a response cache for GET calls.
	pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
		self.cache = Some(cache);

		self
	}

	/// Returns the static configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Returns the configured response cache, if any.
	pub fn cache(&self) -> Option<&Arc<dyn ResponseCache>> {
		self.cache.as_ref()
	}

	/// Fingerprint under which `descriptor` is cached for `owner`.
	pub fn cache_key(&self, owner: &dyn TokenOwner, descriptor: &RequestDescriptor) -> CacheKey {
		CacheKey::fingerprint(
			owner.user_id(),
			descriptor.method,
			&descriptor.url,
			descriptor.payload.as_ref(),
		)
	}

	/// Executes `descriptor` on behalf of `owner` and returns the decoded JSON body.
	///
	/// Fresh cached GET responses are returned without touching the network. A 401 runs
	/// the refresh protocol once and retries; a second 401, any other non-success status,
	/// and every collaborator failure surface as [`Error`].
	pub async fn execute(
		&self,
		descriptor: RequestDescriptor,
		owner: &dyn TokenOwner,
	) -> Result<Value> {
		let span = CallSpan::new(CallKind::Api, "execute");
		let key = self.cache_key(owner, &descriptor);

		span.record_request(descriptor.method.as_str(), key.as_str());
		self.metrics.record_request();

		let result = span.instrument(self.execute_with_key(&descriptor, owner, &key)).await;

		obs::record_api_call(match &result {
			Ok(Served::Cache(_)) => ApiOutcome::Cached,
			Ok(Served::Network(_)) => ApiOutcome::Fetched,
			Err(_) => ApiOutcome::Failed,
		});

		result.map(Served::into_value)
	}

	async fn execute_with_key(
		&self,
		descriptor: &RequestDescriptor,
		owner: &dyn TokenOwner,
		key: &CacheKey,
	) -> Result<Served> {
		let cache = self.cache.as_deref().filter(|_| descriptor.is_cacheable());

		let cached = match cache {
			Some(cache) if !descriptor.ignore_cache =>
				if cache.has(key).await? {
					cache.get(key).await?
				} else {
					None
				},
			_ => None,
		};

		if let Some(value) = cached {
			self.metrics.record_cache_hit();

			return Ok(Served::Cache(value));
		}

		let mut refreshed = false;

		loop {
			let access_token = owner.access_token();

			match self.dispatch(descriptor, &access_token).await {
				Ok(value) => {
					if let Some(cache) = cache {
						cache.set(key, value.clone(), self.config.cache_ttl).await?;
					}

					return Ok(Served::Network(value));
				},
				Err(Error::Status(status)) if status.is_unauthorized() && !refreshed => {
					refreshed = true;

					self.refresh(owner, &access_token).await?;
				},
				Err(e) => return Err(e),
			}
		}
	}

	async fn dispatch(&self, descriptor: &RequestDescriptor, bearer: &TokenSecret) -> Result<Value> {
		let response = self.send(descriptor.method, &descriptor.url, descriptor.body(), bearer).await?;
		let status = response.status();

		if !status.is_success() {
			return Err(StatusError {
				status: status.as_u16(),
				message: String::from_utf8_lossy(response.body()).into_owned(),
				retry_after: http::parse_retry_after(response.headers()),
			}
			.into());
		}

		decode_body(status.as_u16(), response.body())
	}

	async fn send(
		&self,
		method: Method,
		url: &Url,
		body: Option<&Value>,
		bearer: &TokenSecret,
	) -> Result<HttpResponse> {
		let builder = Request::builder()
			.method(method.to_http())
			.uri(url.as_str())
			.header(ACCEPT, JSON_MEDIA_TYPE)
			.header(AUTHORIZATION, bearer.bearer());
		let request = match body {
			Some(body) => builder
				.header(CONTENT_TYPE, JSON_MEDIA_TYPE)
				.body(body.to_string().into_bytes()),
			None => builder.body(Vec::new()),
		}
		.map_err(ConfigError::from)?;
		let handle = self.http_client.handle();

		handle.call(request).await.map_err(|e| self.transport_mapper.map_transport_error(e))
	}

	fn refresh_guard(&self, user: &UserId) -> Arc<RefreshGuard> {
		let mut guards = self.refresh_guards.lock();

		guards.entry(user.clone()).or_default().clone()
	}

	// Drops the user's guard once no other caller holds it.
	fn release_refresh_guard(&self, user: &UserId, guard: Arc<RefreshGuard>) {
		let mut guards = self.refresh_guards.lock();

		if guards.get(user).is_some_and(|held| Arc::ptr_eq(held, &guard))
			&& Arc::strong_count(&guard) == 2
		{
			guards.remove(user);
		}
	}

	/// Number of users with a refresh guard currently allocated.
	pub fn active_refresh_guards(&self) -> usize {
		self.refresh_guards.lock().len()
	}
}
#[cfg(feature = "reqwest")]
impl RequestPipeline<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a pipeline backed by the default reqwest transport.
	pub fn new(config: ClientConfig) -> Self {
		Self::with_http_client(config, ReqwestHttpClient::default(), ReqwestTransportErrorMapper)
	}
}
impl<C, M> Clone for RequestPipeline<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			transport_mapper: self.transport_mapper.clone(),
			metrics: self.metrics.clone(),
			config: self.config.clone(),
			cache: self.cache.clone(),
			refresh_guards: self.refresh_guards.clone(),
		}
	}
}
impl<C, M> Debug for RequestPipeline<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestPipeline")
			.field("base_url", &self.config.base_url.as_str())
			.field("client_id", &self.config.client_id)
			.field("client_secret_set", &self.config.client_secret.is_some())
			.field("cache_enabled", &self.cache.is_some())
			.field("metrics", &self.metrics)
			.finish()
	}
}

enum Served {
	Cache(Value),
	Network(Value),
}
impl Served {
	fn into_value(self) -> Value {
		match self {
			Served::Cache(value) | Served::Network(value) => value,
		}
	}
}

/// Decodes a success body; blank bodies decode to `null`.
fn decode_body(status: u16, body: &[u8]) -> Result<Value> {
	if body.iter().all(u8::is_ascii_whitespace) {
		return Ok(Value::Null);
	}

	serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_slice(body))
		.map_err(|source| Error::Decode { source, status: Some(status) })
}
