//! Construction-time client configuration.
//!
//! [`ClientConfig`] is static for the lifetime of a pipeline. It can be assembled with
//! [`ClientConfigBuilder`] or deserialized from the application's own config files;
//! either way [`ClientConfig::validate`] enforces the same rules.

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Default RemoteAuth deployment.
pub const DEFAULT_BASE_URL: &str = "https://app.remoteauth.com";
/// Default lifetime of cached GET responses.
pub const DEFAULT_CACHE_TTL: Duration = Duration::hours(1);

const API_PREFIX: &str = "api/v1";
const TOKEN_PATH: &str = "oauth/token";

/// Static settings shared by every call a pipeline makes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Root of the RemoteAuth deployment.
	#[serde(default = "default_base_url")]
	pub base_url: Url,
	/// OAuth client identifier sent with refresh exchanges.
	pub client_id: String,
	/// OAuth client secret sent with refresh exchanges.
	#[serde(default)]
	pub client_secret: Option<TokenSecret>,
	/// Scope requested during refresh exchanges.
	#[serde(default)]
	pub scope: String,
	/// Lifetime of cached GET responses.
	#[serde(default = "default_cache_ttl")]
	pub cache_ttl: Duration,
}
impl ClientConfig {
	/// Returns a builder seeded with the defaults.
	pub fn builder() -> ClientConfigBuilder {
		ClientConfigBuilder::default()
	}

	/// Checks the invariants enforced by [`ClientConfigBuilder::build`].
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.client_id.trim().is_empty() {
			return Err(ConfigError::MissingClientId);
		}
		if self.cache_ttl.is_negative() {
			return Err(ConfigError::NegativeCacheTtl);
		}
		if self.base_url.cannot_be_a_base() || self.base_url.host().is_none() {
			return Err(ConfigError::InvalidUrl {
				url: self.base_url.to_string(),
				source: url::ParseError::EmptyHost,
			});
		}
		if self.base_url.scheme() != "https" && !is_loopback(&self.base_url) {
			return Err(ConfigError::InsecureBaseUrl { url: self.base_url.to_string() });
		}

		Ok(())
	}

	/// Resolves `path` under `{base_url}/api/v1/`.
	pub fn api_url(&self, path: &str) -> Result<Url, ConfigError> {
		self.join(&format!("{API_PREFIX}/{}", path.trim_start_matches('/')))
	}

	/// Returns `{base_url}/oauth/token`.
	pub fn token_url(&self) -> Result<Url, ConfigError> {
		self.join(TOKEN_PATH)
	}

	fn join(&self, path: &str) -> Result<Url, ConfigError> {
		let raw = format!("{}/{path}", self.base_url.as_str().trim_end_matches('/'));

		Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { url: raw, source })
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	base_url: Option<Url>,
	client_id: Option<String>,
	client_secret: Option<TokenSecret>,
	scope: String,
	cache_ttl: Duration,
}
impl ClientConfigBuilder {
	/// Overrides the deployment root (defaults to [`DEFAULT_BASE_URL`]).
	pub fn base_url(mut self, url: Url) -> Self {
		self.base_url = Some(url);

		self
	}

	/// Sets the OAuth client identifier.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());

		self
	}

	/// Sets the OAuth client secret.
	pub fn client_secret(mut self, secret: impl Into<TokenSecret>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Sets the scope requested during refresh exchanges.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = scope.into();

		self
	}

	/// Overrides the cache lifetime (defaults to one hour).
	pub fn cache_ttl(mut self, ttl: Duration) -> Self {
		self.cache_ttl = ttl;

		self
	}

	/// Validates and produces the configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let config = ClientConfig {
			base_url: self.base_url.unwrap_or_else(default_base_url),
			client_id: self.client_id.ok_or(ConfigError::MissingClientId)?,
			client_secret: self.client_secret,
			scope: self.scope,
			cache_ttl: self.cache_ttl,
		};

		config.validate()?;

		Ok(config)
	}
}
impl Default for ClientConfigBuilder {
	fn default() -> Self {
		Self {
			base_url: None,
			client_id: None,
			client_secret: None,
			scope: String::new(),
			cache_ttl: DEFAULT_CACHE_TTL,
		}
	}
}

fn default_base_url() -> Url {
	Url::parse(DEFAULT_BASE_URL).expect("Default base URL is a valid literal.")
}

fn default_cache_ttl() -> Duration {
	DEFAULT_CACHE_TTL
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
		Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
		None => false,
	}
}
