//! Token owner contract implemented by the embedding application.

// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, UserId},
};

/// Boxed future returned by [`TokenOwner::on_token_refreshed`].
pub type OwnerFuture<'a> = Pin<Box<dyn Future<Output = Result<(), OwnerError>> + 'a + Send>>;

/// Capability object that supplies credentials for one authenticated user.
///
/// The SDK never stores credentials. It reads the current tokens right before each
/// dispatch and hands renewed tokens back through [`on_token_refreshed`], which must
/// persist them before its future resolves so the retried request observes the new
/// access token.
///
/// [`on_token_refreshed`]: TokenOwner::on_token_refreshed
pub trait TokenOwner
where
	Self: Send + Sync,
{
	/// Stable identifier used for cache fingerprints and refresh coordination.
	fn user_id(&self) -> &UserId;

	/// Current bearer token.
	fn access_token(&self) -> TokenSecret;

	/// Current refresh token.
	fn refresh_token(&self) -> TokenSecret;

	/// Expiry of the current access token.
	///
	/// Informational only: expiry is discovered reactively through HTTP 401.
	fn access_token_expiration(&self) -> OffsetDateTime;

	/// Persists renewed credentials. Invoked exactly once per successful refresh.
	fn on_token_refreshed(&self, tokens: RefreshedTokens) -> OwnerFuture<'_>;
}

/// Credentials issued by the token endpoint during a refresh.
///
/// Fields beyond the three below (for example an `id`) are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RefreshedTokens {
	/// New bearer token.
	pub access_token: TokenSecret,
	/// New refresh token.
	pub refresh_token: TokenSecret,
	/// Lifetime of the new access token in seconds.
	pub expires_in: i64,
}
impl RefreshedTokens {
	/// Absolute expiry relative to `now`.
	pub fn expires_at(&self, now: OffsetDateTime) -> OffsetDateTime {
		now.saturating_add(Duration::seconds(self.expires_in))
	}
}

/// Error produced by [`TokenOwner`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum OwnerError {
	/// Renewed credentials could not be persisted.
	#[error("Failed to persist refreshed tokens: {message}.")]
	Persist {
		/// Human-readable error payload.
		message: String,
	},
}
