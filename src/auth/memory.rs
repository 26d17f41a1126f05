//! Thread-safe in-memory [`TokenOwner`] for demos and tests.

// self
use crate::{
	_prelude::*,
	auth::{OwnerFuture, RefreshedTokens, TokenOwner, TokenSecret, UserId},
};

/// Credentials snapshot held by [`MemoryTokenOwner`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
	/// Current bearer token.
	pub access_token: TokenSecret,
	/// Current refresh token.
	pub refresh_token: TokenSecret,
	/// Expiry of the bearer token.
	pub expires_at: OffsetDateTime,
}

/// Token owner that keeps credentials in-process and records every refresh.
#[derive(Clone, Debug)]
pub struct MemoryTokenOwner {
	user_id: UserId,
	credentials: Arc<RwLock<Credentials>>,
	refreshes: Arc<Mutex<Vec<RefreshedTokens>>>,
}
impl MemoryTokenOwner {
	/// Creates an owner for `user_id` seeded with the provided tokens.
	pub fn new(
		user_id: UserId,
		access_token: impl Into<TokenSecret>,
		refresh_token: impl Into<TokenSecret>,
		expires_at: OffsetDateTime,
	) -> Self {
		Self {
			user_id,
			credentials: Arc::new(RwLock::new(Credentials {
				access_token: access_token.into(),
				refresh_token: refresh_token.into(),
				expires_at,
			})),
			refreshes: Default::default(),
		}
	}

	/// Returns a copy of the current credentials.
	pub fn credentials(&self) -> Credentials {
		self.credentials.read().clone()
	}

	/// Returns every refresh observed so far, oldest first.
	pub fn refreshes(&self) -> Vec<RefreshedTokens> {
		self.refreshes.lock().clone()
	}

	fn apply(&self, tokens: RefreshedTokens) {
		let expires_at = tokens.expires_at(OffsetDateTime::now_utc());

		{
			let mut credentials = self.credentials.write();

			credentials.access_token = tokens.access_token.clone();
			credentials.refresh_token = tokens.refresh_token.clone();
			credentials.expires_at = expires_at;
		}

		self.refreshes.lock().push(tokens);
	}
}
impl TokenOwner for MemoryTokenOwner {
	fn user_id(&self) -> &UserId {
		&self.user_id
	}

	fn access_token(&self) -> TokenSecret {
		self.credentials.read().access_token.clone()
	}

	fn refresh_token(&self) -> TokenSecret {
		self.credentials.read().refresh_token.clone()
	}

	fn access_token_expiration(&self) -> OffsetDateTime {
		self.credentials.read().expires_at
	}

	fn on_token_refreshed(&self, tokens: RefreshedTokens) -> OwnerFuture<'_> {
		self.apply(tokens);

		Box::pin(async { Ok(()) })
	}
}
