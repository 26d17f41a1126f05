//! Response cache contract, request fingerprints, and the built-in memory cache.

pub mod memory;

pub use memory::MemoryCache;

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::UserId, request::Method};

/// Boxed future returned by [`ResponseCache`] operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Key/value store for decoded GET responses, supplied by the embedding application.
///
/// The pipeline consults the cache with [`has`](Self::has) followed by
/// [`get`](Self::get) and writes successful GET bodies with [`set`](Self::set). No
/// locking is performed around these calls.
pub trait ResponseCache
where
	Self: Send + Sync,
{
	/// Returns `true` if a live entry exists for `key`.
	fn has<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, bool>;

	/// Returns the live entry for `key`, if any.
	fn get<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, Option<Value>>;

	/// Stores `value` under `key` for `ttl`.
	fn set<'a>(&'a self, key: &'a CacheKey, value: Value, ttl: Duration) -> CacheFuture<'a, ()>;
}

/// Error type produced by [`ResponseCache`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CacheError {
	/// Serialization failures surfaced by the backend.
	#[error("Cache serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure.
	#[error("Cache backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Deterministic fingerprint of `(user, method, url, payload)`.
///
/// Each component is length-prefixed before hashing so field boundaries cannot
/// collide, and payload objects are hashed with sorted keys. The SHA-256 digest is
/// encoded as URL-safe base64 without padding.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);
impl CacheKey {
	/// Computes the fingerprint for a request issued on behalf of `user`.
	pub fn fingerprint(user: &UserId, method: Method, url: &Url, payload: Option<&Value>) -> Self {
		let mut hasher = Sha256::new();

		absorb(&mut hasher, user.as_bytes());
		absorb(&mut hasher, method.as_str().as_bytes());
		absorb(&mut hasher, url.as_str().as_bytes());

		match payload {
			Some(payload) => {
				let mut canonical = String::new();

				write_canonical(payload, &mut canonical);
				hasher.update([1_u8]);
				absorb(&mut hasher, canonical.as_bytes());
			},
			None => hasher.update([0_u8]),
		}

		Self(URL_SAFE_NO_PAD.encode(hasher.finalize()))
	}

	/// Returns the encoded fingerprint.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for CacheKey {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Debug for CacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "CacheKey({})", self.0)
	}
}
impl Display for CacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

fn absorb(hasher: &mut Sha256, bytes: &[u8]) {
	hasher.update((bytes.len() as u64).to_be_bytes());
	hasher.update(bytes);
}

// Object keys are sorted regardless of serde_json's `preserve_order` feature.
fn write_canonical(value: &Value, buf: &mut String) {
	match value {
		Value::Array(items) => {
			buf.push('[');

			for (idx, item) in items.iter().enumerate() {
				if idx > 0 {
					buf.push(',');
				}

				write_canonical(item, buf);
			}

			buf.push(']');
		},
		Value::Object(map) => {
			let mut entries = map.iter().collect::<Vec<_>>();

			entries.sort_by(|(a, _), (b, _)| a.cmp(b));
			buf.push('{');

			for (idx, (key, item)) in entries.into_iter().enumerate() {
				if idx > 0 {
					buf.push(',');
				}

				buf.push_str(&Value::String(key.clone()).to_string());
				buf.push(':');
				write_canonical(item, buf);
			}

			buf.push('}');
		},
		scalar => buf.push_str(&scalar.to_string()),
	}
}
