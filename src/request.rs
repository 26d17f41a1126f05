//! Request descriptors consumed by the pipeline.

// self
use crate::_prelude::*;

/// HTTP verbs supported by the remote API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// Read-only fetch; the only cacheable verb.
	Get,
	/// Create.
	Post,
	/// Replace/update.
	Put,
	/// Delete.
	Delete,
}
impl Method {
	/// Returns the wire name of the verb.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Delete => "DELETE",
		}
	}

	pub(crate) fn to_http(self) -> oauth2::http::Method {
		match self {
			Method::Get => oauth2::http::Method::GET,
			Method::Post => oauth2::http::Method::POST,
			Method::Put => oauth2::http::Method::PUT,
			Method::Delete => oauth2::http::Method::DELETE,
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One logical API call: verb, absolute URL, optional JSON payload, cache policy.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestDescriptor {
	/// HTTP verb.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Optional JSON payload.
	pub payload: Option<Value>,
	/// Skips the cache lookup when true. Successful GETs still refresh the entry.
	pub ignore_cache: bool,
}
impl RequestDescriptor {
	/// Creates a descriptor without payload.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, payload: None, ignore_cache: false }
	}

	/// Shorthand for a GET descriptor.
	pub fn get(url: Url) -> Self {
		Self::new(Method::Get, url)
	}

	/// Shorthand for a POST descriptor carrying `payload`.
	pub fn post(url: Url, payload: Value) -> Self {
		Self::new(Method::Post, url).with_payload(payload)
	}

	/// Shorthand for a PUT descriptor carrying `payload`.
	pub fn put(url: Url, payload: Value) -> Self {
		Self::new(Method::Put, url).with_payload(payload)
	}

	/// Shorthand for a DELETE descriptor.
	pub fn delete(url: Url) -> Self {
		Self::new(Method::Delete, url)
	}

	/// Attaches a JSON payload.
	pub fn with_payload(mut self, payload: Value) -> Self {
		self.payload = Some(payload);

		self
	}

	/// Bypasses the cache lookup for this call.
	pub fn ignore_cache(mut self) -> Self {
		self.ignore_cache = true;

		self
	}

	/// Returns `true` for verbs whose responses populate the cache.
	pub fn is_cacheable(&self) -> bool {
		self.method == Method::Get
	}

	/// Returns the payload when it should be sent as a request body.
	///
	/// `null`, `{}`, and `[]` count as empty and are omitted.
	pub fn body(&self) -> Option<&Value> {
		self.payload.as_ref().filter(|payload| match payload {
			Value::Null => false,
			Value::Object(map) => !map.is_empty(),
			Value::Array(items) => !items.is_empty(),
			_ => true,
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use serde_json::json;

	fn url() -> Url {
		Url::parse("https://app.remoteauth.com/api/v1/teams").expect("Fixture URL should parse.")
	}

	#[test]
	fn empty_payloads_are_not_sent() {
		assert_eq!(RequestDescriptor::get(url()).body(), None);
		assert_eq!(RequestDescriptor::post(url(), Value::Null).body(), None);
		assert_eq!(RequestDescriptor::post(url(), json!({})).body(), None);
		assert_eq!(RequestDescriptor::put(url(), json!([])).body(), None);
		assert_eq!(
			RequestDescriptor::post(url(), json!({ "name": "ops" })).body(),
			Some(&json!({ "name": "ops" }))
		);
		assert_eq!(RequestDescriptor::post(url(), json!(false)).body(), Some(&json!(false)));
	}

	#[test]
	fn only_get_is_cacheable() {
		assert!(RequestDescriptor::get(url()).is_cacheable());
		assert!(RequestDescriptor::get(url()).ignore_cache().is_cacheable());
		assert!(!RequestDescriptor::post(url(), json!({ "a": 1 })).is_cacheable());
		assert!(!RequestDescriptor::delete(url()).is_cacheable());
	}

	#[test]
	fn methods_render_wire_names() {
		assert_eq!(Method::Delete.to_string(), "DELETE");
		assert_eq!(Method::Put.to_http(), oauth2::http::Method::PUT);
		assert_eq!(
			serde_json::to_string(&Method::Get).expect("Method should serialize."),
			"\"GET\""
		);
	}
}
