//! Endpoint facade over [`RequestPipeline`].
//!
//! [`RemoteAuthClient`] maps named RemoteAuth operations to URL templates and verbs.
//! Every method resolves to a single [`RequestPipeline::execute`] call, so caching and
//! refresh behavior is identical regardless of which entry point is used.

// self
use crate::{
	_prelude::*,
	auth::TokenOwner,
	error::ConfigError,
	http::{ApiHttpClient, TransportErrorMapper},
	pipeline::RequestPipeline,
	request::RequestDescriptor,
};
#[cfg(feature = "reqwest")]
use crate::{
	config::ClientConfig,
	http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
};

const APPLICATION_MEMBERS_BY_TOKEN: &str = "users/applicationMembers/byToken";
const APPLICATION_MEMBERS: &str = "applicationMembers";
const TEAMS: &str = "teams";

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport stack.
pub type ReqwestRemoteAuth = RemoteAuthClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Named RemoteAuth endpoints plus generic verb helpers.
pub struct RemoteAuthClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pipeline: RequestPipeline<C, M>,
}
impl<C, M> RemoteAuthClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Wraps an existing pipeline.
	pub fn new(pipeline: RequestPipeline<C, M>) -> Self {
		Self { pipeline }
	}

	/// Returns the underlying pipeline.
	pub fn pipeline(&self) -> &RequestPipeline<C, M> {
		&self.pipeline
	}

	/// Resolves `path` to `{base_url}/api/v1/{path}`.
	pub fn url(&self, path: &str) -> Result<Url, ConfigError> {
		self.pipeline.config().api_url(path)
	}

	/// Executes an arbitrary descriptor.
	pub async fn execute(
		&self,
		descriptor: RequestDescriptor,
		owner: &dyn TokenOwner,
	) -> Result<Value> {
		self.pipeline.execute(descriptor, owner).await
	}

	/// GET `{base_url}/api/v1/{path}`.
	pub async fn get(&self, path: &str, owner: &dyn TokenOwner) -> Result<Value> {
		self.execute(RequestDescriptor::get(self.url(path)?), owner).await
	}

	/// POST `payload` to `{base_url}/api/v1/{path}`.
	pub async fn post(&self, path: &str, owner: &dyn TokenOwner, payload: Value) -> Result<Value> {
		self.execute(RequestDescriptor::post(self.url(path)?, payload), owner).await
	}

	/// PUT `payload` to `{base_url}/api/v1/{path}`.
	pub async fn put(&self, path: &str, owner: &dyn TokenOwner, payload: Value) -> Result<Value> {
		self.execute(RequestDescriptor::put(self.url(path)?, payload), owner).await
	}

	/// DELETE `{base_url}/api/v1/{path}`.
	pub async fn delete(&self, path: &str, owner: &dyn TokenOwner) -> Result<Value> {
		self.execute(RequestDescriptor::delete(self.url(path)?), owner).await
	}

	/// Application memberships bound to the owner's access token.
	pub async fn application_members(&self, owner: &dyn TokenOwner) -> Result<Value> {
		self.get(APPLICATION_MEMBERS_BY_TOKEN, owner).await
	}

	/// Teams visible to the owner.
	pub async fn teams(&self, owner: &dyn TokenOwner) -> Result<Value> {
		self.get(TEAMS, owner).await
	}

	/// Creates an application membership.
	pub async fn create_application_member(
		&self,
		owner: &dyn TokenOwner,
		payload: Value,
	) -> Result<Value> {
		self.post(APPLICATION_MEMBERS, owner, payload).await
	}

	/// Updates the application membership `id`.
	pub async fn update_application_member(
		&self,
		id: &str,
		owner: &dyn TokenOwner,
		payload: Value,
	) -> Result<Value> {
		let url = self.member_url(id)?;

		self.execute(RequestDescriptor::put(url, payload), owner).await
	}

	/// Deletes the application membership `id`.
	pub async fn delete_application_member(
		&self,
		id: &str,
		owner: &dyn TokenOwner,
	) -> Result<Value> {
		let url = self.member_url(id)?;

		self.execute(RequestDescriptor::delete(url), owner).await
	}

	// `id` is pushed as a single percent-encoded segment.
	fn member_url(&self, id: &str) -> Result<Url, ConfigError> {
		let mut url = self.url(APPLICATION_MEMBERS)?;
		let raw = url.to_string();

		url.path_segments_mut()
			.map_err(|_| ConfigError::InvalidUrl {
				url: raw,
				source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
			})?
			.push(id);

		Ok(url)
	}
}
#[cfg(feature = "reqwest")]
impl RemoteAuthClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a client backed by the default reqwest transport and no cache.
	pub fn from_config(config: ClientConfig) -> Self {
		Self::new(RequestPipeline::new(config))
	}
}
impl<C, M> Clone for RemoteAuthClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self { pipeline: self.pipeline.clone() }
	}
}
impl<C, M> Debug for RemoteAuthClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RemoteAuthClient").field("pipeline", &self.pipeline).finish()
	}
}
