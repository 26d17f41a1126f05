//! Demonstrates listing teams with the default reqwest transport, an in-memory response
//! cache, and a token owner whose access token has already expired.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use remoteauth::{
	auth::{MemoryTokenOwner, UserId},
	cache::{MemoryCache, ResponseCache},
	client::ReqwestRemoteAuth,
	config::ClientConfig,
	pipeline::RequestPipeline,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/teams").header("authorization", "Bearer stale-access");
			then.status(401).body("{\"message\":\"Unauthenticated.\"}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"refresh_token\":\"demo-refresh\",\"expires_in\":3600}",
			);
		})
		.await;
	let teams = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/teams").header("authorization", "Bearer demo-access");
			then.status(200)
				.header("content-type", "application/json")
				.body("[{\"id\":\"t1\",\"name\":\"Platform\"}]");
		})
		.await;
	let config = ClientConfig::builder()
		.base_url(Url::parse(&server.base_url())?)
		.client_id("demo-client")
		.client_secret("demo-secret")
		.cache_ttl(Duration::minutes(5))
		.build()?;
	let cache: Arc<dyn ResponseCache> = Arc::new(MemoryCache::default());
	let client = ReqwestRemoteAuth::new(RequestPipeline::new(config).with_cache(cache));
	let owner = MemoryTokenOwner::new(
		UserId::new("demo-user")?,
		"stale-access",
		"stale-refresh",
		OffsetDateTime::now_utc() - Duration::minutes(1),
	);
	let first = client.teams(&owner).await?;
	let second = client.teams(&owner).await?;

	println!("Teams: {first}.");
	println!("Served from cache: {}.", first == second);
	println!("Renewed access token: {}.", owner.credentials().access_token.expose());

	expired.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
	teams.assert_calls_async(1).await;

	Ok(())
}
