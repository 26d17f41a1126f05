//! Demonstrates plugging a custom HTTP stack into the pipeline.
//!
//! 1. Implement [`ApiHttpClient`] so the pipeline can obtain an [`AsyncHttpClient`] handle
//!    per request.
//! 2. Provide a [`TransportErrorMapper`] that converts the transport's own error type.
//! 3. Pass both to [`RequestPipeline::with_http_client`].

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
};
// crates.io
use color_eyre::Result;
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use remoteauth::{
	auth::{MemoryTokenOwner, UserId},
	config::ClientConfig,
	error::{ConfigError, Error, TransportError},
	http::{ApiHttpClient, TransportErrorMapper},
	oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse, http::StatusCode},
	pipeline::RequestPipeline,
	request::RequestDescriptor,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = ClientConfig::builder()
		.base_url(Url::parse("https://auth.example.com")?)
		.client_id("demo-client")
		.build()?;
	let pipeline: RequestPipeline<OfflineHttpClient, OfflineTransportErrorMapper> =
		RequestPipeline::with_http_client(config, OfflineHttpClient, OfflineTransportErrorMapper);
	let owner = MemoryTokenOwner::new(
		UserId::new("demo-user")?,
		"demo-access",
		"demo-refresh",
		OffsetDateTime::now_utc() + Duration::hours(1),
	);
	let url = pipeline.config().api_url("users/applicationMembers/byToken")?;
	let members = pipeline.execute(RequestDescriptor::get(url), &owner).await?;

	println!("Members echoed by the offline transport: {members}.");

	let offline = pipeline.config().api_url("offline")?;

	match pipeline.execute(RequestDescriptor::get(offline), &owner).await {
		Err(Error::Transport(err)) => println!("Mapped transport failure: {err}."),
		other => println!("Unexpected outcome: {other:?}."),
	}

	Ok(())
}

#[derive(Debug)]
struct OfflineError;
impl Display for OfflineError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("Network is unreachable.")
	}
}
impl StdError for OfflineError {}

#[derive(Clone, Copy, Debug, Default)]
struct OfflineHttpClient;
impl ApiHttpClient for OfflineHttpClient {
	type Handle = OfflineHandle;
	type TransportError = OfflineError;

	fn handle(&self) -> Self::Handle {
		OfflineHandle
	}
}

#[derive(Clone, Copy, Debug)]
struct OfflineHandle;
impl<'c> AsyncHttpClient<'c> for OfflineHandle {
	type Error = HttpClientError<OfflineError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			if request.uri().path().ends_with("/offline") {
				return Err(HttpClientError::Reqwest(Box::new(OfflineError)));
			}

			let body = format!("[{{\"path\":\"{}\"}}]", request.uri().path());
			let mut response = HttpResponse::new(body.into_bytes());

			*response.status_mut() = StatusCode::OK;

			Ok(response)
		})
	}
}

#[derive(Clone, Copy, Debug, Default)]
struct OfflineTransportErrorMapper;
impl TransportErrorMapper<OfflineError> for OfflineTransportErrorMapper {
	fn map_transport_error(&self, err: HttpClientError<OfflineError>) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			other => TransportError::Other { message: other.to_string() }.into(),
		}
	}
}
