// std
use std::{
	collections::VecDeque,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
	sync::Arc,
};
// crates.io
use parking_lot::Mutex;
use serde_json::{Value, json};
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use remoteauth::{
	auth::{MemoryTokenOwner, UserId},
	config::ClientConfig,
	error::{ConfigError, Error, TransportError},
	http::{ApiHttpClient, TransportErrorMapper},
	oauth2::{
		AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
		http::{HeaderMap, StatusCode, header},
	},
	pipeline::RequestPipeline,
	request::RequestDescriptor,
};

#[derive(Debug)]
enum FakeTransportError {
	ConnectionReset,
}
impl Display for FakeTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::ConnectionReset => write!(f, "Connection reset by peer."),
		}
	}
}
impl std::error::Error for FakeTransportError {}

enum Scripted {
	Respond(u16, &'static str),
	Fail,
}

#[derive(Clone, Debug)]
struct Recorded {
	method: String,
	uri: String,
	headers: HeaderMap,
	body: Vec<u8>,
}
impl Recorded {
	fn header(&self, name: header::HeaderName) -> Option<&str> {
		self.headers.get(name).and_then(|value| value.to_str().ok())
	}

	fn json(&self) -> Value {
		serde_json::from_slice(&self.body).expect("Recorded body should be JSON.")
	}
}

#[derive(Clone, Default)]
struct FakeHttpClient {
	script: Arc<Mutex<VecDeque<Scripted>>>,
	requests: Arc<Mutex<Vec<Recorded>>>,
}
impl FakeHttpClient {
	fn scripted(steps: impl IntoIterator<Item = Scripted>) -> Self {
		Self { script: Arc::new(Mutex::new(steps.into_iter().collect())), ..Default::default() }
	}

	fn requests(&self) -> Vec<Recorded> {
		self.requests.lock().clone()
	}
}
impl ApiHttpClient for FakeHttpClient {
	type Handle = FakeHttpHandle;
	type TransportError = FakeTransportError;

	fn handle(&self) -> Self::Handle {
		FakeHttpHandle(self.clone())
	}
}

struct FakeHttpHandle(FakeHttpClient);
impl<'a> AsyncHttpClient<'a> for FakeHttpHandle {
	type Error = HttpClientError<FakeTransportError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'a + Send>>;

	fn call(&'a self, request: HttpRequest) -> Self::Future {
		let step = self.0.script.lock().pop_front();

		self.0.requests.lock().push(Recorded {
			method: request.method().to_string(),
			uri: request.uri().to_string(),
			headers: request.headers().clone(),
			body: request.body().clone(),
		});

		Box::pin(async move {
			match step {
				Some(Scripted::Respond(status, body)) => {
					let mut response = HttpResponse::new(body.as_bytes().to_vec());

					*response.status_mut() =
						StatusCode::from_u16(status).expect("Scripted status should be valid.");

					Ok(response)
				},
				Some(Scripted::Fail) =>
					Err(HttpClientError::Reqwest(Box::new(FakeTransportError::ConnectionReset))),
				None => Err(HttpClientError::Other("Script exhausted.".into())),
			}
		})
	}
}

#[derive(Clone, Default)]
struct RecordingTransportErrorMapper {
	seen: Arc<Mutex<Vec<String>>>,
}
impl TransportErrorMapper<FakeTransportError> for RecordingTransportErrorMapper {
	fn map_transport_error(&self, err: HttpClientError<FakeTransportError>) -> Error {
		self.seen.lock().push(err.to_string());

		match err {
			HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => TransportError::Other { message }.into(),
			other => TransportError::Other { message: format!("{other:?}") }.into(),
		}
	}
}

fn build_pipeline(
	http_client: FakeHttpClient,
	mapper: RecordingTransportErrorMapper,
) -> RequestPipeline<FakeHttpClient, RecordingTransportErrorMapper> {
	let config = ClientConfig::builder()
		.base_url(Url::parse("https://auth.example.com").expect("Fixture URL should parse."))
		.client_id("fake-client")
		.scope("members")
		.build()
		.expect("Fixture config should build.");

	RequestPipeline::with_http_client(config, http_client, mapper)
}

fn owner() -> MemoryTokenOwner {
	MemoryTokenOwner::new(
		UserId::new("user-fake").expect("Fixture user should be valid."),
		"A1",
		"R1",
		OffsetDateTime::now_utc() + Duration::hours(1),
	)
}

fn url(path: &str) -> Url {
	Url::parse(&format!("https://auth.example.com/api/v1/{path}"))
		.expect("Fixture URL should parse.")
}

#[tokio::test]
async fn requests_carry_bearer_and_json_headers() {
	let http_client = FakeHttpClient::scripted([
		Scripted::Respond(200, "{\"id\":\"m1\"}"),
		Scripted::Respond(200, ""),
	]);
	let pipeline = build_pipeline(http_client.clone(), Default::default());
	let owner = owner();

	pipeline
		.execute(
			RequestDescriptor::post(url("applicationMembers"), json!({ "email": "a@b.c" })),
			&owner,
		)
		.await
		.expect("POST should succeed.");

	let empty = pipeline
		.execute(RequestDescriptor::post(url("applicationMembers"), json!({})), &owner)
		.await
		.expect("POST with an empty payload should succeed.");

	assert_eq!(empty, Value::Null);

	let requests = http_client.requests();

	assert_eq!(requests.len(), 2);
	assert_eq!(requests[0].method, "POST");
	assert_eq!(requests[0].uri, "https://auth.example.com/api/v1/applicationMembers");
	assert_eq!(requests[0].header(header::AUTHORIZATION), Some("Bearer A1"));
	assert_eq!(requests[0].header(header::ACCEPT), Some("application/json"));
	assert_eq!(requests[0].header(header::CONTENT_TYPE), Some("application/json"));
	assert_eq!(requests[0].json(), json!({ "email": "a@b.c" }));
	assert!(requests[1].body.is_empty());
	assert_eq!(requests[1].header(header::CONTENT_TYPE), None);
}

#[tokio::test]
async fn refresh_exchange_targets_token_endpoint() {
	let http_client = FakeHttpClient::scripted([
		Scripted::Respond(401, ""),
		Scripted::Respond(200, "{\"access_token\":\"A2\",\"refresh_token\":\"R2\",\"expires_in\":60}"),
		Scripted::Respond(200, "{\"ok\":true}"),
	]);
	let pipeline = build_pipeline(http_client.clone(), Default::default());
	let owner = owner();
	let value = pipeline
		.execute(RequestDescriptor::get(url("teams")), &owner)
		.await
		.expect("Retried GET should succeed.");

	assert_eq!(value, json!({ "ok": true }));

	let requests = http_client.requests();

	assert_eq!(requests.len(), 3);
	assert_eq!(requests[1].uri, "https://auth.example.com/oauth/token");
	assert_eq!(requests[1].header(header::AUTHORIZATION), Some("Bearer A1"));
	assert_eq!(
		requests[1].json(),
		json!({
			"grant_type": "refresh_token",
			"refresh_token": "R1",
			"client_id": "fake-client",
			"client_secret": null,
			"scope": "members",
		})
	);
	assert_eq!(requests[2].header(header::AUTHORIZATION), Some("Bearer A2"));
	assert_eq!(owner.credentials().refresh_token.expose(), "R2");
}

#[tokio::test]
async fn transport_failures_are_mapped_and_not_retried() {
	let http_client = FakeHttpClient::scripted([Scripted::Fail]);
	let mapper = RecordingTransportErrorMapper::default();
	let pipeline = build_pipeline(http_client.clone(), mapper.clone());
	let err = pipeline
		.execute(RequestDescriptor::get(url("teams")), &owner())
		.await
		.expect_err("Transport failure should surface.");

	assert!(
		matches!(err, Error::Transport(TransportError::Network { .. })),
		"Unexpected error variant: {err:?}."
	);
	assert_eq!(http_client.requests().len(), 1);
	assert_eq!(mapper.seen.lock().len(), 1);
	assert_eq!(pipeline.metrics.refreshes(), 0);
}

#[tokio::test]
async fn malformed_success_body_reports_decode_error() {
	let http_client = FakeHttpClient::scripted([Scripted::Respond(200, "<html>")]);
	let pipeline = build_pipeline(http_client, Default::default());
	let err = pipeline
		.execute(RequestDescriptor::get(url("teams")), &owner())
		.await
		.expect_err("HTML bodies should fail to decode.");

	assert!(matches!(err, Error::Decode { status: Some(200), .. }), "Unexpected error: {err:?}.");
}
