#![cfg(feature = "reqwest")]

// std
use std::sync::atomic::{AtomicUsize, Ordering};
// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use remoteauth::{
	_preludet::*,
	cache::{CacheError, CacheFuture, CacheKey, MemoryCache, ResponseCache},
	request::RequestDescriptor,
};

#[derive(Default)]
struct RecordingCache {
	inner: MemoryCache,
	reads: AtomicUsize,
	writes: AtomicUsize,
}
impl RecordingCache {
	fn reads(&self) -> usize {
		self.reads.load(Ordering::SeqCst)
	}

	fn writes(&self) -> usize {
		self.writes.load(Ordering::SeqCst)
	}
}
impl ResponseCache for RecordingCache {
	fn has<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, bool> {
		self.reads.fetch_add(1, Ordering::SeqCst);
		self.inner.has(key)
	}

	fn get<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, Option<Value>> {
		self.reads.fetch_add(1, Ordering::SeqCst);
		self.inner.get(key)
	}

	fn set<'a>(&'a self, key: &'a CacheKey, value: Value, ttl: Duration) -> CacheFuture<'a, ()> {
		self.writes.fetch_add(1, Ordering::SeqCst);
		self.inner.set(key, value, ttl)
	}
}

#[derive(Clone, Copy, PartialEq)]
enum Broken {
	Lookup,
	Store,
}

struct BrokenCache(Broken);
impl BrokenCache {
	fn fail<'a, T>(&self) -> CacheFuture<'a, T>
	where
		T: 'a + Send,
	{
		Box::pin(async { Err(CacheError::Backend { message: "redis down".into() }) })
	}
}
impl ResponseCache for BrokenCache {
	fn has<'a>(&'a self, _key: &'a CacheKey) -> CacheFuture<'a, bool> {
		if self.0 == Broken::Lookup {
			return self.fail();
		}

		Box::pin(async { Ok(false) })
	}

	fn get<'a>(&'a self, _key: &'a CacheKey) -> CacheFuture<'a, Option<Value>> {
		if self.0 == Broken::Lookup {
			return self.fail();
		}

		Box::pin(async { Ok(None) })
	}

	fn set<'a>(&'a self, _key: &'a CacheKey, _value: Value, _ttl: Duration) -> CacheFuture<'a, ()> {
		if self.0 == Broken::Store {
			return self.fail();
		}

		Box::pin(async { Ok(()) })
	}
}

fn api_url(server: &MockServer, path: &str) -> Url {
	Url::parse(&server.url(format!("/api/v1/{path}"))).expect("Mock API URL should parse.")
}

#[tokio::test]
async fn uncached_get_returns_body_verbatim() {
	let server = MockServer::start_async().await;
	let pipeline = build_reqwest_test_pipeline(&server.base_url());
	let owner = test_owner("user-plain", "A1", "R1");
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/v1/teams")
				.header("authorization", "Bearer A1")
				.header("accept", "application/json");
			then.status(200).header("content-type", "application/json").body("{\"id\":\"t1\"}");
		})
		.await;
	let value = pipeline
		.execute(RequestDescriptor::get(api_url(&server, "teams")), &owner)
		.await
		.expect("GET should succeed.");

	assert_eq!(value, json!({ "id": "t1" }));

	mock.assert_async().await;
	assert!(pipeline.cache().is_none());
	assert_eq!(pipeline.metrics.cache_hits(), 0);
}

#[tokio::test]
async fn fresh_cache_entry_skips_network() {
	let server = MockServer::start_async().await;
	let (pipeline, cache) = build_cached_test_pipeline(&server.base_url());
	let owner = test_owner("user-cached", "A1", "R1");
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/teams");
			then.status(200).header("content-type", "application/json").body("[{\"id\":\"t1\"}]");
		})
		.await;
	let descriptor = RequestDescriptor::get(api_url(&server, "teams"));
	let first = pipeline
		.execute(descriptor.clone(), &owner)
		.await
		.expect("First GET should succeed.");
	let second =
		pipeline.execute(descriptor.clone(), &owner).await.expect("Cached GET should succeed.");

	assert_eq!(first, json!([{ "id": "t1" }]));
	assert_eq!(second, first);

	mock.assert_calls_async(1).await;
	assert_eq!(cache.len(), 1);
	assert!(cache.contains_at(&pipeline.cache_key(&owner, &descriptor), OffsetDateTime::now_utc()));
	assert_eq!(pipeline.metrics.cache_hits(), 1);
	assert_eq!(pipeline.metrics.requests(), 2);
}

#[tokio::test]
async fn ignore_cache_bypasses_read_but_refreshes_entry() {
	let server = MockServer::start_async().await;
	let (pipeline, cache) = build_cached_test_pipeline(&server.base_url());
	let owner = test_owner("user-bypass", "A1", "R1");
	let descriptor = RequestDescriptor::get(api_url(&server, "teams"));
	let key = pipeline.cache_key(&owner, &descriptor);

	cache.set(&key, json!("stale"), Duration::hours(1)).await.expect("Seeding should succeed.");

	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/teams");
			then.status(200).header("content-type", "application/json").body("\"fresh\"");
		})
		.await;
	let value = pipeline
		.execute(descriptor.clone().ignore_cache(), &owner)
		.await
		.expect("Bypassing GET should succeed.");

	assert_eq!(value, json!("fresh"));

	mock.assert_calls_async(1).await;
	assert_eq!(cache.get(&key).await.expect("Lookup should succeed."), Some(json!("fresh")));
}

#[tokio::test]
async fn cache_entries_are_partitioned_per_user() {
	let server = MockServer::start_async().await;
	let (pipeline, cache) = build_cached_test_pipeline(&server.base_url());
	let alice = test_owner("user-alice", "A1", "R1");
	let bob = test_owner("user-bob", "B1", "S1");
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/users/applicationMembers/byToken");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let descriptor =
		RequestDescriptor::get(api_url(&server, "users/applicationMembers/byToken"));

	pipeline.execute(descriptor.clone(), &alice).await.expect("Alice should succeed.");
	pipeline.execute(descriptor, &bob).await.expect("Bob should succeed.");

	mock.assert_calls_async(2).await;
	assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn writes_never_touch_the_cache() {
	let server = MockServer::start_async().await;
	let recording = Arc::new(RecordingCache::default());
	let cache: Arc<dyn ResponseCache> = recording.clone();
	let pipeline = build_reqwest_test_pipeline(&server.base_url()).with_cache(cache);
	let owner = test_owner("user-writes", "A1", "R1");
	let post = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/v1/applicationMembers")
				.header("content-type", "application/json")
				.json_body(json!({ "email": "ops@example.com" }));
			then.status(201).header("content-type", "application/json").body("{\"id\":\"m1\"}");
		})
		.await;
	let put = server
		.mock_async(|when, then| {
			when.method(PUT).path("/api/v1/applicationMembers/m1");
			then.status(200).header("content-type", "application/json").body("{\"id\":\"m1\"}");
		})
		.await;
	let delete = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/api/v1/applicationMembers/m1");
			then.status(204);
		})
		.await;
	let created = pipeline
		.execute(
			RequestDescriptor::post(
				api_url(&server, "applicationMembers"),
				json!({ "email": "ops@example.com" }),
			),
			&owner,
		)
		.await
		.expect("POST should succeed.");
	let updated = pipeline
		.execute(
			RequestDescriptor::put(api_url(&server, "applicationMembers/m1"), json!({ "role": 1 })),
			&owner,
		)
		.await
		.expect("PUT should succeed.");
	let deleted = pipeline
		.execute(RequestDescriptor::delete(api_url(&server, "applicationMembers/m1")), &owner)
		.await
		.expect("DELETE should succeed.");

	assert_eq!(created, json!({ "id": "m1" }));
	assert_eq!(updated, json!({ "id": "m1" }));
	assert_eq!(deleted, Value::Null);

	post.assert_async().await;
	put.assert_async().await;
	delete.assert_async().await;
	assert_eq!(recording.reads(), 0);
	assert_eq!(recording.writes(), 0);
	assert!(recording.inner.is_empty());
}

#[tokio::test]
async fn failed_get_is_not_cached() {
	let server = MockServer::start_async().await;
	let (pipeline, cache) = build_cached_test_pipeline(&server.base_url());
	let owner = test_owner("user-failure", "A1", "R1");

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/teams");
			then.status(404).body("Not Found");
		})
		.await;

	let err = pipeline
		.execute(RequestDescriptor::get(api_url(&server, "teams")), &owner)
		.await
		.expect_err("HTTP 404 should surface as an error.");

	assert_eq!(err.status(), Some(404));
	assert!(cache.is_empty());
}

#[tokio::test]
async fn cache_failures_propagate_from_get() {
	let server = MockServer::start_async().await;
	let owner = test_owner("user-broken-cache", "A1", "R1");
	let teams = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/teams");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;

	// Network calls are cumulative across both cases.
	for (broken, network_calls) in [(Broken::Lookup, 0), (Broken::Store, 1)] {
		let cache: Arc<dyn ResponseCache> = Arc::new(BrokenCache(broken));
		let pipeline = build_reqwest_test_pipeline(&server.base_url()).with_cache(cache);
		let err = pipeline
			.execute(RequestDescriptor::get(api_url(&server, "teams")), &owner)
			.await
			.expect_err("Cache failures should surface.");

		match err {
			Error::Cache(CacheError::Backend { message }) => assert_eq!(message, "redis down"),
			other => panic!("Unexpected error variant: {other:?}."),
		}

		teams.assert_calls_async(network_calls).await;
	}

	// Writes never consult the cache, so a broken backend does not affect them.
	let post = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/applicationMembers");
			then.status(201).header("content-type", "application/json").body("{\"id\":\"m1\"}");
		})
		.await;
	let cache: Arc<dyn ResponseCache> = Arc::new(BrokenCache(Broken::Lookup));
	let pipeline = build_reqwest_test_pipeline(&server.base_url()).with_cache(cache);

	pipeline
		.execute(
			RequestDescriptor::post(api_url(&server, "applicationMembers"), json!({ "a": 1 })),
			&owner,
		)
		.await
		.expect("POST should bypass the broken cache.");
	post.assert_async().await;
}
