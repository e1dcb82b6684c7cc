//! Deduplication of identical concurrent POST calls.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use futures_util::future::{FutureExt, Shared, WeakShared};
use serde_json::Value;
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	http::{ApiRequest, ApiResponse, RequestBody},
	obs::{self, Outcome, Stage},
};

type CallFuture = Pin<Box<dyn Future<Output = Result<ApiResponse>> + Send>>;
type SharedCall = Shared<CallFuture>;

/// Fingerprint of a coalescable call: method, normalized path, sorted query, and canonical
/// JSON body.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CoalesceKey(String);
impl CoalesceKey {
	/// Derives the key for an already normalized request; multipart uploads have none.
	pub fn for_request(request: &ApiRequest) -> Option<Self> {
		if request.body.is_multipart() {
			return None;
		}

		let body = match &request.body {
			RequestBody::Json(value) => canonical_json(value),
			_ => "{}".to_owned(),
		};
		let mut query = request.query.iter().collect::<Vec<_>>();

		query.sort();

		let mut hasher = Sha256::new();

		hasher.update(request.method.as_str().as_bytes());
		hasher.update([0]);
		hasher.update(request.path.as_bytes());
		hasher.update([0]);

		for (key, value) in query {
			hasher.update(key.as_bytes());
			hasher.update(b"=");
			hasher.update(value.as_bytes());
			hasher.update(b"&");
		}

		hasher.update([0]);
		hasher.update(body.as_bytes());

		Some(Self(URL_SAFE_NO_PAD.encode(hasher.finalize())))
	}

	/// Encoded digest, safe to log.
	pub fn fingerprint(&self) -> &str {
		&self.0
	}
}

/// Serializes JSON with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> String {
	let mut out = String::new();

	write_canonical(value, &mut out);

	out
}

fn write_canonical(value: &Value, out: &mut String) {
	match value {
		Value::Object(map) => {
			let mut entries = map.iter().collect::<Vec<_>>();

			entries.sort_by(|(a, _), (b, _)| a.cmp(b));
			out.push('{');

			for (i, (key, value)) in entries.into_iter().enumerate() {
				if i > 0 {
					out.push(',');
				}

				out.push_str(&Value::String(key.clone()).to_string());
				out.push(':');
				write_canonical(value, out);
			}

			out.push('}');
		},
		Value::Array(items) => {
			out.push('[');

			for (i, item) in items.iter().enumerate() {
				if i > 0 {
					out.push(',');
				}

				write_canonical(item, out);
			}

			out.push(']');
		},
		scalar => out.push_str(&scalar.to_string()),
	}
}

struct InFlight {
	id: u64,
	call: WeakShared<CallFuture>,
}

type Registry = Arc<Mutex<HashMap<CoalesceKey, InFlight>>>;

/// Registry of in-flight coalescable calls.
///
/// The registry only holds weak handles; an entry disappears when its call settles or when
/// every caller waiting on it has been dropped.
#[derive(Clone, Default)]
pub struct RequestCoalescer {
	registry: Registry,
	next_id: Arc<AtomicU64>,
	joins: Arc<AtomicU64>,
}
impl RequestCoalescer {
	/// Creates an empty coalescer.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of calls currently in flight.
	pub fn in_flight(&self) -> usize {
		self.registry.lock().len()
	}

	/// Returns true if a call with `key` is in flight.
	pub fn contains(&self, key: &CoalesceKey) -> bool {
		self.registry.lock().contains_key(key)
	}

	/// Number of callers that joined an existing call instead of starting one.
	pub fn joins(&self) -> u64 {
		self.joins.load(Ordering::Relaxed)
	}

	/// Joins the in-flight call for `key`, or starts one with `start`.
	///
	/// Registration happens immediately, before the returned future is first polled. Every
	/// caller observes the same outcome, success or failure.
	pub fn run<F, Fut>(
		&self,
		key: CoalesceKey,
		start: F,
	) -> impl Future<Output = Result<ApiResponse>> + Send + use<F, Fut>
	where
		F: FnOnce() -> Fut,
		Fut: 'static + Send + Future<Output = Result<ApiResponse>>,
	{
		self.join_or_start(key, start)
	}

	fn join_or_start<F, Fut>(&self, key: CoalesceKey, start: F) -> SharedCall
	where
		F: FnOnce() -> Fut,
		Fut: 'static + Send + Future<Output = Result<ApiResponse>>,
	{
		let mut registry = self.registry.lock();

		if let Some(call) = registry.get(&key).and_then(|entry| entry.call.upgrade()) {
			self.joins.fetch_add(1, Ordering::Relaxed);
			obs::record_stage(Stage::Coalesce, Outcome::Joined);
			obs::coalesced(key.fingerprint());

			return call;
		}

		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let release = Release { registry: Arc::clone(&self.registry), key: key.clone(), id };
		let fut = start();
		let call: CallFuture = Box::pin(async move {
			let _release = release;

			fut.await
		});
		let call = call.shared();

		if let Some(weak) = call.downgrade() {
			registry.insert(key, InFlight { id, call: weak });
		}

		obs::record_stage(Stage::Coalesce, Outcome::Attempt);

		call
	}
}
impl Debug for RequestCoalescer {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("RequestCoalescer")
			.field("in_flight", &self.in_flight())
			.field("joins", &self.joins())
			.finish()
	}
}

// Removes the registry entry once the call settles or is abandoned; a newer call registered
// under the same key is left alone.
struct Release {
	registry: Registry,
	key: CoalesceKey,
	id: u64,
}
impl Drop for Release {
	fn drop(&mut self) {
		let mut registry = self.registry.lock();

		if registry.get(&self.key).is_some_and(|entry| entry.id == self.id) {
			registry.remove(&self.key);
		}
	}
}
