// self
use crate::{_prelude::*, policy::Classification};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// Span covering one logical request, retries and renewal included.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a span tagged with the request's method, normalized path, and classification.
	pub fn new(method: &Method, path: &str, classification: Classification) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"portal_http.call",
				method = method.as_str(),
				path,
				classification = classification.as_str()
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (method, path, classification);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

pub(crate) fn classified(classification: Classification, has_credential: bool) {
	#[cfg(feature = "tracing")]
	tracing::debug!(classification = classification.as_str(), has_credential, "request classified");
	#[cfg(not(feature = "tracing"))]
	let _ = (classification, has_credential);
}

pub(crate) fn backing_off(attempt: u32, delay: Duration) {
	#[cfg(feature = "tracing")]
	tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, "rate limited, backing off");
	#[cfg(not(feature = "tracing"))]
	let _ = (attempt, delay);
}

pub(crate) fn renewal_finished(succeeded: bool) {
	#[cfg(feature = "tracing")]
	{
		if succeeded {
			tracing::info!("session renewed");
		} else {
			tracing::warn!("session renewal failed");
		}
	}
	#[cfg(not(feature = "tracing"))]
	let _ = succeeded;
}

pub(crate) fn session_expired(reason: &dyn Display, navigated: bool) {
	#[cfg(feature = "tracing")]
	tracing::warn!(%reason, navigated, "session expired, credentials cleared");
	#[cfg(not(feature = "tracing"))]
	let _ = (reason, navigated);
}

pub(crate) fn replay_rejected() {
	#[cfg(feature = "tracing")]
	tracing::warn!("replayed request was rejected after renewal");
}

pub(crate) fn forbidden(navigated: bool) {
	#[cfg(feature = "tracing")]
	tracing::warn!(navigated, "request forbidden");
	#[cfg(not(feature = "tracing"))]
	let _ = navigated;
}

pub(crate) fn server_error(status: StatusCode) {
	#[cfg(feature = "tracing")]
	tracing::error!(status = status.as_u16(), "server error");
	#[cfg(not(feature = "tracing"))]
	let _ = status;
}

pub(crate) fn store_failure(error: &dyn Display) {
	#[cfg(feature = "tracing")]
	tracing::warn!(%error, "credential store failure");
	#[cfg(not(feature = "tracing"))]
	let _ = error;
}

pub(crate) fn coalesced(fingerprint: &str) {
	#[cfg(feature = "tracing")]
	tracing::debug!(fingerprint, "joined in-flight request");
	#[cfg(not(feature = "tracing"))]
	let _ = fingerprint;
}
