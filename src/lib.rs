//! Resilient HTTP client layer for the safety-management portal.
//!
//! Endpoint-aware credential policy, rate-limit backoff, single-shot session renewal, and POST
//! coalescing in front of any async transport.
//!
//! Every network call made by the portal passes through [`client::PortalClient`]:
//!
//! 1. The path is normalized once and classified by [`policy::EndpointPolicy`].
//! 2. The request augmentor attaches or strips the bearer credential read from the injected
//!    [`store::CredentialStore`].
//! 3. `429` responses are retried with exponential backoff; `401` responses on authenticated
//!    endpoints trigger exactly one renewal and replay.
//! 4. Identical concurrent POSTs collapse into a single in-flight call.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod navigate;
pub mod obs;
pub mod policy;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{
		Client as ReqwestClient, Error as ReqwestError, Method, StatusCode,
		header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
	};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tracing_subscriber as _};
