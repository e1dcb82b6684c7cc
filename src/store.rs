//! Credential persistence contracts and built-in stores.
//!
//! Stores are synchronous key-value maps with three well-known slots (access token, refresh
//! token, cached user payload). The pipeline only reads through [`CredentialStore`], so hosts
//! inject whichever backend matches their persistence story.

pub mod file;
pub mod memory;
pub mod secret;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use secret::TokenSecret;

// self
use crate::_prelude::*;

/// Well-known keys held by a [`CredentialStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CredentialSlot {
	/// Short-lived bearer credential.
	#[serde(rename = "accessToken")]
	AccessToken,
	/// Long-lived credential exchanged for new access tokens.
	#[serde(rename = "refreshToken")]
	RefreshToken,
	/// Cached signed-in user payload.
	#[serde(rename = "user")]
	User,
}
impl CredentialSlot {
	/// Every slot, in storage order.
	pub const ALL: [CredentialSlot; 3] =
		[CredentialSlot::AccessToken, CredentialSlot::RefreshToken, CredentialSlot::User];

	/// Returns the storage key used by persistent backends.
	pub const fn key(self) -> &'static str {
		match self {
			CredentialSlot::AccessToken => "accessToken",
			CredentialSlot::RefreshToken => "refreshToken",
			CredentialSlot::User => "user",
		}
	}
}
impl Display for CredentialSlot {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.key())
	}
}

/// Snapshot of the stored access and refresh tokens.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CredentialPair {
	/// Current access token, if any.
	pub access_token: Option<TokenSecret>,
	/// Current refresh token, if any.
	pub refresh_token: Option<TokenSecret>,
}
impl CredentialPair {
	/// Creates a pair holding both tokens.
	pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
		Self {
			access_token: Some(TokenSecret::new(access_token)),
			refresh_token: Some(TokenSecret::new(refresh_token)),
		}
	}
}

/// Synchronous storage backend for session credentials.
///
/// Implementations must be cheap to call; the pipeline reads the access token on every
/// attempt and never caches it.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Reads a slot.
	fn get(&self, slot: CredentialSlot) -> Result<Option<TokenSecret>, StoreError>;

	/// Writes or replaces a slot.
	fn set(&self, slot: CredentialSlot, value: TokenSecret) -> Result<(), StoreError>;

	/// Removes a slot if present.
	fn remove(&self, slot: CredentialSlot) -> Result<(), StoreError>;

	/// Removes every slot.
	fn clear(&self) -> Result<(), StoreError> {
		CredentialSlot::ALL.into_iter().try_for_each(|slot| self.remove(slot))
	}

	/// Reads the access/refresh pair.
	fn credentials(&self) -> Result<CredentialPair, StoreError> {
		Ok(CredentialPair {
			access_token: self.get(CredentialSlot::AccessToken)?,
			refresh_token: self.get(CredentialSlot::RefreshToken)?,
		})
	}

	/// Writes every token present in `pair`, removing the absent ones.
	fn save_credentials(&self, pair: &CredentialPair) -> Result<(), StoreError> {
		for (slot, value) in [
			(CredentialSlot::AccessToken, &pair.access_token),
			(CredentialSlot::RefreshToken, &pair.refresh_token),
		] {
			match value {
				Some(secret) => self.set(slot, secret.clone())?,
				None => self.remove(slot)?,
			}
		}

		Ok(())
	}
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
