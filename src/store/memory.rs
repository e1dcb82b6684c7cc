//! Thread-safe in-memory [`CredentialStore`] for headless hosts and tests.

// self
use crate::{
	_prelude::*,
	store::{CredentialSlot, CredentialStore, StoreError, TokenSecret},
};

/// Storage backend that keeps credentials in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<HashMap<CredentialSlot, TokenSecret>>>);
impl MemoryStore {
	/// Creates a store seeded with both tokens.
	pub fn with_tokens(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
		let store = Self::default();

		{
			let mut map = store.0.write();

			map.insert(CredentialSlot::AccessToken, TokenSecret::new(access_token));
			map.insert(CredentialSlot::RefreshToken, TokenSecret::new(refresh_token));
		}

		store
	}

	/// Returns true if no slot holds a value.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl CredentialStore for MemoryStore {
	fn get(&self, slot: CredentialSlot) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.0.read().get(&slot).cloned())
	}

	fn set(&self, slot: CredentialSlot, value: TokenSecret) -> Result<(), StoreError> {
		self.0.write().insert(slot, value);

		Ok(())
	}

	fn remove(&self, slot: CredentialSlot) -> Result<(), StoreError> {
		self.0.write().remove(&slot);

		Ok(())
	}

	fn clear(&self) -> Result<(), StoreError> {
		self.0.write().clear();

		Ok(())
	}
}
