//! Navigation signal sent to the host application on terminal session failures.

// self
use crate::_prelude::*;

/// Host-side navigation surface.
///
/// The pipeline calls [`navigate`](Navigator::navigate) for exactly two destinations: the
/// login path after an unrecoverable `401` and the unauthorized path after a `403`.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Path of the surface currently shown to the user.
	fn current_path(&self) -> String;

	/// Performs a full navigation to `path`.
	fn navigate(&self, path: &str);
}

/// Navigates to `target` unless the host is already there; returns true if it navigated.
pub fn navigate_once(navigator: &dyn Navigator, target: &str) -> bool {
	if navigator.current_path() == target {
		return false;
	}

	navigator.navigate(target);

	true
}

/// In-process [`Navigator`] that tracks the current path and every navigation.
#[derive(Clone, Debug)]
pub struct MemoryNavigator {
	current: Arc<RwLock<String>>,
	history: Arc<Mutex<Vec<String>>>,
}
impl MemoryNavigator {
	/// Creates a navigator positioned at `path`.
	pub fn at(path: impl Into<String>) -> Self {
		Self { current: Arc::new(RwLock::new(path.into())), history: Default::default() }
	}

	/// Navigations performed so far, oldest first.
	pub fn history(&self) -> Vec<String> {
		self.history.lock().clone()
	}
}
impl Default for MemoryNavigator {
	fn default() -> Self {
		Self::at("/")
	}
}
impl Navigator for MemoryNavigator {
	fn current_path(&self) -> String {
		self.current.read().clone()
	}

	fn navigate(&self, path: &str) {
		*self.current.write() = path.to_owned();

		self.history.lock().push(path.to_owned());
	}
}
