//! Executable resolution: explicit override first, then cached per-platform discovery.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Result, RuntimeError};
use crate::platform::{Platform, PlatformKind};

#[derive(Debug, Default)]
struct LocatorState {
	override_path: Option<PathBuf>,
	cache: HashMap<PlatformKind, PathBuf>,
}

/// Resolves the ChimeraX executable for one [`Platform`].
///
/// An override is validated once when set and then returned as-is, even if
/// the file later disappears. Discovery results are cached until
/// [`ExecutableLocator::invalidate`].
pub struct ExecutableLocator {
	platform: Arc<dyn Platform>,
	state: Mutex<LocatorState>,
}

impl ExecutableLocator {
	pub fn new(platform: Arc<dyn Platform>) -> Self {
		Self {
			platform,
			state: Mutex::new(LocatorState::default()),
		}
	}

	pub fn platform(&self) -> &Arc<dyn Platform> {
		&self.platform
	}

	pub fn resolve(&self) -> Result<PathBuf> {
		let mut state = self.state.lock();
		if let Some(path) = &state.override_path {
			tracing::debug!(target = "chimerax.locator", path = %path.display(), "using override path");
			return Ok(path.clone());
		}

		let kind = self.platform.kind();
		if let Some(path) = state.cache.get(&kind) {
			return Ok(path.clone());
		}

		tracing::debug!(target = "chimerax.locator", platform = %kind, "searching for executable");
		match self.platform.locate() {
			Some(path) => {
				tracing::info!(target = "chimerax.locator", path = %path.display(), "found ChimeraX");
				state.cache.insert(kind, path.clone());
				Ok(path)
			}
			None => {
				tracing::error!(target = "chimerax.locator", platform = %kind, "ChimeraX executable not found");
				Err(RuntimeError::ExecutableNotFound { platform: kind })
			}
		}
	}

	/// Validates and stores an override; the normalized path is returned.
	pub fn set_override(&self, path: &str) -> Result<PathBuf> {
		let trimmed = path.trim();
		if trimmed.is_empty() {
			return Err(RuntimeError::EmptyPath);
		}
		let normalized = normalize(Path::new(trimmed));
		if !normalized.exists() {
			return Err(RuntimeError::PathNotFound(normalized));
		}
		tracing::info!(target = "chimerax.locator", path = %normalized.display(), "set custom ChimeraX path");
		self.state.lock().override_path = Some(normalized.clone());
		Ok(normalized)
	}

	pub fn clear_override(&self) -> Option<PathBuf> {
		self.state.lock().override_path.take()
	}

	pub fn override_path(&self) -> Option<PathBuf> {
		self.state.lock().override_path.clone()
	}

	/// Drops every cached discovery result.
	pub fn invalidate(&self) {
		self.state.lock().cache.clear();
	}

	pub fn cached(&self) -> Option<PathBuf> {
		self.state.lock().cache.get(&self.platform.kind()).cloned()
	}
}

impl std::fmt::Debug for ExecutableLocator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ExecutableLocator")
			.field("platform", &self.platform.kind())
			.field("state", &*self.state.lock())
			.finish()
	}
}

/// Lexical normalization: drops `.` and folds `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
	let mut out = PathBuf::new();
	for component in path.components() {
		match component {
			Component::CurDir => {}
			Component::ParentDir => {
				if !out.pop() {
					out.push(component);
				}
			}
			other => out.push(other),
		}
	}
	out
}
