//! Install-root candidates and the shared first-match search.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::platform::PlatformKind;

/// Filesystem roots consulted by the discovery strategies.
///
/// [`SearchRoots::from_env`] reads the real host; [`SearchRoots::rooted`]
/// relocates every root under one directory so fake install trees can be
/// built in a temp dir.
#[derive(Debug, Clone)]
pub struct SearchRoots {
	/// Prefix for absolute Unix install locations (`/opt`, `/usr`, `/Applications`).
	pub filesystem_root: PathBuf,
	pub home: Option<PathBuf>,
	pub program_files: PathBuf,
	pub program_files_x86: PathBuf,
	pub local_app_data: Option<PathBuf>,
	/// `PATH`-style list used for `which` lookups.
	pub path_var: Option<OsString>,
}

impl SearchRoots {
	pub fn from_env() -> Self {
		Self {
			filesystem_root: PathBuf::from("/"),
			home: dirs::home_dir(),
			program_files: env_path("ProgramFiles").unwrap_or_else(|| PathBuf::from(r"C:\Program Files")),
			program_files_x86: env_path("ProgramFiles(x86)").unwrap_or_else(|| PathBuf::from(r"C:\Program Files (x86)")),
			local_app_data: env_path("LOCALAPPDATA"),
			path_var: std::env::var_os("PATH"),
		}
	}

	pub fn rooted(root: &Path) -> Self {
		Self {
			filesystem_root: root.to_path_buf(),
			home: Some(root.join("home")),
			program_files: root.join("Program Files"),
			program_files_x86: root.join("Program Files (x86)"),
			local_app_data: Some(root.join("AppData").join("Local")),
			path_var: Some(root.join("bin").into_os_string()),
		}
	}

	/// Joins a `/`-separated absolute Unix location onto [`Self::filesystem_root`].
	pub fn system_path(&self, location: &str) -> PathBuf {
		let mut path = self.filesystem_root.clone();
		for part in location.split('/').filter(|part| !part.is_empty()) {
			path.push(part);
		}
		path
	}
}

fn env_path(key: &str) -> Option<PathBuf> {
	std::env::var_os(key).filter(|value| !value.is_empty()).map(PathBuf::from)
}

/// One place an executable may live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
	Direct(PathBuf),
	/// A glob pattern; the literal base directory is already escaped.
	Pattern(String),
}

impl Candidate {
	/// Builds a pattern whose `base` is matched literally and `rest` is a glob.
	pub fn pattern(base: &Path, rest: &[&str]) -> Self {
		let mut pattern = glob::Pattern::escape(&base.to_string_lossy());
		for part in rest {
			pattern.push(std::path::MAIN_SEPARATOR);
			pattern.push_str(part);
		}
		Candidate::Pattern(pattern)
	}

	pub fn describe(&self) -> String {
		match self {
			Candidate::Direct(path) => path.display().to_string(),
			Candidate::Pattern(pattern) => pattern.clone(),
		}
	}

	/// Existing paths for this candidate, in filesystem enumeration order.
	pub fn matches(&self) -> Vec<PathBuf> {
		match self {
			Candidate::Direct(path) => {
				if path.exists() {
					vec![path.clone()]
				} else {
					Vec::new()
				}
			}
			Candidate::Pattern(pattern) => match glob::glob(pattern) {
				Ok(paths) => paths.filter_map(|entry| entry.ok()).collect(),
				Err(err) => {
					tracing::debug!(target = "chimerax.locator", %pattern, error = %err, "invalid glob pattern");
					Vec::new()
				}
			},
		}
	}

	fn kind(&self) -> ProbeKind {
		match self {
			Candidate::Direct(_) => ProbeKind::Direct,
			Candidate::Pattern(_) => ProbeKind::Pattern,
		}
	}
}

/// Returns the first match of the first candidate that yields any.
pub fn search(candidates: &[Candidate]) -> Option<PathBuf> {
	candidates.iter().find_map(|candidate| {
		tracing::trace!(target = "chimerax.locator", candidate = %candidate.describe(), "checking candidate");
		candidate.matches().into_iter().next()
	})
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
	Direct,
	Pattern,
	Registry,
	PathLookup,
	DirectoryScan,
}

/// One line of a read-only discovery report.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeEntry {
	pub kind: ProbeKind,
	pub candidate: String,
	pub matches: Vec<PathBuf>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub note: Option<String>,
}

impl ProbeEntry {
	pub fn from_candidate(candidate: &Candidate) -> Self {
		Self {
			kind: candidate.kind(),
			candidate: candidate.describe(),
			matches: candidate.matches(),
			note: None,
		}
	}

	pub fn new(kind: ProbeKind, candidate: impl Into<String>, matches: Vec<PathBuf>) -> Self {
		Self {
			kind,
			candidate: candidate.into(),
			matches,
			note: None,
		}
	}

	pub fn with_note(mut self, note: impl Into<String>) -> Self {
		self.note = Some(note.into());
		self
	}
}

/// Everything a platform strategy looked at, in search order.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
	pub platform: PlatformKind,
	pub roots: Vec<(String, PathBuf)>,
	pub entries: Vec<ProbeEntry>,
}

impl SearchReport {
	/// The path discovery would pick, if any.
	pub fn first_match(&self) -> Option<&Path> {
		self.entries.iter().find_map(|entry| entry.matches.first().map(PathBuf::as_path))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn direct_candidate_requires_existing_file() {
		let tmp = tempfile::TempDir::new().unwrap();
		let present = tmp.path().join("ChimeraX");
		std::fs::write(&present, b"").unwrap();

		assert_eq!(Candidate::Direct(present.clone()).matches(), vec![present]);
		assert!(Candidate::Direct(tmp.path().join("missing")).matches().is_empty());
	}

	#[test]
	fn pattern_escapes_literal_base() {
		let tmp = tempfile::TempDir::new().unwrap();
		let base = tmp.path().join("odd [dir]");
		let exe = base.join("ChimeraX-1.8").join("bin").join("ChimeraX");
		std::fs::create_dir_all(exe.parent().unwrap()).unwrap();
		std::fs::write(&exe, b"").unwrap();

		let candidate = Candidate::pattern(&base, &["ChimeraX*", "bin", "ChimeraX"]);
		assert_eq!(candidate.matches(), vec![exe]);
	}

	#[test]
	fn search_prefers_earlier_candidates() {
		let tmp = tempfile::TempDir::new().unwrap();
		let first = tmp.path().join("a");
		let second = tmp.path().join("b");
		std::fs::write(&second, b"").unwrap();
		std::fs::write(&first, b"").unwrap();

		let found = search(&[
			Candidate::Direct(tmp.path().join("missing")),
			Candidate::Direct(first.clone()),
			Candidate::Direct(second),
		]);
		assert_eq!(found, Some(first));
	}

	#[test]
	fn system_path_is_relative_to_root() {
		let roots = SearchRoots::rooted(Path::new("/tmp/fake"));
		assert_eq!(roots.system_path("/opt/UCSF"), Path::new("/tmp/fake/opt/UCSF"));
	}
}
