use std::path::{Path, PathBuf};
use std::process::Command;

use super::{KNOWN_VERSIONS, LaunchArgs, Platform, PlatformKind, SpawnMethod, SpawnReport, roots_summary, spawn_detached};
use crate::error::Result;
use crate::search::{Candidate, ProbeEntry, ProbeKind, SearchReport, SearchRoots, search};

const BUNDLE_EXE: [&str; 3] = ["Contents", "bin", "ChimeraX"];

/// macOS: application bundles in `/Applications` and `~/Applications`.
#[derive(Debug, Clone)]
pub struct MacosPlatform {
	roots: SearchRoots,
}

impl MacosPlatform {
	pub fn new(roots: SearchRoots) -> Self {
		Self { roots }
	}

	fn application_dirs(&self) -> Vec<PathBuf> {
		let mut dirs = vec![self.roots.system_path("/Applications")];
		if let Some(home) = &self.roots.home {
			dirs.push(home.join("Applications"));
		}
		dirs
	}

	pub fn candidates(&self) -> Vec<Candidate> {
		let apps = self.application_dirs();
		let mut candidates = Vec::new();
		for dir in &apps {
			candidates.push(Candidate::Direct(bundle_executable(&dir.join("ChimeraX.app"))));
			candidates.push(Candidate::Direct(bundle_executable(&dir.join("UCSF ChimeraX.app"))));
		}
		for version in KNOWN_VERSIONS {
			for dir in &apps {
				candidates.push(Candidate::Direct(bundle_executable(&dir.join(format!("ChimeraX-{version}.app")))));
			}
		}
		for dir in &apps {
			candidates.push(Candidate::pattern(dir, &["ChimeraX*.app", BUNDLE_EXE[0], BUNDLE_EXE[1], BUNDLE_EXE[2]]));
			candidates.push(Candidate::pattern(dir, &["UCSF ChimeraX*.app", BUNDLE_EXE[0], BUNDLE_EXE[1], BUNDLE_EXE[2]]));
		}
		candidates
	}

	/// Case-insensitive scan for any `*chimerax*` entry holding the bundle executable.
	fn scan_applications(&self, dir: &Path) -> Vec<PathBuf> {
		let Ok(entries) = std::fs::read_dir(dir) else {
			return Vec::new();
		};
		entries
			.filter_map(|entry| entry.ok())
			.filter(|entry| entry.file_name().to_string_lossy().to_lowercase().contains("chimerax"))
			.map(|entry| bundle_executable(&entry.path()))
			.filter(|exe| exe.exists())
			.collect()
	}
}

fn bundle_executable(bundle: &Path) -> PathBuf {
	BUNDLE_EXE.iter().fold(bundle.to_path_buf(), |path, part| path.join(part))
}

/// `X.app/Contents/bin/ChimeraX` back to `X.app`.
fn enclosing_bundle(executable: &Path) -> Option<&Path> {
	executable
		.ancestors()
		.nth(3)
		.filter(|bundle| bundle.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("app")))
}

impl Platform for MacosPlatform {
	fn kind(&self) -> PlatformKind {
		PlatformKind::Macos
	}

	fn locate(&self) -> Option<PathBuf> {
		search(&self.candidates()).or_else(|| self.application_dirs().iter().find_map(|dir| self.scan_applications(dir).into_iter().next()))
	}

	fn probe(&self) -> SearchReport {
		let mut entries: Vec<ProbeEntry> = self.candidates().iter().map(ProbeEntry::from_candidate).collect();
		for dir in self.application_dirs() {
			let matches = self.scan_applications(&dir);
			entries.push(ProbeEntry::new(ProbeKind::DirectoryScan, dir.display().to_string(), matches));
		}
		SearchReport {
			platform: PlatformKind::Macos,
			roots: roots_summary(&self.roots),
			entries,
		}
	}

	fn spawn(&self, executable: &Path, args: &LaunchArgs) -> Result<SpawnReport> {
		match enclosing_bundle(executable) {
			Some(bundle) => {
				let mut cmd = Command::new("open");
				cmd.arg(bundle).arg("--args").args(args.argv());
				spawn_detached(cmd, SpawnMethod::OpenBundle)
			}
			None => {
				let mut cmd = Command::new(executable);
				cmd.args(args.argv());
				spawn_detached(cmd, SpawnMethod::Direct)
			}
		}
	}
}
