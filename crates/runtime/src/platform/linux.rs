use std::path::{Path, PathBuf};
use std::process::Command;

use super::{LaunchArgs, Platform, PlatformKind, SpawnMethod, SpawnReport, roots_summary, spawn_detached};
use crate::error::Result;
use crate::search::{Candidate, ProbeEntry, ProbeKind, SearchReport, SearchRoots, search};

const PATH_NAMES: &[&str] = &["ChimeraX", "chimerax"];

/// Linux (and any other Unix-like host): fixed paths, versioned globs, then `PATH`.
#[derive(Debug, Clone)]
pub struct LinuxPlatform {
	roots: SearchRoots,
}

impl LinuxPlatform {
	pub fn new(roots: SearchRoots) -> Self {
		Self { roots }
	}

	pub fn candidates(&self) -> Vec<Candidate> {
		let roots = &self.roots;
		let mut candidates = vec![
			Candidate::Direct(roots.system_path("/usr/local/bin/ChimeraX")),
			Candidate::Direct(roots.system_path("/usr/bin/ChimeraX")),
			Candidate::Direct(roots.system_path("/usr/bin/chimerax")),
		];
		if let Some(home) = &roots.home {
			candidates.push(Candidate::Direct(home.join(".local").join("bin").join("ChimeraX")));
		}

		candidates.push(Candidate::pattern(&roots.system_path("/opt/UCSF"), &["ChimeraX*", "bin", "ChimeraX"]));
		if let Some(home) = &roots.home {
			candidates.push(Candidate::pattern(home, &["UCSF-ChimeraX*", "bin", "ChimeraX"]));
		}
		candidates.push(Candidate::pattern(&roots.system_path("/usr/lib"), &["ucsf-chimerax*", "bin", "ChimeraX"]));
		candidates
	}

	fn which(&self, name: &str) -> Option<PathBuf> {
		let path_var = self.roots.path_var.as_ref()?;
		let cwd = std::env::current_dir().unwrap_or_else(|_| self.roots.filesystem_root.clone());
		which::which_in(name, Some(path_var), cwd).ok()
	}
}

impl Platform for LinuxPlatform {
	fn kind(&self) -> PlatformKind {
		PlatformKind::Linux
	}

	fn locate(&self) -> Option<PathBuf> {
		search(&self.candidates()).or_else(|| PATH_NAMES.iter().find_map(|name| self.which(name)))
	}

	fn probe(&self) -> SearchReport {
		let mut entries: Vec<ProbeEntry> = self.candidates().iter().map(ProbeEntry::from_candidate).collect();
		for name in PATH_NAMES {
			entries.push(ProbeEntry::new(ProbeKind::PathLookup, format!("which {name}"), self.which(name).into_iter().collect()));
		}
		SearchReport {
			platform: PlatformKind::Linux,
			roots: roots_summary(&self.roots),
			entries,
		}
	}

	fn spawn(&self, executable: &Path, args: &LaunchArgs) -> Result<SpawnReport> {
		match which::which("nohup") {
			Ok(nohup) => {
				let mut cmd = Command::new(nohup);
				cmd.arg(executable).args(args.argv());
				spawn_detached(cmd, SpawnMethod::Nohup)
			}
			Err(_) => {
				let mut cmd = Command::new(executable);
				cmd.args(args.argv());
				spawn_detached(cmd, SpawnMethod::Direct)
			}
		}
	}
}
