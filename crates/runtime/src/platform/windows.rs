use std::path::{Path, PathBuf};
use std::process::Command;

use super::registry::{REGISTRY_ROOTS, RegistryHit, scan_registry};
use super::{KNOWN_VERSIONS, LaunchArgs, Platform, PlatformKind, SpawnMethod, SpawnReport, roots_summary, spawn_detached};
use crate::error::Result;
use crate::search::{Candidate, ProbeEntry, ProbeKind, SearchReport, SearchRoots, search};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;
#[cfg(windows)]
const DETACHED_PROCESS: u32 = 0x0000_0008;

/// Windows: Program Files installs, LocalAppData installs, then the registry.
#[derive(Debug, Clone)]
pub struct WindowsPlatform {
	roots: SearchRoots,
}

fn install_executable(install_dir: &Path) -> PathBuf {
	install_dir.join("bin").join("ChimeraX.exe")
}

impl WindowsPlatform {
	pub fn new(roots: SearchRoots) -> Self {
		Self { roots }
	}

	pub fn candidates(&self) -> Vec<Candidate> {
		let program_dirs = [&self.roots.program_files, &self.roots.program_files_x86];
		let mut candidates = Vec::new();

		for base in program_dirs {
			candidates.push(Candidate::Direct(install_executable(&base.join("ChimeraX"))));
			candidates.push(Candidate::Direct(install_executable(&base.join("UCSF ChimeraX"))));
		}
		for version in KNOWN_VERSIONS {
			for base in program_dirs {
				candidates.push(Candidate::Direct(install_executable(&base.join(format!("ChimeraX {version}")))));
			}
		}

		for base in program_dirs {
			candidates.push(Candidate::pattern(base, &["ChimeraX*", "bin", "ChimeraX.exe"]));
			candidates.push(Candidate::pattern(base, &["UCSF ChimeraX*", "bin", "ChimeraX.exe"]));
		}
		if let Some(local) = &self.roots.local_app_data {
			candidates.push(Candidate::pattern(&local.join("Programs"), &["ChimeraX*", "bin", "ChimeraX.exe"]));
		}
		candidates
	}

	fn registry_executable(hits: &[RegistryHit]) -> Option<PathBuf> {
		hits.iter().map(|hit| install_executable(&hit.install_dir)).find(|exe| exe.exists())
	}
}

impl Platform for WindowsPlatform {
	fn kind(&self) -> PlatformKind {
		PlatformKind::Windows
	}

	fn locate(&self) -> Option<PathBuf> {
		search(&self.candidates()).or_else(|| Self::registry_executable(&scan_registry()))
	}

	fn probe(&self) -> SearchReport {
		let mut entries: Vec<ProbeEntry> = self.candidates().iter().map(ProbeEntry::from_candidate).collect();
		let hits = scan_registry();
		for root in REGISTRY_ROOTS {
			let under_root: Vec<&RegistryHit> = hits.iter().filter(|hit| hit.key.starts_with(root)).collect();
			if under_root.is_empty() {
				let note = if cfg!(windows) { "key not present" } else { "registry not available on this host" };
				entries.push(ProbeEntry::new(ProbeKind::Registry, *root, Vec::new()).with_note(note));
				continue;
			}
			for hit in under_root {
				let exe = install_executable(&hit.install_dir);
				let matches = if exe.exists() { vec![exe] } else { Vec::new() };
				entries.push(ProbeEntry::new(ProbeKind::Registry, hit.key.clone(), matches).with_note(hit.install_dir.display().to_string()));
			}
		}
		SearchReport {
			platform: PlatformKind::Windows,
			roots: roots_summary(&self.roots),
			entries,
		}
	}

	fn spawn(&self, executable: &Path, args: &LaunchArgs) -> Result<SpawnReport> {
		let mut direct = Command::new(executable);
		direct.args(args.argv());
		#[cfg(windows)]
		std::os::windows::process::CommandExt::creation_flags(&mut direct, CREATE_NO_WINDOW | DETACHED_PROCESS);

		match spawn_detached(direct, SpawnMethod::Direct) {
			Ok(report) => Ok(report),
			Err(err) => {
				tracing::warn!(target = "chimerax.launcher", error = %err, "direct spawn failed, falling back to start");
				let mut shell = Command::new("cmd");
				shell.args(["/C", "start", "", "/b"]).arg(executable).args(args.argv());
				spawn_detached(shell, SpawnMethod::ShellFallback)
			}
		}
	}
}
