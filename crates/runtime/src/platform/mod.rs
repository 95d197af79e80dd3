//! Per-host discovery and detached-spawn strategies.
//!
//! One [`Platform`] implementation per host family. [`host_platform`] picks
//! the implementation once at startup; callers only see the trait.

mod linux;
mod macos;
#[cfg_attr(not(windows), allow(dead_code))]
mod registry;
mod windows;

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use serde::Serialize;

pub use linux::LinuxPlatform;
pub use macos::MacosPlatform;
pub use windows::WindowsPlatform;

use crate::error::{Result, RuntimeError};
use crate::search::{SearchReport, SearchRoots};

/// Release lines probed for versioned install directories, newest first.
pub const KNOWN_VERSIONS: &[&str] = &["1.9", "1.8", "1.7", "1.6"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
	Windows,
	Macos,
	Linux,
}

impl PlatformKind {
	/// Anything that is neither Windows nor macOS uses the Linux strategy.
	pub fn detect() -> Self {
		match std::env::consts::OS {
			"windows" => PlatformKind::Windows,
			"macos" => PlatformKind::Macos,
			_ => PlatformKind::Linux,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			PlatformKind::Windows => "Windows",
			PlatformKind::Macos => "macOS",
			PlatformKind::Linux => "Linux",
		}
	}
}

impl fmt::Display for PlatformKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Command-line flags that bring the target up with its control channel on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchArgs {
	args: Vec<String>,
}

impl LaunchArgs {
	pub fn remote_control(port: u16) -> Self {
		Self {
			args: vec!["--cmd".to_string(), format!("remotecontrol xmlrpc true port {port}")],
		}
	}

	pub fn argv(&self) -> &[String] {
		&self.args
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnMethod {
	Direct,
	/// `cmd /C start` after a failed direct spawn.
	ShellFallback,
	/// macOS `open <bundle> --args ...`.
	OpenBundle,
	Nohup,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpawnReport {
	pub method: SpawnMethod,
	pub program: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub pid: Option<u32>,
}

/// Host-specific capability set: find the executable and start it detached.
///
/// `spawn` returns as soon as the child exists; it never waits for it.
pub trait Platform: Send + Sync {
	fn kind(&self) -> PlatformKind;

	/// Runs the discovery chain and returns the first hit.
	fn locate(&self) -> Option<PathBuf>;

	/// Read-only report of every place [`Platform::locate`] would look.
	fn probe(&self) -> SearchReport;

	fn spawn(&self, executable: &Path, args: &LaunchArgs) -> Result<SpawnReport>;
}

pub fn host_platform() -> Arc<dyn Platform> {
	platform_for(PlatformKind::detect(), SearchRoots::from_env())
}

pub fn platform_for(kind: PlatformKind, roots: SearchRoots) -> Arc<dyn Platform> {
	match kind {
		PlatformKind::Windows => Arc::new(WindowsPlatform::new(roots)),
		PlatformKind::Macos => Arc::new(MacosPlatform::new(roots)),
		PlatformKind::Linux => Arc::new(LinuxPlatform::new(roots)),
	}
}

/// Spawns `program` with null stdio, detached from our process group on Unix.
pub(crate) fn spawn_detached(mut cmd: Command, method: SpawnMethod) -> Result<SpawnReport> {
	let program = cmd.get_program().to_string_lossy().into_owned();
	cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

	#[cfg(unix)]
	std::os::unix::process::CommandExt::process_group(&mut cmd, 0);

	let mut child = cmd.spawn().map_err(|source| RuntimeError::Spawn {
		program: program.clone(),
		source,
	})?;
	let pid = child.id();
	tracing::info!(target = "chimerax.launcher", %program, pid, ?method, "spawned detached process");

	// Reap the child when it exits so it does not linger as a zombie.
	let reaped = program.clone();
	let reaper = std::thread::Builder::new().name(format!("reap-{pid}")).spawn(move || match child.wait() {
		Ok(status) => tracing::info!(target = "chimerax.launcher", program = %reaped, pid, %status, "detached process exited"),
		Err(err) => tracing::warn!(target = "chimerax.launcher", program = %reaped, pid, error = %err, "failed to wait on detached process"),
	});
	if let Err(err) = reaper {
		tracing::warn!(target = "chimerax.launcher", %program, pid, error = %err, "could not start reaper thread");
	}

	Ok(SpawnReport {
		method,
		program,
		pid: Some(pid),
	})
}

pub(crate) fn roots_summary(roots: &SearchRoots) -> Vec<(String, PathBuf)> {
	let mut summary = vec![
		("filesystem_root".to_string(), roots.filesystem_root.clone()),
		("program_files".to_string(), roots.program_files.clone()),
		("program_files_x86".to_string(), roots.program_files_x86.clone()),
	];
	if let Some(home) = &roots.home {
		summary.push(("home".to_string(), home.clone()));
	}
	if let Some(local) = &roots.local_app_data {
		summary.push(("local_app_data".to_string(), local.clone()));
	}
	summary
}

#[cfg(test)]
mod tests {
	use super::*;

	#[cfg(target_os = "linux")]
	#[test]
	fn exited_detached_process_is_reaped() {
		let report = spawn_detached(Command::new("true"), SpawnMethod::Direct).unwrap();
		let proc_dir = PathBuf::from(format!("/proc/{}", report.pid.unwrap()));
		let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
		while proc_dir.exists() && std::time::Instant::now() < deadline {
			std::thread::sleep(std::time::Duration::from_millis(20));
		}
		assert!(!proc_dir.exists(), "{} still present", proc_dir.display());
	}

	#[test]
	fn remote_control_flag_carries_port() {
		let args = LaunchArgs::remote_control(50123);
		assert_eq!(args.argv(), ["--cmd", "remotecontrol xmlrpc true port 50123"]);
	}

	#[test]
	fn platform_kind_display_names() {
		assert_eq!(PlatformKind::Macos.to_string(), "macOS");
		assert_eq!(PlatformKind::Windows.to_string(), "Windows");
		assert_eq!(serde_json::to_value(PlatformKind::Linux).unwrap(), "linux");
	}

	#[test]
	fn host_platform_matches_detected_kind() {
		assert_eq!(host_platform().kind(), PlatformKind::detect());
	}
}
