//! Plain-text installation and connection reports.

use std::fmt::Write as _;
use std::time::Duration;

use chimerax_runtime::{LOOPBACK, PlatformKind, SearchReport, port_is_open};
use serde_json::Value;

use super::remote::result_text;
use crate::context::BridgeContext;

const PORT_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Every probe entry with its matches, one candidate per line.
pub fn render_probe(report: &SearchReport) -> String {
	let mut out = String::new();
	if !report.roots.is_empty() {
		out.push_str("Search roots:\n");
		for (name, path) in &report.roots {
			let _ = writeln!(out, "  {name}: {}", path.display());
		}
	}
	out.push_str("Candidates:\n");
	for entry in &report.entries {
		let status = if entry.matches.is_empty() { "not found" } else { "found" };
		let _ = write!(out, "  [{status}] {}", entry.candidate);
		if let Some(note) = &entry.note {
			let _ = write!(out, " ({note})");
		}
		out.push('\n');
		for path in &entry.matches {
			let _ = writeln!(out, "    - {}", path.display());
		}
	}
	match report.first_match() {
		Some(path) => {
			let _ = writeln!(out, "Selected: {}", path.display());
		}
		None => out.push_str("No ChimeraX installation found in the searched locations\n"),
	}
	out
}

pub async fn diagnose_chimerax(ctx: &BridgeContext) -> Value {
	let platform = ctx.platform();
	let port = ctx.channel.port();
	let mut report = vec!["=== ChimeraX Diagnostic Report ===".to_string()];
	report.push(format!(
		"Operating System: {} ({} {})",
		platform.kind(),
		std::env::consts::OS,
		std::env::consts::ARCH
	));
	report.push(format!("Bridge Version: {}", env!("CARGO_PKG_VERSION")));

	let running = ctx.channel.is_target_alive().await;
	report.push(format!("ChimeraX Running: {running}"));

	let open = port_is_open(LOOPBACK, port, PORT_CHECK_TIMEOUT).await;
	report.push(format!("XML-RPC Port {port}: {}", if open { "OPEN" } else { "CLOSED" }));

	match ctx.locator.resolve() {
		Ok(path) => {
			report.push(format!("ChimeraX Executable Path: {}", path.display()));
			report.push(format!("ChimeraX Executable Exists: {}", if path.exists() { "Yes" } else { "No" }));
		}
		Err(err) => report.push(format!("Error getting ChimeraX executable path: {err}")),
	}
	if let Some(path) = ctx.locator.override_path() {
		report.push(format!("Custom Path Override: {}", path.display()));
	}

	if running {
		match ctx.channel.run_command("version").await {
			Ok(version) => report.push(format!("ChimeraX Version: {}", result_text(&version).trim())),
			Err(err) => report.push(format!("Error getting ChimeraX version: {err}")),
		}
	}

	report.push(format!("\n=== {}-Specific Checks ===", platform.kind()));
	report.push(render_probe(&platform.probe()));
	Value::String(report.join("\n"))
}

/// Probe report for `wanted`, or a notice when running on another host.
pub fn debug_path_issue(ctx: &BridgeContext, wanted: PlatformKind) -> Value {
	let platform = ctx.platform();
	if platform.kind() != wanted {
		return Value::String(format!("This debug function is only for {wanted}"));
	}
	let mut report = vec![format!("=== {wanted} ChimeraX Path Debug ===")];
	if let Some(path) = ctx.locator.override_path() {
		report.push(format!("Custom Path Override: {}", path.display()));
	}
	if let Some(path) = ctx.locator.cached() {
		report.push(format!("Cached Executable: {}", path.display()));
	}
	report.push(render_probe(&platform.probe()));
	Value::String(report.join("\n"))
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use chimerax_runtime::search::{ProbeEntry, ProbeKind};

	use super::*;
	use crate::config::BridgeConfig;
	use crate::fake::{FAKE_VERSION, FakeChimeraX, FakePlatform, SpawnBehavior};

	fn context(fake: &FakeChimeraX) -> BridgeContext {
		let platform = FakePlatform::new(Some(PathBuf::from("/opt/UCSF/ChimeraX/bin/ChimeraX")), SpawnBehavior::Nothing);
		BridgeContext::new(BridgeConfig::default(), platform, fake.factory())
	}

	#[test]
	fn probe_render_marks_found_entries() {
		let report = SearchReport {
			platform: PlatformKind::Linux,
			roots: vec![("home".into(), PathBuf::from("/home/me"))],
			entries: vec![
				ProbeEntry::new(ProbeKind::Direct, "/usr/bin/ChimeraX", Vec::new()),
				ProbeEntry::new(ProbeKind::PathLookup, "which chimerax", vec![PathBuf::from("/opt/bin/chimerax")]),
				ProbeEntry::new(ProbeKind::Registry, "HKEY_LOCAL_MACHINE", Vec::new()).with_note("registry not available on this host"),
			],
		};
		let text = render_probe(&report);
		assert!(text.contains("  home: /home/me"));
		assert!(text.contains("[not found] /usr/bin/ChimeraX"));
		assert!(text.contains("[found] which chimerax\n    - /opt/bin/chimerax"));
		assert!(text.contains("(registry not available on this host)"));
		assert!(text.contains("Selected: /opt/bin/chimerax"));
	}

	#[tokio::test]
	async fn report_includes_status_and_version() {
		let fake = FakeChimeraX::running();
		let ctx = context(&fake);
		let report = diagnose_chimerax(&ctx).await;
		let text = report.as_str().unwrap();
		assert!(text.starts_with("=== ChimeraX Diagnostic Report ==="));
		assert!(text.contains("ChimeraX Running: true"));
		assert!(text.contains(&format!("ChimeraX Version: {FAKE_VERSION}")));
		assert!(text.contains("ChimeraX Executable Path: /opt/UCSF/ChimeraX/bin/ChimeraX"));
		assert!(text.contains("ChimeraX Executable Exists: No"));
	}

	#[tokio::test]
	async fn report_when_not_running() {
		let fake = FakeChimeraX::new();
		let ctx = context(&fake);
		let text = diagnose_chimerax(&ctx).await.as_str().unwrap().to_string();
		assert!(text.contains("ChimeraX Running: false"));
		assert!(!text.contains("ChimeraX Version:"));
	}

	#[test]
	fn debug_report_only_for_own_platform() {
		let fake = FakeChimeraX::new();
		let ctx = context(&fake);
		let host = PlatformKind::detect();
		for kind in [PlatformKind::Windows, PlatformKind::Macos, PlatformKind::Linux] {
			let text = debug_path_issue(&ctx, kind).as_str().unwrap().to_string();
			if kind == host {
				assert!(text.starts_with(&format!("=== {kind} ChimeraX Path Debug ===")));
				assert!(text.contains("fake install"));
			} else {
				assert_eq!(text, format!("This debug function is only for {kind}"));
			}
		}
	}
}
