//! Install directories recorded under `SOFTWARE\UCSF\ChimeraX`, read via `reg.exe`.

use std::path::PathBuf;

pub const REGISTRY_ROOTS: &[&str] = &[
	r"HKEY_LOCAL_MACHINE\SOFTWARE\UCSF\ChimeraX",
	r"HKEY_LOCAL_MACHINE\SOFTWARE\Wow6432Node\UCSF\ChimeraX",
	r"HKEY_CURRENT_USER\SOFTWARE\UCSF\ChimeraX",
];

const INSTALL_PATH: &str = "InstallPath";
const DEFAULT_VALUE: &str = "(Default)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegValue {
	pub name: String,
	pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegKey {
	pub path: String,
	pub values: Vec<RegValue>,
}

impl RegKey {
	fn value(&self, name: &str) -> Option<&str> {
		self.values.iter().find(|value| value.name.eq_ignore_ascii_case(name)).map(|value| value.data.as_str())
	}
}

/// A registry location paired with the install directory it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryHit {
	pub key: String,
	pub install_dir: PathBuf,
}

/// Parses `reg query <key> /s` output into keys and their string values.
pub fn parse_reg_query(output: &str) -> Vec<RegKey> {
	let mut keys: Vec<RegKey> = Vec::new();
	for line in output.lines() {
		let trimmed = line.trim_end();
		if trimmed.is_empty() {
			continue;
		}
		if trimmed.starts_with("HKEY_") {
			keys.push(RegKey {
				path: trimmed.to_string(),
				values: Vec::new(),
			});
			continue;
		}
		let Some(current) = keys.last_mut() else {
			continue;
		};
		let mut fields = trimmed.trim_start().splitn(3, "    ");
		let (Some(name), Some(kind), Some(data)) = (fields.next(), fields.next(), fields.next()) else {
			continue;
		};
		if !kind.starts_with("REG_") {
			continue;
		}
		current.values.push(RegValue {
			name: name.trim().to_string(),
			data: data.trim().to_string(),
		});
	}
	keys
}

/// Install directories under `root`: its `InstallPath` value, the default of an
/// `InstallPath` subkey, and `InstallPath` of version-numbered subkeys.
pub fn install_dirs(root: &str, keys: &[RegKey]) -> Vec<RegistryHit> {
	let mut hits = Vec::new();
	let mut push = |key: String, data: &str| {
		if !data.is_empty() {
			hits.push(RegistryHit {
				key,
				install_dir: PathBuf::from(data),
			});
		}
	};

	for key in keys {
		let Some(relative) = child_name(root, &key.path) else {
			continue;
		};
		match relative {
			"" => {
				if let Some(data) = key.value(INSTALL_PATH) {
					push(format!(r"{root}\{INSTALL_PATH}"), data);
				}
			}
			name if name.eq_ignore_ascii_case(INSTALL_PATH) => {
				if let Some(data) = key.value(DEFAULT_VALUE) {
					push(format!(r"{root}\{INSTALL_PATH}"), data);
				}
			}
			name if name.contains('.') && !name.contains('\\') => {
				if let Some(data) = key.value(INSTALL_PATH) {
					push(format!(r"{root}\{name}\{INSTALL_PATH}"), data);
				}
			}
			_ => {}
		}
	}
	hits
}

/// `Some("")` for `root` itself, `Some(rest)` for keys below it.
fn child_name<'a>(root: &str, path: &'a str) -> Option<&'a str> {
	if path.len() < root.len() || !path.is_char_boundary(root.len()) || !path[..root.len()].eq_ignore_ascii_case(root) {
		return None;
	}
	let rest = &path[root.len()..];
	if rest.is_empty() {
		Some("")
	} else {
		rest.strip_prefix('\\')
	}
}

/// Queries every known root. Always empty off Windows.
pub fn scan_registry() -> Vec<RegistryHit> {
	#[cfg(windows)]
	{
		let mut hits = Vec::new();
		for root in REGISTRY_ROOTS {
			match std::process::Command::new("reg").args(["query", root, "/s"]).output() {
				Ok(output) if output.status.success() => {
					let stdout = String::from_utf8_lossy(&output.stdout);
					hits.extend(install_dirs(root, &parse_reg_query(&stdout)));
				}
				Ok(_) => tracing::debug!(target = "chimerax.locator", %root, "registry key not present"),
				Err(err) => tracing::warn!(target = "chimerax.locator", %root, error = %err, "reg query failed"),
			}
		}
		hits
	}

	#[cfg(not(windows))]
	{
		Vec::new()
	}
}
