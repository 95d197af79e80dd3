//! In-memory stand-ins for ChimeraX and the host platform.
//!
//! [`FakeChimeraX`] answers `run_command` like a minimal ChimeraX: commands
//! are echoed into a log buffer and the `log save`/`log clear`/`log open`
//! primitives operate on real files. [`FakePlatform`] counts discovery and
//! spawn calls and can bring the fake up when spawned.

use std::collections::HashMap;
use std::net::{IpAddr, TcpListener};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chimerax_runtime::error::{Result as RuntimeResult, RuntimeError};
use chimerax_runtime::search::{ProbeEntry, ProbeKind};
use chimerax_runtime::{LOOPBACK, LaunchArgs, Platform, PlatformKind, SearchReport, SpawnMethod, SpawnReport};
use parking_lot::Mutex;
use serde_json::Value;

use crate::channel::{ClientFactory, RemoteClient};
use crate::error::{BridgeError, Result};

pub const FAKE_VERSION: &str = "UCSF ChimeraX version: 1.8 (fake)";

#[derive(Default)]
struct FakeState {
	alive: bool,
	log: String,
	commands: Vec<String>,
	builds: usize,
	responses: HashMap<String, Value>,
	failures: HashMap<String, String>,
	listener: Option<TcpListener>,
}

#[derive(Clone, Default)]
pub struct FakeChimeraX {
	state: Arc<Mutex<FakeState>>,
}

impl FakeChimeraX {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn running() -> Self {
		let fake = Self::new();
		fake.set_alive(true);
		fake
	}

	pub fn factory(&self) -> Arc<dyn ClientFactory> {
		Arc::new(self.clone())
	}

	pub fn set_alive(&self, alive: bool) {
		self.state.lock().alive = alive;
	}

	pub fn is_alive(&self) -> bool {
		self.state.lock().alive
	}

	/// Binds the XML-RPC port so readiness polling sees it open.
	pub fn open_port(&self, port: u16) -> std::io::Result<()> {
		let listener = TcpListener::bind((LOOPBACK, port))?;
		self.state.lock().listener = Some(listener);
		Ok(())
	}

	/// Every command received while alive, in order.
	pub fn commands(&self) -> Vec<String> {
		self.state.lock().commands.clone()
	}

	/// [`commands`](Self::commands) without the `version` liveness probes.
	pub fn issued(&self) -> Vec<String> {
		self.state.lock().commands.iter().filter(|command| command.as_str() != "version").cloned().collect()
	}

	pub fn clear_commands(&self) {
		self.state.lock().commands.clear();
	}

	pub fn builds(&self) -> usize {
		self.state.lock().builds
	}

	pub fn log_text(&self) -> String {
		self.state.lock().log.clone()
	}

	pub fn push_log(&self, text: &str) {
		let mut state = self.state.lock();
		state.log.push_str(text);
		state.log.push('\n');
	}

	/// Fixed result for an exact command.
	pub fn respond(&self, command: &str, value: Value) {
		self.state.lock().responses.insert(command.to_string(), value);
	}

	/// Fault for an exact command.
	pub fn fail(&self, command: &str, message: &str) {
		self.state.lock().failures.insert(command.to_string(), message.to_string());
	}

	fn execute(&self, command: &str) -> Result<Value> {
		let mut state = self.state.lock();
		if !state.alive {
			return Err(BridgeError::ConnectionLost("Connection refused (os error 111)".into()));
		}
		state.commands.push(command.to_string());

		if let Some(message) = state.failures.get(command).cloned() {
			state.log.push_str(&format!("> {command}\n{message}\n"));
			return Err(BridgeError::RemoteFault { code: 1, message });
		}

		let trimmed = command.trim();
		if let Some(rest) = trimmed.strip_prefix("log save ") {
			let path = first_argument(rest);
			std::fs::write(&path, &state.log)?;
			return Ok(Value::Null);
		}
		if trimmed == "log clear" {
			state.log.clear();
			return Ok(Value::Null);
		}
		if let Some(rest) = trimmed.strip_prefix("log open ") {
			let path = first_argument(rest);
			let restored = std::fs::read_to_string(&path)?;
			state.log.push_str(&restored);
			return Ok(Value::Null);
		}
		if trimmed == "exit" {
			state.alive = false;
			state.listener = None;
			return Ok(Value::Null);
		}
		if let Some(rest) = trimmed.strip_prefix("save ") {
			let path = first_argument(rest);
			if is_image_path(&path) {
				std::fs::write(&path, FAKE_PNG)?;
			}
		}

		let response = match state.responses.get(command) {
			Some(value) => value.clone(),
			None if trimmed == "version" => return Ok(Value::String(FAKE_VERSION.to_string())),
			None => Value::String(String::new()),
		};
		state.log.push_str(&format!("> {command}\n"));
		if let Value::String(text) = &response {
			if !text.is_empty() {
				state.log.push_str(text);
				state.log.push('\n');
			}
		}
		Ok(response)
	}
}

/// PNG signature plus an empty IHDR-less body; enough for byte round-trips.
pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-image";

fn is_image_path(path: &Path) -> bool {
	path.extension()
		.and_then(|ext| ext.to_str())
		.is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
}

/// First word of `rest`, honoring single or double quotes.
fn first_argument(rest: &str) -> PathBuf {
	let rest = rest.trim_start();
	let mut chars = rest.chars();
	match chars.next() {
		Some(quote @ ('"' | '\'')) => PathBuf::from(chars.take_while(|c| *c != quote).collect::<String>()),
		_ => PathBuf::from(rest.split_whitespace().next().unwrap_or_default()),
	}
}

impl ClientFactory for FakeChimeraX {
	fn build(&self, host: IpAddr, port: u16) -> Arc<dyn RemoteClient> {
		self.state.lock().builds += 1;
		Arc::new(FakeClient {
			fake: self.clone(),
			endpoint: format!("fake://{host}:{port}"),
		})
	}
}

struct FakeClient {
	fake: FakeChimeraX,
	endpoint: String,
}

#[async_trait]
impl RemoteClient for FakeClient {
	fn endpoint(&self) -> String {
		self.endpoint.clone()
	}

	async fn run_command(&self, command: &str) -> Result<Value> {
		self.fake.execute(command)
	}
}

/// What a [`FakePlatform`] does when asked to spawn.
#[derive(Clone)]
pub enum SpawnBehavior {
	/// Spawn "succeeds" but nothing comes up.
	Nothing,
	/// Opens the port and makes the fake answer commands.
	Start(FakeChimeraX),
	/// Opens the port but the fake never answers.
	OpenPortOnly(FakeChimeraX),
	/// Spawn itself fails.
	Fail,
}

pub struct FakePlatform {
	kind: PlatformKind,
	executable: Mutex<Option<PathBuf>>,
	behavior: Mutex<SpawnBehavior>,
	locates: AtomicUsize,
	spawns: Mutex<Vec<(PathBuf, LaunchArgs)>>,
}

impl FakePlatform {
	pub fn new(executable: Option<PathBuf>, behavior: SpawnBehavior) -> Arc<Self> {
		Arc::new(Self {
			kind: PlatformKind::detect(),
			executable: Mutex::new(executable),
			behavior: Mutex::new(behavior),
			locates: AtomicUsize::new(0),
			spawns: Mutex::new(Vec::new()),
		})
	}

	pub fn starting(fake: &FakeChimeraX) -> Arc<Self> {
		Self::new(Some(PathBuf::from("/opt/UCSF/ChimeraX/bin/ChimeraX")), SpawnBehavior::Start(fake.clone()))
	}

	pub fn set_behavior(&self, behavior: SpawnBehavior) {
		*self.behavior.lock() = behavior;
	}

	pub fn locate_count(&self) -> usize {
		self.locates.load(Ordering::SeqCst)
	}

	pub fn spawn_count(&self) -> usize {
		self.spawns.lock().len()
	}

	pub fn spawned(&self) -> Vec<(PathBuf, LaunchArgs)> {
		self.spawns.lock().clone()
	}
}

/// Port named in `remotecontrol xmlrpc true port N`.
fn port_from_args(args: &LaunchArgs) -> Option<u16> {
	args.argv().last()?.split_whitespace().last()?.parse().ok()
}

impl Platform for FakePlatform {
	fn kind(&self) -> PlatformKind {
		self.kind
	}

	fn locate(&self) -> Option<PathBuf> {
		self.locates.fetch_add(1, Ordering::SeqCst);
		self.executable.lock().clone()
	}

	fn probe(&self) -> SearchReport {
		let matches = self.executable.lock().clone().into_iter().collect();
		SearchReport {
			platform: self.kind,
			roots: Vec::new(),
			entries: vec![ProbeEntry::new(ProbeKind::Direct, "fake install", matches)],
		}
	}

	fn spawn(&self, executable: &Path, args: &LaunchArgs) -> RuntimeResult<SpawnReport> {
		self.spawns.lock().push((executable.to_path_buf(), args.clone()));
		let behavior = self.behavior.lock().clone();
		let port = port_from_args(args);
		let bring_up = |fake: &FakeChimeraX| -> RuntimeResult<()> {
			if let Some(port) = port {
				fake.open_port(port).map_err(|source| RuntimeError::Spawn {
					program: executable.display().to_string(),
					source,
				})?;
			}
			Ok(())
		};
		match behavior {
			SpawnBehavior::Nothing => {}
			SpawnBehavior::Start(fake) => {
				bring_up(&fake)?;
				fake.set_alive(true);
			}
			SpawnBehavior::OpenPortOnly(fake) => bring_up(&fake)?,
			SpawnBehavior::Fail => {
				return Err(RuntimeError::Spawn {
					program: executable.display().to_string(),
					source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied"),
				});
			}
		}
		Ok(SpawnReport {
			method: SpawnMethod::Direct,
			program: executable.display().to_string(),
			pid: None,
		})
	}
}
