//! Process-wide bridge state, built once at startup and passed to every operation.

use std::sync::Arc;

use chimerax_runtime::{ExecutableLocator, Platform, host_platform};
use tokio_util::sync::CancellationToken;

use crate::channel::{ChannelManager, ClientFactory, XmlRpcFactory};
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::launcher::LaunchConfig;
use crate::session::SessionTracker;

pub struct BridgeContext {
	pub config: BridgeConfig,
	pub launch: LaunchConfig,
	pub channel: ChannelManager,
	pub locator: ExecutableLocator,
	pub session: SessionTracker,
	/// Shared by every command send; held exclusively for the whole log
	/// save/clear/execute/restore sequence.
	pub capture_lock: tokio::sync::RwLock<()>,
	pub cancel: CancellationToken,
}

impl BridgeContext {
	pub fn new(config: BridgeConfig, platform: Arc<dyn Platform>, factory: Arc<dyn ClientFactory>) -> Self {
		let locator = ExecutableLocator::new(platform);
		if let Some(path) = config.chimerax_path.as_deref() {
			if let Err(err) = locator.set_override(path) {
				tracing::warn!(target = "chimerax.locator", %path, error = %err, "ignoring configured ChimeraX path");
			}
		}

		Self {
			launch: LaunchConfig::from(&config.launch),
			channel: ChannelManager::new(factory, config.port),
			locator,
			session: SessionTracker::new(),
			capture_lock: tokio::sync::RwLock::new(()),
			cancel: CancellationToken::new(),
			config,
		}
	}

	/// Host platform strategy and a real XML-RPC client factory.
	pub fn from_config(config: BridgeConfig) -> Result<Self> {
		let factory = XmlRpcFactory::new(config.request_timeout())?;
		Ok(Self::new(config, host_platform(), Arc::new(factory)))
	}

	pub fn platform(&self) -> &Arc<dyn Platform> {
		self.locator.platform()
	}
}
