//! The XML-RPC control channel to a running ChimeraX.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chimerax_protocol::{RUN_COMMAND, decode_response, encode_call};
use chimerax_runtime::{LOOPBACK, ReadyState, WaitOptions};
use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{BridgeError, Result};

/// A handle that can run one ChimeraX command and return its result.
#[async_trait]
pub trait RemoteClient: Send + Sync {
	fn endpoint(&self) -> String;

	async fn run_command(&self, command: &str) -> Result<Value>;
}

/// Builds a client bound to `host:port`.
pub trait ClientFactory: Send + Sync {
	fn build(&self, host: IpAddr, port: u16) -> Arc<dyn RemoteClient>;
}

pub struct XmlRpcClient {
	http: reqwest::Client,
	url: String,
}

impl XmlRpcClient {
	pub fn new(http: reqwest::Client, host: IpAddr, port: u16) -> Self {
		Self {
			http,
			url: format!("http://{host}:{port}/RPC2"),
		}
	}
}

fn transport_error(err: reqwest::Error) -> BridgeError {
	if err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() {
		BridgeError::ConnectionLost(err.to_string())
	} else {
		BridgeError::Remote(format!("XML-RPC transport error: {err}"))
	}
}

#[async_trait]
impl RemoteClient for XmlRpcClient {
	fn endpoint(&self) -> String {
		self.url.clone()
	}

	async fn run_command(&self, command: &str) -> Result<Value> {
		let body = encode_call(RUN_COMMAND, &[Value::String(command.to_string())]);
		let response = self
			.http
			.post(&self.url)
			.header(reqwest::header::CONTENT_TYPE, "text/xml")
			.body(body)
			.send()
			.await
			.map_err(transport_error)?;

		let status = response.status();
		if !status.is_success() {
			return Err(BridgeError::Remote(format!("XML-RPC server answered HTTP {status}")));
		}
		let text = response.text().await.map_err(transport_error)?;
		Ok(decode_response(&text)?)
	}
}

pub struct XmlRpcFactory {
	http: reqwest::Client,
}

impl XmlRpcFactory {
	pub fn new(request_timeout: Duration) -> Result<Self> {
		let http = reqwest::Client::builder()
			.timeout(request_timeout)
			.no_proxy()
			.build()
			.map_err(|err| BridgeError::Internal(format!("failed to build HTTP client: {err}")))?;
		Ok(Self { http })
	}
}

impl ClientFactory for XmlRpcFactory {
	fn build(&self, host: IpAddr, port: u16) -> Arc<dyn RemoteClient> {
		Arc::new(XmlRpcClient::new(self.http.clone(), host, port))
	}
}

struct ChannelState {
	port: u16,
	client: Option<Arc<dyn RemoteClient>>,
}

/// Owns the target port and the lazily built client for it.
///
/// Port changes and client rebuilds happen under one lock; callers clone the
/// `Arc` out before awaiting on it.
pub struct ChannelManager {
	factory: Arc<dyn ClientFactory>,
	state: Mutex<ChannelState>,
}

impl ChannelManager {
	pub fn new(factory: Arc<dyn ClientFactory>, port: u16) -> Self {
		Self {
			factory,
			state: Mutex::new(ChannelState { port, client: None }),
		}
	}

	pub fn host(&self) -> IpAddr {
		LOOPBACK
	}

	pub fn port(&self) -> u16 {
		self.state.lock().port
	}

	/// Updates the port, rebuilding the client if one already exists.
	pub fn set_port(&self, port: u16) {
		let mut state = self.state.lock();
		state.port = port;
		if state.client.is_some() {
			state.client = Some(self.factory.build(LOOPBACK, port));
		}
		tracing::info!(target = "chimerax.channel", port, rebuilt = state.client.is_some(), "XML-RPC port set");
	}

	/// (Re)creates the client, optionally switching ports first.
	pub fn build_client(&self, port: Option<u16>) -> Arc<dyn RemoteClient> {
		let mut state = self.state.lock();
		if let Some(port) = port {
			state.port = port;
		}
		let client = self.factory.build(LOOPBACK, state.port);
		tracing::debug!(target = "chimerax.channel", endpoint = %client.endpoint(), "built XML-RPC client");
		state.client = Some(client.clone());
		client
	}

	pub fn client(&self) -> Arc<dyn RemoteClient> {
		let mut state = self.state.lock();
		match &state.client {
			Some(client) => client.clone(),
			None => {
				let client = self.factory.build(LOOPBACK, state.port);
				state.client = Some(client.clone());
				client
			}
		}
	}

	pub fn has_client(&self) -> bool {
		self.state.lock().client.is_some()
	}

	pub fn endpoint(&self) -> Option<String> {
		self.state.lock().client.as_ref().map(|client| client.endpoint())
	}

	pub async fn wait_until_ready(&self, port: Option<u16>, options: WaitOptions, cancel: &CancellationToken) -> ReadyState {
		let port = port.unwrap_or_else(|| self.port());
		tracing::info!(target = "chimerax.channel", port, timeout_ms = options.timeout.as_millis() as u64, "waiting for XML-RPC port");
		chimerax_runtime::wait_until_ready(LOOPBACK, port, options, cancel).await
	}

	/// Sends `version`; any failure reads as not alive.
	pub async fn is_target_alive(&self) -> bool {
		match self.client().run_command("version").await {
			Ok(_) => true,
			Err(err) => {
				tracing::debug!(target = "chimerax.channel", error = %err, "ChimeraX not reachable");
				false
			}
		}
	}

	pub async fn run_command(&self, command: &str) -> Result<Value> {
		tracing::debug!(target = "chimerax.channel", %command, "run_command");
		self.client().run_command(command).await
	}
}
