//! Raw port probing and the bounded readiness wait used at launch.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
	pub timeout: Duration,
	pub interval: Duration,
}

impl Default for WaitOptions {
	fn default() -> Self {
		Self {
			timeout: Duration::from_secs(30),
			interval: Duration::from_millis(500),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
	Ready,
	TimedOut,
	Cancelled,
}

impl ReadyState {
	pub fn is_ready(self) -> bool {
		self == ReadyState::Ready
	}
}

/// One TCP connect attempt. Any error (refused, reset, timeout) reads as closed.
pub async fn port_is_open(host: IpAddr, port: u16, timeout: Duration) -> bool {
	let addr = SocketAddr::new(host, port);
	matches!(tokio::time::timeout(timeout, TcpStream::connect(addr)).await, Ok(Ok(_)))
}

/// Polls `host:port` every `options.interval` until a connect succeeds or `options.timeout` elapses.
///
/// When the port never opens the call returns [`ReadyState::TimedOut`] no
/// earlier than `timeout` and no later than `timeout + interval`.
pub async fn wait_until_ready(host: IpAddr, port: u16, options: WaitOptions, cancel: &CancellationToken) -> ReadyState {
	let interval = options.interval.max(Duration::from_millis(1));
	let deadline = Instant::now() + options.timeout;
	let mut attempts = 0u32;

	loop {
		if cancel.is_cancelled() {
			return ReadyState::Cancelled;
		}

		attempts += 1;
		let now = Instant::now();
		let budget = interval.min(deadline.saturating_duration_since(now)).max(Duration::from_millis(1));
		if port_is_open(host, port, budget).await {
			tracing::debug!(target = "chimerax.channel", port, attempts, "port is open");
			return ReadyState::Ready;
		}

		let now = Instant::now();
		if now >= deadline {
			tracing::debug!(target = "chimerax.channel", port, attempts, "port never opened");
			return ReadyState::TimedOut;
		}

		let pause = interval.min(deadline - now);
		tokio::select! {
			_ = cancel.cancelled() => return ReadyState::Cancelled,
			_ = tokio::time::sleep(pause) => {}
		}
	}
}
