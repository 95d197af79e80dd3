//! Host-side plumbing for driving a ChimeraX process.
//!
//! * [`locator`]: resolves the ChimeraX executable (override, cache, discovery)
//! * [`platform`]: one [`Platform`] strategy per host OS for discovery and detached spawn
//! * [`search`]: install-root candidates shared by discovery and diagnostics
//! * [`process`]: raw port probing and the bounded readiness wait

pub mod error;
pub mod locator;
pub mod platform;
pub mod process;
pub mod search;

pub use error::{Result, RuntimeError};
pub use locator::ExecutableLocator;
pub use platform::{LaunchArgs, Platform, PlatformKind, SpawnMethod, SpawnReport, host_platform};
pub use process::{LOOPBACK, ReadyState, WaitOptions, port_is_open, wait_until_ready};
pub use search::{Candidate, ProbeEntry, SearchReport, SearchRoots};
