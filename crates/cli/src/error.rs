use std::io;
use std::path::PathBuf;

use chimerax_protocol::ProtocolError;
use chimerax_runtime::RuntimeError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable failure class carried in every error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
	NotFound,
	NotRunning,
	LaunchFailed,
	LaunchTimeout,
	ConnectionLost,
	InvalidArgument,
	RemoteFailure,
	IoError,
	InternalError,
}

impl ErrorKind {
	pub fn as_str(self) -> &'static str {
		match self {
			ErrorKind::NotFound => "NOT_FOUND",
			ErrorKind::NotRunning => "NOT_RUNNING",
			ErrorKind::LaunchFailed => "LAUNCH_FAILED",
			ErrorKind::LaunchTimeout => "LAUNCH_TIMEOUT",
			ErrorKind::ConnectionLost => "CONNECTION_LOST",
			ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
			ErrorKind::RemoteFailure => "REMOTE_FAILURE",
			ErrorKind::IoError => "IO_ERROR",
			ErrorKind::InternalError => "INTERNAL_ERROR",
		}
	}
}

impl std::fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Error)]
pub enum BridgeError {
	#[error(transparent)]
	Runtime(#[from] RuntimeError),

	#[error("ChimeraX is not running. Please start it with open_chimerax first or set auto_start=true.")]
	NotRunning,

	#[error("{0}")]
	LaunchFailed(String),

	#[error("{0}")]
	LaunchTimeout(String),

	#[error("Connection to ChimeraX lost: {0}. ChimeraX may have closed unexpectedly.")]
	ConnectionLost(String),

	#[error("{0}")]
	InvalidArgument(String),

	#[error("ChimeraX returned a fault ({code}): {message}")]
	RemoteFault { code: i64, message: String },

	#[error("{0}")]
	Remote(String),

	#[error("File not found: {}", .0.display())]
	FileNotFound(PathBuf),

	#[error("I/O error: {0}")]
	Io(#[from] io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("{0}")]
	Internal(String),
}

impl BridgeError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			BridgeError::Runtime(RuntimeError::ExecutableNotFound { .. }) | BridgeError::Runtime(RuntimeError::PathNotFound(_)) => ErrorKind::NotFound,
			BridgeError::Runtime(RuntimeError::EmptyPath) => ErrorKind::InvalidArgument,
			BridgeError::Runtime(RuntimeError::Spawn { .. }) => ErrorKind::LaunchFailed,
			BridgeError::NotRunning => ErrorKind::NotRunning,
			BridgeError::LaunchFailed(_) => ErrorKind::LaunchFailed,
			BridgeError::LaunchTimeout(_) => ErrorKind::LaunchTimeout,
			BridgeError::ConnectionLost(_) => ErrorKind::ConnectionLost,
			BridgeError::InvalidArgument(_) | BridgeError::Json(_) => ErrorKind::InvalidArgument,
			BridgeError::RemoteFault { .. } | BridgeError::Remote(_) => ErrorKind::RemoteFailure,
			BridgeError::FileNotFound(_) => ErrorKind::NotFound,
			BridgeError::Io(_) => ErrorKind::IoError,
			BridgeError::Internal(_) => ErrorKind::InternalError,
		}
	}

	pub fn invalid(message: impl Into<String>) -> Self {
		BridgeError::InvalidArgument(message.into())
	}
}

impl From<ProtocolError> for BridgeError {
	fn from(err: ProtocolError) -> Self {
		match err {
			ProtocolError::Fault { code, message } => BridgeError::RemoteFault { code, message },
			ProtocolError::Malformed(detail) => BridgeError::Remote(format!("Malformed XML-RPC response: {detail}")),
		}
	}
}

pub type Result<T> = std::result::Result<T, BridgeError>;
