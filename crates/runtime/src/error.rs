use std::path::PathBuf;

use thiserror::Error;

use crate::platform::PlatformKind;

#[derive(Debug, Error)]
pub enum RuntimeError {
	#[error("ChimeraX executable not found on {platform}. Please install ChimeraX or set the path manually with set_chimerax_path")]
	ExecutableNotFound { platform: PlatformKind },

	#[error("Empty path provided")]
	EmptyPath,

	#[error("Path does not exist: {}", .0.display())]
	PathNotFound(PathBuf),

	#[error("Failed to launch {program}: {source}")]
	Spawn {
		program: String,
		#[source]
		source: std::io::Error,
	},
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
