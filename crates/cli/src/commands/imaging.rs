//! Image capture through `save`, and returning image files as payloads.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Local;
use serde_json::{Value, json};

use super::grammar::path_argument;
use super::remote::{RunOptions, ensure_running, run_chimerax_command};
use crate::context::BridgeContext;
use crate::error::{BridgeError, Result};

pub struct CaptureRequest<'a> {
	pub width: i64,
	pub height: i64,
	pub filename: Option<&'a str>,
	pub return_image: bool,
}

fn mime_type(path: &Path) -> Option<&'static str> {
	let ext = path.extension()?.to_str()?.to_ascii_lowercase();
	match ext.as_str() {
		"png" => Some("image/png"),
		"jpg" | "jpeg" => Some("image/jpeg"),
		"gif" => Some("image/gif"),
		_ => None,
	}
}

/// Target path: a timestamped temp file, or `filename` with `.png` appended
/// unless it already names a PNG or JPEG.
fn capture_path(filename: Option<&str>) -> PathBuf {
	match filename.map(str::trim).filter(|name| !name.is_empty()) {
		None => std::env::temp_dir().join(format!("chimerax_capture_{}.png", Local::now().format("%Y%m%d_%H%M%S"))),
		Some(name) => {
			let lower = name.to_ascii_lowercase();
			if lower.ends_with(".png") || lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
				PathBuf::from(name)
			} else {
				PathBuf::from(format!("{name}.png"))
			}
		}
	}
}

/// `{type: "image", mimeType, data, path}` for an image file on disk.
pub async fn image_payload(path: &Path) -> Result<Value> {
	let mime = mime_type(path).ok_or_else(|| BridgeError::invalid(format!("Unsupported image format: {}", path.display())))?;
	let bytes = tokio::fs::read(path).await?;
	Ok(json!({
		"type": "image",
		"mimeType": mime,
		"data": STANDARD.encode(bytes),
		"path": path.display().to_string(),
	}))
}

pub async fn capture_chimerax_image(ctx: &BridgeContext, request: CaptureRequest<'_>) -> Result<Value> {
	if request.width <= 0 || request.height <= 0 {
		return Err(BridgeError::invalid("Image width and height must be positive"));
	}
	if !ctx.channel.is_target_alive().await {
		return Err(BridgeError::NotRunning);
	}

	let path = capture_path(request.filename);
	tracing::info!(target = "chimerax.dispatch", path = %path.display(), width = request.width, height = request.height, "capturing image");
	let command = format!("save {} width {} height {} supersample 3", path_argument(&path), request.width, request.height);
	run_chimerax_command(ctx, &command, RunOptions::default()).await?;

	if !path.exists() {
		return Err(BridgeError::Remote(format!("Failed to save image at {}", path.display())));
	}
	if !request.return_image {
		return Ok(json!(path.display().to_string()));
	}
	image_payload(&path).await
}

pub async fn view_saved_image(filename: &str) -> Result<Value> {
	let path = Path::new(filename.trim());
	if !path.exists() {
		return Err(BridgeError::FileNotFound(path.to_path_buf()));
	}
	image_payload(path).await
}

pub struct MolecularImage<'a> {
	pub commands: Vec<String>,
	pub preset: Option<&'a str>,
	pub capture: CaptureRequest<'a>,
	pub auto_start: bool,
}

/// Applies `preset` and `commands` in order, then captures.
pub async fn create_molecular_image(ctx: &BridgeContext, request: MolecularImage<'_>) -> Result<Value> {
	ensure_running(ctx, request.auto_start).await?;

	if let Some(preset) = request.preset.map(str::trim).filter(|preset| !preset.is_empty()) {
		run_chimerax_command(ctx, &format!("preset {preset}"), RunOptions::default()).await?;
	}
	for command in request.commands.iter().filter(|command| !command.trim().is_empty()) {
		run_chimerax_command(ctx, command, RunOptions::default()).await?;
	}
	capture_chimerax_image(ctx, request.capture).await
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::BridgeConfig;
	use crate::error::ErrorKind;
	use crate::fake::{FAKE_PNG, FakeChimeraX, FakePlatform, SpawnBehavior};

	fn context(fake: &FakeChimeraX) -> BridgeContext {
		let platform = FakePlatform::new(Some(PathBuf::from("/usr/bin/ChimeraX")), SpawnBehavior::Nothing);
		BridgeContext::new(BridgeConfig::default(), platform, fake.factory())
	}

	#[test]
	fn capture_names_get_png_extension() {
		assert_eq!(capture_path(Some("shot")), PathBuf::from("shot.png"));
		assert_eq!(capture_path(Some("shot.JPG")), PathBuf::from("shot.JPG"));
		let temp = capture_path(None);
		assert!(temp.starts_with(std::env::temp_dir()));
		assert!(temp.file_name().unwrap().to_string_lossy().starts_with("chimerax_capture_"));
	}

	#[tokio::test]
	async fn capture_returns_base64_payload() {
		let fake = FakeChimeraX::running();
		let ctx = context(&fake);
		let dir = tempfile::TempDir::new().unwrap();
		let target = dir.path().join("view");

		let request = CaptureRequest {
			width: 640,
			height: 480,
			filename: target.to_str(),
			return_image: true,
		};
		let payload = capture_chimerax_image(&ctx, request).await.unwrap();
		let expected_path = dir.path().join("view.png");
		assert_eq!(payload["type"], "image");
		assert_eq!(payload["mimeType"], "image/png");
		assert_eq!(payload["data"], STANDARD.encode(FAKE_PNG));
		assert_eq!(payload["path"], expected_path.display().to_string());
		assert_eq!(
			fake.issued(),
			[format!("save {} width 640 height 480 supersample 3", path_argument(&expected_path))]
		);
	}

	#[tokio::test]
	async fn capture_path_only() {
		let fake = FakeChimeraX::running();
		let ctx = context(&fake);
		let dir = tempfile::TempDir::new().unwrap();
		let target = dir.path().join("view.jpeg");
		let request = CaptureRequest {
			width: 800,
			height: 600,
			filename: target.to_str(),
			return_image: false,
		};
		assert_eq!(capture_chimerax_image(&ctx, request).await.unwrap(), json!(target.display().to_string()));
	}

	#[tokio::test]
	async fn capture_requires_running_target() {
		let fake = FakeChimeraX::new();
		let ctx = context(&fake);
		let request = CaptureRequest {
			width: 800,
			height: 600,
			filename: None,
			return_image: true,
		};
		assert_eq!(capture_chimerax_image(&ctx, request).await.unwrap_err().kind(), ErrorKind::NotRunning);
	}

	#[tokio::test]
	async fn view_checks_existence_and_format() {
		let dir = tempfile::TempDir::new().unwrap();
		assert_eq!(view_saved_image("/nonexistent/a.png").await.unwrap_err().kind(), ErrorKind::NotFound);

		let bmp = dir.path().join("a.bmp");
		std::fs::write(&bmp, b"BM").unwrap();
		assert_eq!(view_saved_image(bmp.to_str().unwrap()).await.unwrap_err().kind(), ErrorKind::InvalidArgument);

		let gif = dir.path().join("a.gif");
		std::fs::write(&gif, b"GIF89a").unwrap();
		assert_eq!(view_saved_image(gif.to_str().unwrap()).await.unwrap()["mimeType"], "image/gif");
	}

	#[tokio::test]
	async fn molecular_image_applies_preset_then_commands() {
		let fake = FakeChimeraX::running();
		let ctx = context(&fake);
		let dir = tempfile::TempDir::new().unwrap();
		let target = dir.path().join("figure.png");
		let request = MolecularImage {
			commands: vec!["color red".into(), "lighting soft".into()],
			preset: Some("publication"),
			capture: CaptureRequest {
				width: 100,
				height: 100,
				filename: target.to_str(),
				return_image: false,
			},
			auto_start: false,
		};
		create_molecular_image(&ctx, request).await.unwrap();
		let issued = fake.issued();
		assert_eq!(issued[..3], ["preset publication", "color red", "lighting soft"]);
		assert!(issued[3].starts_with("save "));
	}
}
