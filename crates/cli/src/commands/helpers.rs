//! Structure-level helpers built from plain ChimeraX commands.

use std::path::Path;

use serde_json::{Map, Value, json};

use super::grammar::path_argument;
use super::remote::{CommandOutput, RunOptions, ensure_running, result_text, run_chimerax_command};
use crate::context::BridgeContext;
use crate::error::{BridgeError, Result};

pub struct FetchRequest<'a> {
	pub pdb_id: &'a str,
	pub format: Option<&'a str>,
	pub auto_display: bool,
	pub auto_start: bool,
	pub capture_log: bool,
}

/// `open <id> [format <f>]`, then `view` when `auto_display` is set.
pub async fn fetch_structure(ctx: &BridgeContext, request: FetchRequest<'_>) -> Result<Value> {
	let pdb_id = request.pdb_id.trim();
	if pdb_id.is_empty() {
		return Err(BridgeError::invalid("PDB ID must be a non-empty string"));
	}
	let mut command = format!("open {pdb_id}");
	if let Some(format) = request.format.map(str::trim).filter(|format| !format.is_empty()) {
		command.push_str(&format!(" format {format}"));
	}

	let opened = run_chimerax_command(ctx, &command, RunOptions::new(request.auto_start, request.capture_log)).await?;
	let mut info = Map::new();
	info.insert("pdb_id".into(), json!(pdb_id));
	info.insert("format".into(), json!(request.format));
	info.insert("source".into(), json!("fetch"));
	ctx.session.add_model(info);

	let mut log = opened.log().map(str::to_string);
	if request.auto_display {
		let viewed = run_chimerax_command(ctx, "view", RunOptions::new(false, request.capture_log)).await?;
		if let (Some(log), Some(view_log)) = (log.as_mut(), viewed.log()) {
			log.push('\n');
			log.push_str(view_log);
		}
	}

	let message = format!("Fetched structure {pdb_id}. {}", result_text(opened.result()));
	Ok(match log {
		Some(log) => json!({ "result": message, "log": log }),
		None => Value::String(message),
	})
}

/// Saves a `.cxs` session, appending the extension when missing.
pub async fn save_session(ctx: &BridgeContext, filename: &str, auto_start: bool) -> Result<Value> {
	let filename = session_filename(filename)?;
	let command = format!("save {} format session", path_argument(Path::new(&filename)));
	let output = run_chimerax_command(ctx, &command, RunOptions::new(auto_start, false)).await?;
	ctx.session.set_session_file(filename);
	Ok(output.into_json())
}

pub(crate) fn session_filename(filename: &str) -> Result<String> {
	let filename = filename.trim();
	if filename.is_empty() {
		return Err(BridgeError::invalid("Session filename must be a non-empty string"));
	}
	Ok(if filename.ends_with(".cxs") {
		filename.to_string()
	} else {
		format!("{filename}.cxs")
	})
}

pub struct Visualization<'a> {
	pub representation: Option<&'a str>,
	pub color_scheme: Option<&'a str>,
	pub target: &'a str,
	pub auto_start: bool,
}

/// `style <target> <rep>` then `rainbow <target>` or `color <target> <scheme>`.
pub async fn set_visualization(ctx: &BridgeContext, request: Visualization<'_>) -> Result<Value> {
	let target = request.target;
	let mut commands = Vec::new();
	if let Some(representation) = request.representation.filter(|rep| !rep.is_empty()) {
		commands.push(format!("style {target} {representation}"));
	}
	match request.color_scheme.filter(|scheme| !scheme.is_empty()) {
		Some("rainbow") => commands.push(format!("rainbow {target}")),
		Some(scheme) => commands.push(format!("color {target} {scheme}")),
		None => {}
	}
	if commands.is_empty() {
		return Ok(json!("No visualization changes applied"));
	}

	let mut results = Vec::with_capacity(commands.len());
	for (index, command) in commands.iter().enumerate() {
		let auto_start = request.auto_start && index == 0;
		let output = run_chimerax_command(ctx, command, RunOptions::new(auto_start, false)).await?;
		results.push(result_text(output.result()));
	}
	Ok(Value::String(results.join("; ")))
}

pub async fn measure_distance(ctx: &BridgeContext, atom1: &str, atom2: &str, auto_start: bool) -> Result<Value> {
	if atom1.trim().is_empty() || atom2.trim().is_empty() {
		return Err(BridgeError::invalid("Both atom specifications are required"));
	}
	let command = format!("distance {} {}", atom1.trim(), atom2.trim());
	Ok(run_chimerax_command(ctx, &command, RunOptions::new(auto_start, false)).await?.into_json())
}

/// Opens a `.cxc` script that exists on this machine.
pub async fn run_script(ctx: &BridgeContext, script_file: &str, auto_start: bool) -> Result<Value> {
	let path = Path::new(script_file.trim());
	if path.extension().and_then(|ext| ext.to_str()) != Some("cxc") {
		return Err(BridgeError::invalid("Script file must have .cxc extension"));
	}
	if !path.exists() {
		return Err(BridgeError::FileNotFound(path.to_path_buf()));
	}
	let command = format!("open {}", path_argument(path));
	Ok(run_chimerax_command(ctx, &command, RunOptions::new(auto_start, false)).await?.into_json())
}

pub struct LigandAnalysis<'a> {
	pub protein_spec: &'a str,
	pub ligand_spec: &'a str,
	pub h_bond_cutoff: f64,
	pub contact_cutoff: f64,
	pub auto_start: bool,
	pub capture_log: bool,
}

/// Shows both parts, runs `hbonds` and `contacts`, then selects and styles the
/// interacting residues.
pub async fn analyze_protein_ligand(ctx: &BridgeContext, request: LigandAnalysis<'_>) -> Result<Value> {
	let protein = request.protein_spec;
	let ligand = request.ligand_spec.trim();
	if ligand.is_empty() {
		return Err(BridgeError::invalid("Ligand specification required"));
	}
	let capture = request.capture_log;
	let mut logs = String::new();
	let mut collect = |output: &CommandOutput| {
		if let Some(log) = output.log() {
			logs.push_str(log);
			logs.push('\n');
		}
	};

	for (index, command) in [format!("show {protein}"), format!("show {ligand}"), format!("style {ligand} stick")].iter().enumerate() {
		let auto_start = request.auto_start && index == 0;
		let output = run_chimerax_command(ctx, command, RunOptions::new(auto_start, capture)).await?;
		collect(&output);
	}

	let h_bond_cutoff = cutoff(request.h_bond_cutoff);
	let contact_cutoff = cutoff(request.contact_cutoff);
	let once = RunOptions::new(false, capture);

	let hbonds = run_chimerax_command(
		ctx,
		&format!("hbonds {protein} restrict {ligand} reveal true log true distance {h_bond_cutoff}"),
		once,
	)
	.await?;
	collect(&hbonds);

	let contacts = run_chimerax_command(
		ctx,
		&format!("contacts {protein} restrict {ligand} distance {contact_cutoff} reveal true log true"),
		once,
	)
	.await?;
	collect(&contacts);

	let selection = run_chimerax_command(ctx, &format!("select {protein} & within {contact_cutoff} of {ligand}"), once).await?;
	collect(&selection);

	let styled = run_chimerax_command(ctx, "style sel stick", once).await?;
	collect(&styled);

	let mut info = Map::new();
	info.insert("protein".into(), json!(protein));
	info.insert("ligand".into(), json!(ligand));
	info.insert("analysis".into(), json!("protein-ligand interaction"));
	ctx.session.add_model(info);

	let mut results = Map::new();
	results.insert("hydrogen_bonds".into(), hbonds.result().clone());
	results.insert("contacts".into(), contacts.result().clone());
	if capture {
		results.insert("selection".into(), selection.result().clone());
		results.insert("logs".into(), Value::String(logs));
	}
	Ok(Value::Object(results))
}

/// Whole numbers keep one decimal place, as ChimeraX echoes them.
fn cutoff(value: f64) -> String {
	if value.fract() == 0.0 { format!("{value:.1}") } else { value.to_string() }
}

/// Optionally runs `command`, then returns the tail of the ChimeraX log.
pub async fn get_chimerax_logs(ctx: &BridgeContext, command: Option<&str>, log_lines: i64, auto_start: bool) -> Result<Value> {
	ensure_running(ctx, auto_start).await?;

	if let Some(command) = command.map(str::trim).filter(|command| !command.is_empty()) {
		if let Err(err) = run_chimerax_command(ctx, command, RunOptions::default()).await {
			tracing::warn!(target = "chimerax.dispatch", %command, error = %err, "command before log read failed");
		}
	}

	let _exclusive = ctx.capture_lock.write().await;
	let workdir = tempfile::Builder::new().prefix("chimerax-log").tempdir()?;
	let log_file = workdir.path().join("chimerax_log.html");
	let saved = ctx.channel.run_command(&format!("log save {}", path_argument(&log_file))).await?;

	let content = match tokio::fs::read_to_string(&log_file).await {
		Ok(content) => content,
		Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
			return Err(BridgeError::Remote(format!("Log retrieval via file failed. Command output: {}", result_text(&saved))));
		}
		Err(err) => return Err(err.into()),
	};
	Ok(Value::String(tail_lines(&content, log_lines)))
}

/// Last `count` lines with their terminators; everything when `count <= 0`.
fn tail_lines(content: &str, count: i64) -> String {
	let Ok(count) = usize::try_from(count) else {
		return content.to_string();
	};
	if count == 0 {
		return content.to_string();
	}
	let lines: Vec<&str> = content.split_inclusive('\n').collect();
	lines[lines.len().saturating_sub(count)..].concat()
}
