//! Local operations: the registry, argument binding, and one module per concern.

pub mod args;
pub mod diagnostics;
pub mod grammar;
pub mod helpers;
pub mod imaging;
pub mod lifecycle;
pub mod registry;
pub mod remote;

use chimerax_runtime::PlatformKind;
use serde_json::Value;

pub use args::BoundArgs;
pub use registry::{Operation, Param, ParamDefault, ParamKind};
pub use remote::{CommandOutput, RunOptions, run_chimerax_command, run_with_log_capture};

use crate::context::BridgeContext;
use crate::error::{BridgeError, Result};

/// Runs a bound local operation against `ctx`.
pub async fn execute(ctx: &BridgeContext, args: &BoundArgs) -> Result<Value> {
	use Operation as Op;

	match args.operation() {
		Op::InitializeServerProxy => Ok(lifecycle::initialize_server_proxy(ctx, args.port("port")?)),
		Op::SetXmlrpcPort => {
			let port = args.port("port")?.ok_or_else(|| BridgeError::invalid("A port is required"))?;
			Ok(lifecycle::set_xmlrpc_port(ctx, port))
		}
		Op::IsChimeraxRunning => Ok(lifecycle::is_chimerax_running(ctx).await),
		Op::GetChimeraxExecutablePath => lifecycle::get_chimerax_executable_path(ctx),
		Op::SetChimeraxPath => lifecycle::set_chimerax_path(ctx, &args.required_string("path")?),
		Op::OpenChimerax => lifecycle::open_chimerax(ctx, args.port("port")?).await,
		Op::CloseChimerax => lifecycle::close_chimerax(ctx, args.string("save_session_file")?.as_deref()).await,
		Op::RunChimeraxCommand => {
			let options = RunOptions::new(args.flag("auto_start")?, args.flag("capture_log")?);
			Ok(run_chimerax_command(ctx, &args.required_string("command")?, options).await?.into_json())
		}
		Op::RunScript => helpers::run_script(ctx, &args.required_string("script_file")?, args.flag("auto_start")?).await,
		Op::FetchStructure => {
			let pdb_id = args.required_string("pdb_id")?;
			let format = args.string("format")?;
			let request = helpers::FetchRequest {
				pdb_id: &pdb_id,
				format: format.as_deref(),
				auto_display: args.flag("auto_display")?,
				auto_start: args.flag("auto_start")?,
				capture_log: args.flag("capture_log")?,
			};
			helpers::fetch_structure(ctx, request).await
		}
		Op::SaveSession => helpers::save_session(ctx, &args.required_string("filename")?, args.flag("auto_start")?).await,
		Op::SetVisualization => {
			let representation = args.string("representation")?;
			let color_scheme = args.string("color_scheme")?;
			let target = args.required_string("target")?;
			let request = helpers::Visualization {
				representation: representation.as_deref(),
				color_scheme: color_scheme.as_deref(),
				target: &target,
				auto_start: args.flag("auto_start")?,
			};
			helpers::set_visualization(ctx, request).await
		}
		Op::MeasureDistance => {
			let atom1 = args.required_string("atom1")?;
			let atom2 = args.required_string("atom2")?;
			helpers::measure_distance(ctx, &atom1, &atom2, args.flag("auto_start")?).await
		}
		Op::GetSessionStatus => lifecycle::get_session_status(ctx).await,
		Op::AnalyzeProteinLigand => {
			let protein_spec = args.required_string("protein_spec")?;
			let ligand_spec = args.required_string("ligand_spec")?;
			let request = helpers::LigandAnalysis {
				protein_spec: &protein_spec,
				ligand_spec: &ligand_spec,
				h_bond_cutoff: args.number("h_bond_cutoff")?.unwrap_or(3.5),
				contact_cutoff: args.number("contact_cutoff")?.unwrap_or(4.0),
				auto_start: args.flag("auto_start")?,
				capture_log: args.flag("capture_log")?,
			};
			helpers::analyze_protein_ligand(ctx, request).await
		}
		Op::GetChimeraxLogs => {
			let command = args.string("command")?;
			let log_lines = args.integer("log_lines")?.unwrap_or(20);
			helpers::get_chimerax_logs(ctx, command.as_deref(), log_lines, args.flag("auto_start")?).await
		}
		Op::CaptureChimeraxImage => {
			let filename = args.string("filename")?;
			imaging::capture_chimerax_image(ctx, capture_request(args, filename.as_deref())?).await
		}
		Op::ViewSavedImage => imaging::view_saved_image(&args.required_string("filename")?).await,
		Op::CreateMolecularImage => {
			let filename = args.string("filename")?;
			let preset = args.string("preset")?;
			let request = imaging::MolecularImage {
				commands: args.string_list("commands")?,
				preset: preset.as_deref(),
				capture: capture_request(args, filename.as_deref())?,
				auto_start: args.flag("auto_start")?,
			};
			imaging::create_molecular_image(ctx, request).await
		}
		Op::DiagnoseChimerax => Ok(diagnostics::diagnose_chimerax(ctx).await),
		Op::DebugMacPathIssue => Ok(diagnostics::debug_path_issue(ctx, PlatformKind::Macos)),
		Op::DebugWindowsPathIssue => Ok(diagnostics::debug_path_issue(ctx, PlatformKind::Windows)),
		Op::DebugLinuxPathIssue => Ok(diagnostics::debug_path_issue(ctx, PlatformKind::Linux)),
		Op::GetCommandHistory => lifecycle::get_command_history(ctx, args.integer("limit")?),
		Op::ClearCommandHistory => Ok(lifecycle::clear_command_history(ctx)),
		Op::ExportSession => lifecycle::export_session(ctx, args.string("filename")?.as_deref()),
		Op::ImportSession => lifecycle::import_session(ctx, &args.required_string("filename")?),
	}
}

fn capture_request<'a>(args: &BoundArgs, filename: Option<&'a str>) -> Result<imaging::CaptureRequest<'a>> {
	Ok(imaging::CaptureRequest {
		width: args.integer("width")?.unwrap_or(800),
		height: args.integer("height")?.unwrap_or(600),
		filename,
		return_image: args.flag("return_image")?,
	})
}
