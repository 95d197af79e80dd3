//! The fixed set of local operations and their parameter tables.

use serde::Serialize;
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
	String,
	Integer,
	Number,
	Boolean,
	/// A single command string or a list of them.
	StringList,
}

impl ParamKind {
	fn schema(self) -> Value {
		match self {
			ParamKind::String => json!({ "type": "string" }),
			ParamKind::Integer => json!({ "type": "integer" }),
			ParamKind::Number => json!({ "type": "number" }),
			ParamKind::Boolean => json!({ "type": "boolean" }),
			ParamKind::StringList => json!({
				"anyOf": [
					{ "type": "string" },
					{ "type": "array", "items": { "type": "string" } }
				]
			}),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDefault {
	Bool(bool),
	Int(i64),
	Float(f64),
	Str(&'static str),
}

impl ParamDefault {
	pub fn to_value(self) -> Value {
		match self {
			ParamDefault::Bool(value) => json!(value),
			ParamDefault::Int(value) => json!(value),
			ParamDefault::Float(value) => json!(value),
			ParamDefault::Str(value) => json!(value),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param {
	pub name: &'static str,
	pub kind: ParamKind,
	pub required: bool,
	pub default: Option<ParamDefault>,
	pub description: &'static str,
}

const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Param {
	Param {
		name,
		kind,
		required: true,
		default: None,
		description,
	}
}

const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Param {
	Param {
		name,
		kind,
		required: false,
		default: None,
		description,
	}
}

const fn defaulted(name: &'static str, kind: ParamKind, default: ParamDefault, description: &'static str) -> Param {
	Param {
		name,
		kind,
		required: false,
		default: Some(default),
		description,
	}
}

const AUTO_START_OFF: Param = defaulted("auto_start", ParamKind::Boolean, ParamDefault::Bool(false), "Launch ChimeraX first if it is not running");
const AUTO_START_ON: Param = defaulted("auto_start", ParamKind::Boolean, ParamDefault::Bool(true), "Launch ChimeraX first if it is not running");
const CAPTURE_LOG: Param = defaulted("capture_log", ParamKind::Boolean, ParamDefault::Bool(false), "Also return the log output produced by the command");
const PORT: Param = optional("port", ParamKind::Integer, "XML-RPC port");
const WIDTH: Param = defaulted("width", ParamKind::Integer, ParamDefault::Int(800), "Image width in pixels");
const HEIGHT: Param = defaulted("height", ParamKind::Integer, ParamDefault::Int(600), "Image height in pixels");
const IMAGE_FILE: Param = optional("filename", ParamKind::String, "Output image path; a temporary file when omitted");
const RETURN_IMAGE: Param = defaulted("return_image", ParamKind::Boolean, ParamDefault::Bool(true), "Return image data instead of only the path");

/// A locally implemented operation. Anything else is forwarded to ChimeraX.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
	InitializeServerProxy,
	SetXmlrpcPort,
	IsChimeraxRunning,
	GetChimeraxExecutablePath,
	SetChimeraxPath,
	OpenChimerax,
	CloseChimerax,
	RunChimeraxCommand,
	RunScript,
	FetchStructure,
	SaveSession,
	SetVisualization,
	MeasureDistance,
	GetSessionStatus,
	AnalyzeProteinLigand,
	GetChimeraxLogs,
	CaptureChimeraxImage,
	ViewSavedImage,
	CreateMolecularImage,
	DiagnoseChimerax,
	DebugMacPathIssue,
	DebugWindowsPathIssue,
	DebugLinuxPathIssue,
	GetCommandHistory,
	ClearCommandHistory,
	ExportSession,
	ImportSession,
}

impl Operation {
	pub const ALL: [Operation; 27] = [
		Operation::InitializeServerProxy,
		Operation::SetXmlrpcPort,
		Operation::IsChimeraxRunning,
		Operation::GetChimeraxExecutablePath,
		Operation::SetChimeraxPath,
		Operation::OpenChimerax,
		Operation::CloseChimerax,
		Operation::RunChimeraxCommand,
		Operation::RunScript,
		Operation::FetchStructure,
		Operation::SaveSession,
		Operation::SetVisualization,
		Operation::MeasureDistance,
		Operation::GetSessionStatus,
		Operation::AnalyzeProteinLigand,
		Operation::GetChimeraxLogs,
		Operation::CaptureChimeraxImage,
		Operation::ViewSavedImage,
		Operation::CreateMolecularImage,
		Operation::DiagnoseChimerax,
		Operation::DebugMacPathIssue,
		Operation::DebugWindowsPathIssue,
		Operation::DebugLinuxPathIssue,
		Operation::GetCommandHistory,
		Operation::ClearCommandHistory,
		Operation::ExportSession,
		Operation::ImportSession,
	];

	pub fn lookup(name: &str) -> Option<Operation> {
		Self::ALL.into_iter().find(|op| op.name() == name)
	}

	pub fn name(self) -> &'static str {
		match self {
			Operation::InitializeServerProxy => "initialize_server_proxy",
			Operation::SetXmlrpcPort => "set_xmlrpc_port",
			Operation::IsChimeraxRunning => "is_chimerax_running",
			Operation::GetChimeraxExecutablePath => "get_chimerax_executable_path",
			Operation::SetChimeraxPath => "set_chimerax_path",
			Operation::OpenChimerax => "open_chimerax",
			Operation::CloseChimerax => "close_chimerax",
			Operation::RunChimeraxCommand => "run_chimerax_command",
			Operation::RunScript => "run_script",
			Operation::FetchStructure => "fetch_structure",
			Operation::SaveSession => "save_session",
			Operation::SetVisualization => "set_visualization",
			Operation::MeasureDistance => "measure_distance",
			Operation::GetSessionStatus => "get_session_status",
			Operation::AnalyzeProteinLigand => "analyze_protein_ligand",
			Operation::GetChimeraxLogs => "get_chimerax_logs",
			Operation::CaptureChimeraxImage => "capture_chimerax_image",
			Operation::ViewSavedImage => "view_saved_image",
			Operation::CreateMolecularImage => "create_molecular_image",
			Operation::DiagnoseChimerax => "diagnose_chimerax",
			Operation::DebugMacPathIssue => "debug_mac_path_issue",
			Operation::DebugWindowsPathIssue => "debug_windows_path_issue",
			Operation::DebugLinuxPathIssue => "debug_linux_path_issue",
			Operation::GetCommandHistory => "get_command_history",
			Operation::ClearCommandHistory => "clear_command_history",
			Operation::ExportSession => "export_session",
			Operation::ImportSession => "import_session",
		}
	}

	pub fn description(self) -> &'static str {
		match self {
			Operation::InitializeServerProxy => "Create the XML-RPC client, optionally switching to another port",
			Operation::SetXmlrpcPort => "Set the XML-RPC port, rebuilding an existing client",
			Operation::IsChimeraxRunning => "Check whether ChimeraX answers on the XML-RPC port",
			Operation::GetChimeraxExecutablePath => "Locate the ChimeraX executable for this platform",
			Operation::SetChimeraxPath => "Use an explicit ChimeraX executable instead of searching",
			Operation::OpenChimerax => "Start ChimeraX with remote control enabled",
			Operation::CloseChimerax => "Close ChimeraX, optionally saving a session file first",
			Operation::RunChimeraxCommand => "Run a ChimeraX command",
			Operation::RunScript => "Run a ChimeraX command script (.cxc)",
			Operation::FetchStructure => "Fetch a structure from the PDB and display it",
			Operation::SaveSession => "Save the current ChimeraX session (.cxs)",
			Operation::SetVisualization => "Set representation and coloring for a target",
			Operation::MeasureDistance => "Measure the distance between two atoms",
			Operation::GetSessionStatus => "Report the bridge session state",
			Operation::AnalyzeProteinLigand => "Find hydrogen bonds and contacts between a protein and a ligand",
			Operation::GetChimeraxLogs => "Read recent lines from the ChimeraX log",
			Operation::CaptureChimeraxImage => "Save the current view as an image",
			Operation::ViewSavedImage => "Return a previously saved image",
			Operation::CreateMolecularImage => "Apply a preset and commands, then capture an image",
			Operation::DiagnoseChimerax => "Report on the ChimeraX installation and connection",
			Operation::DebugMacPathIssue => "Show every macOS location searched for ChimeraX",
			Operation::DebugWindowsPathIssue => "Show every Windows location searched for ChimeraX",
			Operation::DebugLinuxPathIssue => "Show every Linux location searched for ChimeraX",
			Operation::GetCommandHistory => "List commands recorded in this session",
			Operation::ClearCommandHistory => "Clear the recorded command history",
			Operation::ExportSession => "Write the session history to a JSON file",
			Operation::ImportSession => "Load session history from a JSON file",
		}
	}

	pub fn params(self) -> &'static [Param] {
		use ParamKind as K;

		match self {
			Operation::InitializeServerProxy | Operation::OpenChimerax => const { &[PORT] },
			Operation::SetXmlrpcPort => const { &[required("port", K::Integer, "XML-RPC port")] },
			Operation::SetChimeraxPath => const { &[required("path", K::String, "Path to the ChimeraX executable")] },
			Operation::CloseChimerax => const { &[optional("save_session_file", K::String, "Session file to save before closing")] },
			Operation::RunChimeraxCommand => const { &[required("command", K::String, "ChimeraX command line"), AUTO_START_OFF, CAPTURE_LOG] },
			Operation::RunScript => const { &[required("script_file", K::String, "Path to a .cxc script"), AUTO_START_OFF] },
			Operation::FetchStructure => const {
				&[
					required("pdb_id", K::String, "PDB identifier"),
					optional("format", K::String, "Fetch format, e.g. mmcif or pdb"),
					defaulted("auto_display", K::Boolean, ParamDefault::Bool(true), "Run `view` after opening"),
					AUTO_START_ON,
					CAPTURE_LOG,
				]
			},
			Operation::SaveSession => const { &[required("filename", K::String, "Session file; .cxs is appended when missing"), AUTO_START_OFF] },
			Operation::SetVisualization => const {
				&[
					defaulted("representation", K::String, ParamDefault::Str("cartoon"), "Style, e.g. cartoon, stick, sphere"),
					optional("color_scheme", K::String, "Color name, or rainbow"),
					defaulted("target", K::String, ParamDefault::Str("protein"), "Atom specification"),
					AUTO_START_OFF,
				]
			},
			Operation::MeasureDistance => const {
				&[
					required("atom1", K::String, "First atom specification"),
					required("atom2", K::String, "Second atom specification"),
					AUTO_START_OFF,
				]
			},
			Operation::AnalyzeProteinLigand => const {
				&[
					defaulted("protein_spec", K::String, ParamDefault::Str("protein"), "Protein atom specification"),
					required("ligand_spec", K::String, "Ligand atom specification"),
					defaulted("h_bond_cutoff", K::Number, ParamDefault::Float(3.5), "Hydrogen bond distance cutoff in angstroms"),
					defaulted("contact_cutoff", K::Number, ParamDefault::Float(4.0), "Contact distance cutoff in angstroms"),
					AUTO_START_OFF,
					CAPTURE_LOG,
				]
			},
			Operation::GetChimeraxLogs => const {
				&[
					optional("command", K::String, "Command to run before reading the log"),
					defaulted("log_lines", K::Integer, ParamDefault::Int(20), "Number of trailing lines; 0 for all"),
					AUTO_START_OFF,
				]
			},
			Operation::CaptureChimeraxImage => const { &[WIDTH, HEIGHT, IMAGE_FILE, RETURN_IMAGE] },
			Operation::ViewSavedImage => const { &[required("filename", K::String, "Image file to read")] },
			Operation::CreateMolecularImage => const {
				&[
					optional("commands", K::StringList, "Commands to run before capturing"),
					optional("preset", K::String, "Preset name passed to `preset`"),
					WIDTH,
					HEIGHT,
					IMAGE_FILE,
					RETURN_IMAGE,
					AUTO_START_ON,
				]
			},
			Operation::GetCommandHistory => const { &[optional("limit", K::Integer, "Only the most recent entries")] },
			Operation::ExportSession => const { &[optional("filename", K::String, "Export file; timestamped when omitted")] },
			Operation::ImportSession => const { &[required("filename", K::String, "Previously exported session file")] },
			Operation::IsChimeraxRunning
			| Operation::GetChimeraxExecutablePath
			| Operation::GetSessionStatus
			| Operation::DiagnoseChimerax
			| Operation::DebugMacPathIssue
			| Operation::DebugWindowsPathIssue
			| Operation::DebugLinuxPathIssue
			| Operation::ClearCommandHistory => &[],
		}
	}

	/// JSON Schema for the operation's named parameters.
	pub fn input_schema(self) -> Value {
		let mut properties = Map::new();
		let mut required = Vec::new();
		for param in self.params() {
			let mut schema = param.kind.schema();
			if let Value::Object(fields) = &mut schema {
				fields.insert("description".into(), json!(param.description));
				if let Some(default) = param.default {
					fields.insert("default".into(), default.to_value());
				}
			}
			properties.insert(param.name.into(), schema);
			if param.required {
				required.push(param.name);
			}
		}
		json!({
			"type": "object",
			"properties": properties,
			"required": required,
		})
	}

	/// Registry entry as printed by `chimerax-mcp tools`.
	pub fn describe(self) -> Value {
		let params: Vec<Value> = self
			.params()
			.iter()
			.map(|param| {
				json!({
					"name": param.name,
					"kind": param.kind,
					"required": param.required,
					"default": param.default.map(ParamDefault::to_value),
				})
			})
			.collect();
		json!({
			"name": self.name(),
			"description": self.description(),
			"params": params,
		})
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashSet;

	use super::*;

	#[test]
	fn lookup_by_name() {
		assert_eq!(Operation::lookup("open_chimerax"), Some(Operation::OpenChimerax));
		assert_eq!(Operation::lookup("get_chimerax_logs"), Some(Operation::GetChimeraxLogs));
		assert_eq!(Operation::lookup("import_session"), Some(Operation::ImportSession));
	}

	#[test]
	fn remote_commands_are_not_operations() {
		assert_eq!(Operation::lookup("open"), None);
		assert_eq!(Operation::lookup("select"), None);
		assert_eq!(Operation::lookup(""), None);
	}

	#[test]
	fn names_round_trip_and_are_unique() {
		let names: HashSet<_> = Operation::ALL.iter().map(|op| op.name()).collect();
		assert_eq!(names.len(), Operation::ALL.len());
		for op in Operation::ALL {
			assert_eq!(Operation::lookup(op.name()), Some(op));
		}
	}

	#[test]
	fn param_names_unique_per_operation() {
		for op in Operation::ALL {
			let names: HashSet<_> = op.params().iter().map(|param| param.name).collect();
			assert_eq!(names.len(), op.params().len(), "{}", op.name());
		}
	}

	#[test]
	fn schema_lists_required_and_defaults() {
		let schema = Operation::AnalyzeProteinLigand.input_schema();
		assert_eq!(schema["required"], json!(["ligand_spec"]));
		assert_eq!(schema["properties"]["h_bond_cutoff"]["default"], json!(3.5));
		assert_eq!(schema["properties"]["protein_spec"]["default"], "protein");

		let empty = Operation::IsChimeraxRunning.input_schema();
		assert_eq!(empty["properties"], json!({}));
	}

	#[test]
	fn fetch_structure_auto_starts_by_default() {
		let auto_start = Operation::FetchStructure.params().iter().find(|param| param.name == "auto_start").unwrap();
		assert_eq!(auto_start.default, Some(ParamDefault::Bool(true)));
	}
}
