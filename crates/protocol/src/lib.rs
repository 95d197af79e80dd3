//! Wire codec for the ChimeraX remote-control channel.
//!
//! ChimeraX exposes a single XML-RPC method, `run_command`, once
//! `remotecontrol xmlrpc true` has been issued inside the application. This
//! crate turns calls into `methodCall` documents and `methodResponse`
//! documents back into [`serde_json::Value`]s.
//!
//! # Design Philosophy
//!
//! * Pure data: no sockets, no HTTP, no retries
//! * 1:1 with the wire: every XML-RPC scalar and container is represented
//! * Faults are errors: a `<fault>` response never decodes to a value
//!
//! Transport and lifecycle live in `chimerax-mcp`.

pub mod error;
pub mod xmlrpc;

pub use error::{ProtocolError, Result};
pub use xmlrpc::{RUN_COMMAND, decode_response, encode_call};
