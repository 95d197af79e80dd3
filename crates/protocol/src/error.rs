use thiserror::Error;

/// Errors raised while encoding or decoding XML-RPC documents.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProtocolError {
	/// The server answered with an XML-RPC `<fault>`.
	#[error("XML-RPC fault {code}: {message}")]
	Fault { code: i64, message: String },

	/// The document is not valid XML or not a valid `methodResponse`.
	#[error("malformed XML-RPC response: {0}")]
	Malformed(String),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
