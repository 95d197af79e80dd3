//! XML-RPC `methodCall` encoding and `methodResponse` decoding.
//!
//! Values map onto [`serde_json::Value`]:
//!
//! | XML-RPC | JSON |
//! |---|---|
//! | `string`, untyped text, `dateTime.iso8601` | string |
//! | `int`, `i4`, `i8` | integer |
//! | `double` | number |
//! | `boolean` | bool |
//! | `nil` | null |
//! | `base64` | string (decoded when it is UTF-8) |
//! | `array` | array |
//! | `struct` | object |

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use serde_json::{Map, Number, Value};

use crate::error::{ProtocolError, Result};

/// The single method exposed by ChimeraX's remote-control server.
pub const RUN_COMMAND: &str = "run_command";

/// Serializes a `methodCall` document for `method` with positional `params`.
pub fn encode_call(method: &str, params: &[Value]) -> String {
	let mut out = String::with_capacity(160);
	out.push_str("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
	out.push_str(&escape(method));
	out.push_str("</methodName><params>");
	for param in params {
		out.push_str("<param>");
		write_value(&mut out, param);
		out.push_str("</param>");
	}
	out.push_str("</params></methodCall>\n");
	out
}

fn write_value(out: &mut String, value: &Value) {
	out.push_str("<value>");
	match value {
		Value::Null => out.push_str("<nil/>"),
		Value::Bool(flag) => {
			out.push_str(if *flag { "<boolean>1</boolean>" } else { "<boolean>0</boolean>" });
		}
		Value::Number(number) => write_number(out, number),
		Value::String(text) => {
			out.push_str("<string>");
			out.push_str(&escape(text.as_str()));
			out.push_str("</string>");
		}
		Value::Array(items) => {
			out.push_str("<array><data>");
			for item in items {
				write_value(out, item);
			}
			out.push_str("</data></array>");
		}
		Value::Object(members) => {
			out.push_str("<struct>");
			for (name, member) in members {
				out.push_str("<member><name>");
				out.push_str(&escape(name.as_str()));
				out.push_str("</name>");
				write_value(out, member);
				out.push_str("</member>");
			}
			out.push_str("</struct>");
		}
	}
	out.push_str("</value>");
}

fn write_number(out: &mut String, number: &Number) {
	match number.as_i64() {
		Some(int) if i32::try_from(int).is_ok() => out.push_str(&format!("<int>{int}</int>")),
		Some(int) => out.push_str(&format!("<i8>{int}</i8>")),
		None => {
			let double = number.as_f64().unwrap_or_default();
			out.push_str(&format!("<double>{double}</double>"));
		}
	}
}

/// Decodes a `methodResponse` document.
///
/// Returns the first `<param>` value, `null` for an empty `<params>`, and
/// [`ProtocolError::Fault`] when the server reported a fault.
pub fn decode_response(body: &str) -> Result<Value> {
	let root = parse_document(body)?;
	let response = root.child("methodResponse").ok_or_else(|| malformed("missing <methodResponse>"))?;

	if let Some(fault) = response.child("fault") {
		let value = fault.child("value").ok_or_else(|| malformed("fault without <value>"))?;
		return Err(fault_from(decode_value(value)?));
	}

	let params = response.child("params").ok_or_else(|| malformed("missing <params>"))?;
	match params.children_named("param").next() {
		Some(param) => decode_value(param.child("value").ok_or_else(|| malformed("param without <value>"))?),
		None => Ok(Value::Null),
	}
}

fn fault_from(value: Value) -> ProtocolError {
	let code = value.get("faultCode").and_then(Value::as_i64).unwrap_or_default();
	let message = value
		.get("faultString")
		.and_then(Value::as_str)
		.unwrap_or("unknown fault")
		.to_string();
	ProtocolError::Fault { code, message }
}

fn decode_value(value: &Element) -> Result<Value> {
	let Some(typed) = value.children.first() else {
		return Ok(Value::String(value.text.clone()));
	};

	match typed.name.as_str() {
		"string" => Ok(Value::String(typed.text.clone())),
		"int" | "i4" | "i8" => typed
			.text
			.trim()
			.parse::<i64>()
			.map(Value::from)
			.map_err(|_| malformed(format!("invalid integer {:?}", typed.text))),
		"boolean" => match typed.text.trim() {
			"1" | "true" => Ok(Value::Bool(true)),
			"0" | "false" => Ok(Value::Bool(false)),
			other => Err(malformed(format!("invalid boolean {other:?}"))),
		},
		"double" => {
			let double = typed
				.text
				.trim()
				.parse::<f64>()
				.map_err(|_| malformed(format!("invalid double {:?}", typed.text)))?;
			Number::from_f64(double)
				.map(Value::Number)
				.ok_or_else(|| malformed(format!("non-finite double {double}")))
		}
		"nil" => Ok(Value::Null),
		"dateTime.iso8601" => Ok(Value::String(typed.text.trim().to_string())),
		"base64" => {
			let compact: String = typed.text.split_whitespace().collect();
			let bytes = STANDARD.decode(compact.as_bytes()).map_err(|e| malformed(format!("invalid base64: {e}")))?;
			Ok(Value::String(String::from_utf8(bytes).unwrap_or(compact)))
		}
		"array" => {
			let items = match typed.child("data") {
				Some(data) => data.children_named("value").map(decode_value).collect::<Result<Vec<_>>>()?,
				None => Vec::new(),
			};
			Ok(Value::Array(items))
		}
		"struct" => {
			let mut members = Map::new();
			for member in typed.children_named("member") {
				let name = member.child("name").ok_or_else(|| malformed("struct member without <name>"))?;
				let value = member.child("value").ok_or_else(|| malformed("struct member without <value>"))?;
				members.insert(name.text.trim().to_string(), decode_value(value)?);
			}
			Ok(Value::Object(members))
		}
		other => Err(malformed(format!("unsupported value type <{other}>"))),
	}
}

fn malformed(reason: impl ToString) -> ProtocolError {
	ProtocolError::Malformed(reason.to_string())
}

/// Minimal element tree; XML-RPC documents are small and fully buffered.
#[derive(Debug, Default)]
struct Element {
	name: String,
	text: String,
	children: Vec<Element>,
}

impl Element {
	fn named(local_name: &[u8]) -> Self {
		Self {
			name: String::from_utf8_lossy(local_name).into_owned(),
			..Default::default()
		}
	}

	fn child(&self, name: &str) -> Option<&Element> {
		self.children.iter().find(|child| child.name == name)
	}

	fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
		self.children.iter().filter(move |child| child.name == name)
	}
}

fn parse_document(xml: &str) -> Result<Element> {
	let mut reader = Reader::from_str(xml);
	let mut stack = vec![Element::default()];

	loop {
		match reader.read_event() {
			Ok(Event::Start(start)) => stack.push(Element::named(start.local_name().as_ref())),
			Ok(Event::Empty(start)) => {
				let element = Element::named(start.local_name().as_ref());
				current(&mut stack)?.children.push(element);
			}
			Ok(Event::End(_)) => {
				let element = stack.pop().ok_or_else(|| malformed("unbalanced closing tag"))?;
				current(&mut stack)?.children.push(element);
			}
			Ok(Event::Text(text)) => {
				let text = text.unescape().map_err(malformed)?;
				current(&mut stack)?.text.push_str(&text);
			}
			Ok(Event::CData(data)) => {
				let bytes = data.into_inner();
				current(&mut stack)?.text.push_str(&String::from_utf8_lossy(&bytes));
			}
			Ok(Event::Eof) => break,
			Ok(_) => {}
			Err(err) => return Err(malformed(err)),
		}
	}

	if stack.len() != 1 {
		return Err(malformed("unexpected end of document"));
	}
	stack.pop().ok_or_else(|| malformed("empty document"))
}

fn current(stack: &mut [Element]) -> Result<&mut Element> {
	stack.last_mut().ok_or_else(|| malformed("unbalanced closing tag"))
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn response(value: &str) -> String {
		format!("<?xml version='1.0'?>\n<methodResponse>\n<params>\n<param>\n<value>{value}</value>\n</param>\n</params>\n</methodResponse>\n")
	}

	#[test]
	fn encode_run_command_escapes_markup() {
		let body = encode_call(RUN_COMMAND, &[json!("select :HOH & ~protein <2")]);
		assert!(body.contains("<methodName>run_command</methodName>"));
		assert!(body.contains("<string>select :HOH &amp; ~protein &lt;2</string>"));
	}

	#[test]
	fn encode_scalars_and_containers() {
		let body = encode_call("m", &[json!(7), json!(3.5), json!(true), json!(null), json!({"a": [1, "x"]})]);
		assert!(body.contains("<value><int>7</int></value>"));
		assert!(body.contains("<value><double>3.5</double></value>"));
		assert!(body.contains("<value><boolean>1</boolean></value>"));
		assert!(body.contains("<value><nil/></value>"));
		assert!(body.contains(
			"<struct><member><name>a</name><value><array><data><value><int>1</int></value><value><string>x</string></value></data></array></value></member></struct>"
		));
	}

	#[test]
	fn child_lookup_outlives_the_name() {
		let root = parse_document(&response("<string>ok</string>")).unwrap();
		let found = {
			let name = String::from("methodResponse");
			root.child(&name)
		};
		assert!(found.and_then(|response| response.child("params")).is_some());
	}

	#[test]
	fn encode_large_integer_uses_i8() {
		let body = encode_call("m", &[json!(5_000_000_000_i64)]);
		assert!(body.contains("<i8>5000000000</i8>"));
	}

	#[test]
	fn decode_string_keeps_surrounding_whitespace() {
		let value = decode_response(&response("<string>UCSF ChimeraX version: 1.9\n</string>")).unwrap();
		assert_eq!(value, json!("UCSF ChimeraX version: 1.9\n"));
	}

	#[test]
	fn decode_untyped_value_is_string() {
		let value = decode_response(&response("plain &amp; simple")).unwrap();
		assert_eq!(value, json!("plain & simple"));
	}

	#[test]
	fn decode_nil_and_empty_params() {
		assert_eq!(decode_response(&response("<nil/>")).unwrap(), Value::Null);
		let empty = "<methodResponse><params></params></methodResponse>";
		assert_eq!(decode_response(empty).unwrap(), Value::Null);
	}

	#[test]
	fn decode_struct_with_nested_array() {
		let xml = response(
			"<struct>\
			 <member><name>models</name><value><array><data><value><i4>1</i4></value><value><int>2</int></value></data></array></value></member>\
			 <member><name>ok</name><value><boolean>1</boolean></value></member>\
			 <member><name>rmsd</name><value><double>0.25</double></value></member>\
			 </struct>",
		);
		let value = decode_response(&xml).unwrap();
		assert_eq!(value, json!({"models": [1, 2], "ok": true, "rmsd": 0.25}));
	}

	#[test]
	fn decode_base64_utf8_payload() {
		let value = decode_response(&response("<base64>aGVsbG8=</base64>")).unwrap();
		assert_eq!(value, json!("hello"));
	}

	#[test]
	fn decode_fault_is_error() {
		let xml = "<methodResponse><fault><value><struct>\
			<member><name>faultCode</name><value><int>1</int></value></member>\
			<member><name>faultString</name><value><string>Unknown command: frobnicate</string></value></member>\
			</struct></value></fault></methodResponse>";
		let err = decode_response(xml).unwrap_err();
		assert_eq!(
			err,
			ProtocolError::Fault {
				code: 1,
				message: "Unknown command: frobnicate".to_string()
			}
		);
	}

	#[test]
	fn decode_rejects_garbage() {
		assert!(matches!(decode_response("<html><body>502</body></html>"), Err(ProtocolError::Malformed(_))));
		assert!(matches!(decode_response("<methodResponse><params>"), Err(ProtocolError::Malformed(_))));
		assert!(matches!(decode_response(&response("<int>seven</int>")), Err(ProtocolError::Malformed(_))));
	}

	#[test]
	fn decoded_call_round_trips_through_response_shape() {
		let call = encode_call(RUN_COMMAND, &[json!("open 1abc")]);
		let wrapped = call.replace("methodCall", "methodResponse").replace("<methodName>run_command</methodName>", "");
		assert_eq!(decode_response(&wrapped).unwrap(), json!("open 1abc"));
	}
}
