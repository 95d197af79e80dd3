//! Binds positional and named arguments to an operation's parameter table.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::registry::{Operation, Param};
use crate::error::{BridgeError, Result};

/// Arguments after binding; lookups fall back to the parameter default.
#[derive(Debug, Clone)]
pub struct BoundArgs {
	operation: Operation,
	values: HashMap<&'static str, Value>,
}

impl BoundArgs {
	/// Positional values fill parameters in declaration order, then named
	/// values fill the rest. `null` counts as not supplied.
	pub fn bind(operation: Operation, positional: &[Value], named: &Map<String, Value>) -> Result<Self> {
		let params = operation.params();
		if positional.len() > params.len() {
			return Err(BridgeError::invalid(format!(
				"{}() takes {} argument(s) but {} were given",
				operation.name(),
				params.len(),
				positional.len()
			)));
		}

		let mut values = HashMap::new();
		for (param, value) in params.iter().zip(positional) {
			if !value.is_null() {
				values.insert(param.name, value.clone());
			}
		}

		for (name, value) in named {
			let Some((position, param)) = params.iter().enumerate().find(|(_, param)| param.name == name.as_str()) else {
				return Err(BridgeError::invalid(format!("{}() got an unexpected keyword argument '{name}'", operation.name())));
			};
			if position < positional.len() {
				return Err(BridgeError::invalid(format!("{}() got multiple values for argument '{name}'", operation.name())));
			}
			if !value.is_null() {
				values.insert(param.name, value.clone());
			}
		}

		if let Some(missing) = params.iter().find(|param| param.required && !values.contains_key(param.name)) {
			return Err(BridgeError::invalid(format!(
				"{}() missing required argument '{}'",
				operation.name(),
				missing.name
			)));
		}

		Ok(Self { operation, values })
	}

	pub fn operation(&self) -> Operation {
		self.operation
	}

	fn param(&self, name: &str) -> Option<&'static Param> {
		self.operation.params().iter().find(|param| param.name == name)
	}

	/// Supplied value, else the declared default.
	pub fn value(&self, name: &str) -> Option<Value> {
		self.values
			.get(name)
			.cloned()
			.or_else(|| self.param(name).and_then(|param| param.default).map(|default| default.to_value()))
	}

	fn type_error(&self, name: &str, expected: &str) -> BridgeError {
		BridgeError::invalid(format!("{}(): argument '{name}' must be {expected}", self.operation.name()))
	}

	pub fn string(&self, name: &str) -> Result<Option<String>> {
		match self.value(name) {
			None => Ok(None),
			Some(Value::String(text)) => Ok(Some(text)),
			Some(Value::Number(number)) => Ok(Some(number.to_string())),
			Some(Value::Bool(flag)) => Ok(Some(flag.to_string())),
			Some(_) => Err(self.type_error(name, "a string")),
		}
	}

	pub fn required_string(&self, name: &str) -> Result<String> {
		self.string(name)?.ok_or_else(|| self.type_error(name, "a string"))
	}

	/// Accepts JSON booleans, `0`/`1`, and the strings `true`/`false`.
	pub fn flag(&self, name: &str) -> Result<bool> {
		match self.value(name) {
			None => Ok(false),
			Some(Value::Bool(flag)) => Ok(flag),
			Some(Value::Number(number)) if number.as_i64() == Some(0) => Ok(false),
			Some(Value::Number(number)) if number.as_i64() == Some(1) => Ok(true),
			Some(Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
				"true" | "1" | "yes" => Ok(true),
				"false" | "0" | "no" => Ok(false),
				_ => Err(self.type_error(name, "a boolean")),
			},
			Some(_) => Err(self.type_error(name, "a boolean")),
		}
	}

	pub fn integer(&self, name: &str) -> Result<Option<i64>> {
		match self.value(name) {
			None => Ok(None),
			Some(Value::Number(number)) => match number.as_i64() {
				Some(value) => Ok(Some(value)),
				None => match number.as_f64() {
					Some(value) if value.fract() == 0.0 => Ok(Some(value as i64)),
					_ => Err(self.type_error(name, "an integer")),
				},
			},
			Some(Value::String(text)) => text.trim().parse().map(Some).map_err(|_| self.type_error(name, "an integer")),
			Some(_) => Err(self.type_error(name, "an integer")),
		}
	}

	pub fn port(&self, name: &str) -> Result<Option<u16>> {
		match self.integer(name)? {
			None => Ok(None),
			Some(value) => match u16::try_from(value) {
				Ok(port) if port > 0 => Ok(Some(port)),
				_ => Err(self.type_error(name, "a port between 1 and 65535")),
			},
		}
	}

	pub fn number(&self, name: &str) -> Result<Option<f64>> {
		match self.value(name) {
			None => Ok(None),
			Some(Value::Number(number)) => number.as_f64().map(Some).ok_or_else(|| self.type_error(name, "a number")),
			Some(Value::String(text)) => text.trim().parse().map(Some).map_err(|_| self.type_error(name, "a number")),
			Some(_) => Err(self.type_error(name, "a number")),
		}
	}

	/// A single string becomes a one-element list.
	pub fn string_list(&self, name: &str) -> Result<Vec<String>> {
		match self.value(name) {
			None => Ok(Vec::new()),
			Some(Value::String(text)) => Ok(vec![text]),
			Some(Value::Array(items)) => items
				.into_iter()
				.map(|item| match item {
					Value::String(text) => Ok(text),
					_ => Err(self.type_error(name, "a string or a list of strings")),
				})
				.collect(),
			Some(_) => Err(self.type_error(name, "a string or a list of strings")),
		}
	}
}
