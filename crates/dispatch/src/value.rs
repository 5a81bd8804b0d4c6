//! Dynamic values and instances for the dispatch layer.

use std::fmt;

use rustc_hash::FxHashMap as HashMap;

use crate::runtime::TypeKey;

/// A dynamically-typed value passed to and returned from dispatched methods.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Unit,
	Bool(bool),
	Int(i64),
	Float(f64),
	Str(String),
}

impl Value {
	/// Numeric view: ints coerce to floats, everything else is `None`.
	pub fn as_float(&self) -> Option<f64> {
		match self {
			Value::Int(n) => Some(*n as f64),
			Value::Float(x) => Some(*x),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Str(s) => Some(s),
			_ => None,
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Unit => f.write_str("()"),
			Value::Bool(b) => write!(f, "{b}"),
			Value::Int(n) => write!(f, "{n}"),
			Value::Float(x) => write!(f, "{x}"),
			Value::Str(s) => f.write_str(s),
		}
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Value::Bool(value)
	}
}

impl From<i64> for Value {
	fn from(value: i64) -> Self {
		Value::Int(value)
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Value::Float(value)
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Value::Str(value.to_owned())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Value::Str(value)
	}
}

/// An object: a type key plus named fields.
///
/// Methods are not stored here — dispatch goes through the type's vtable in
/// the [`ObjectRuntime`](crate::ObjectRuntime).
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
	ty: TypeKey,
	fields: HashMap<&'static str, Value>,
}

impl Instance {
	pub fn new(ty: TypeKey) -> Self {
		Self {
			ty,
			fields: HashMap::default(),
		}
	}

	/// Builder-style field assignment.
	pub fn with_field(mut self, name: &'static str, value: impl Into<Value>) -> Self {
		self.fields.insert(name, value.into());
		self
	}

	#[inline]
	pub fn type_key(&self) -> TypeKey {
		self.ty
	}

	pub fn set(&mut self, name: &'static str, value: impl Into<Value>) {
		self.fields.insert(name, value.into());
	}

	pub fn field(&self, name: &str) -> Option<&Value> {
		self.fields.get(name)
	}

	pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
		self.fields.keys().copied()
	}

	#[inline]
	pub fn field_len(&self) -> usize {
		self.fields.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn field_round_trip() {
		let mut instance = Instance::new(TypeKey(0)).with_field("radius", 2.0);
		assert_eq!(instance.field("radius"), Some(&Value::Float(2.0)));
		assert_eq!(instance.field("missing"), None);

		instance.set("name", "circle");
		assert_eq!(instance.field_len(), 2);
		assert_eq!(
			instance.field("name").and_then(Value::as_str),
			Some("circle")
		);
	}

	#[test]
	fn numeric_coercion() {
		assert_eq!(Value::Int(3).as_float(), Some(3.0));
		assert_eq!(Value::Float(1.5).as_float(), Some(1.5));
		assert_eq!(Value::Str("x".into()).as_float(), None);
	}
}
