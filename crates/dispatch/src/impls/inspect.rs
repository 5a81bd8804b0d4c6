//! Reflective defaults over an instance's fields.

use crate::{Value, concrete_protocol, protocol};

protocol!(Inspectable);

concrete_protocol! {
	Inspectable {
		fn inspect(this, _args) {
			let mut names: Vec<&str> = this.field_names().collect();
			names.sort_unstable();
			Value::Str(names.join(","))
		}
		fn field_count(this, _args) {
			Value::Int(this.field_len() as i64)
		}
		fn has_field(this, args) {
			match args.first().and_then(Value::as_str) {
				Some(name) => Value::Bool(this.field(name).is_some()),
				None => Value::Bool(false),
			}
		}
	}
}
