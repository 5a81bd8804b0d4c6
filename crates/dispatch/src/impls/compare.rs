//! Field-comparison defaults.

use crate::{Value, concrete_protocol, protocol};

protocol!(Comparable);

concrete_protocol! {
	Comparable {
		// args: [field name, expected value]
		fn matches(this, args) {
			match args {
				[Value::Str(name), expected] => Value::Bool(this.field(name) == Some(expected)),
				_ => Value::Bool(false),
			}
		}
		fn differs(this, args) {
			match args {
				[Value::Str(name), expected] => Value::Bool(this.field(name) != Some(expected)),
				_ => Value::Bool(false),
			}
		}
	}
}
