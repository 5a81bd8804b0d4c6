//! Declaration macros for protocols and concrete protocols.

/// Declares a protocol, optionally extending others.
///
/// ```ignore
/// protocol!(Shape);
/// protocol!(DrawableShape: [Shape]);
/// ```
///
/// Super-protocol order matters: it is the declaration order the
/// precedence resolver follows.
#[macro_export]
macro_rules! protocol {
	($name:ident) => {
		$crate::protocol!($name: []);
	};
	($name:ident: [$($super:ident),* $(,)?]) => {
		paste::paste! {
			#[allow(non_upper_case_globals)]
			pub static [<PROTOCOL_ $name>]: $crate::ProtocolDecl = $crate::ProtocolDecl {
				name: stringify!($name),
				supers: &[$(stringify!($super)),*],
			};

			inventory::submit! { $crate::ProtocolDeclReg(&[<PROTOCOL_ $name>]) }
		}
	};
}

/// Defines a concrete protocol: default method bodies for an existing (or
/// implicitly declared) protocol.
///
/// ```ignore
/// concrete_protocol! {
///     DrawableShape {
///         fn area(this, _args) {
///             Value::Float(0.0)
///         }
///         fn describe(this, _args) {
///             Value::Str("a shape".into())
///         }
///     }
/// }
/// ```
///
/// An optional `init` clause attaches the one-time setup routine that runs
/// when the protocol is marked ready:
///
/// ```ignore
/// concrete_protocol! {
///     DrawableShape { ... },
///     init drawable_setup
/// }
/// ```
#[macro_export]
macro_rules! concrete_protocol {
	($name:ident {
		$(fn $selector:ident($this:ident, $args:ident) $body:block)*
	} $(, init $initializer:expr)? $(,)?) => {
		paste::paste! {
			$(
				#[allow(unused_variables, non_snake_case)]
				fn [<concrete_ $name _ $selector>](
					$this: &mut $crate::Instance,
					$args: &[$crate::Value],
				) -> $crate::Value {
					$body
				}
			)*

			#[allow(non_upper_case_globals)]
			pub static [<CONCRETE_ $name>]: $crate::ConcreteProtocolDef = $crate::ConcreteProtocolDef {
				protocol: stringify!($name),
				methods: &[$(
					$crate::MethodDecl {
						selector: stringify!($selector),
						body: [<concrete_ $name _ $selector>],
					},
				)*],
				initializer: $crate::__concrete_init!($($initializer)?),
			};

			inventory::submit! { $crate::ConcreteProtocolReg(&[<CONCRETE_ $name>]) }
		}
	};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __concrete_init {
	() => {
		None
	};
	($initializer:expr) => {
		Some($initializer)
	};
}
