//! Explicit vtable object runtime and static declaration layer.
//!
//! This crate gives the engine in `protolith-core` a concrete host: an
//! [`ObjectRuntime`] where every type carries an explicit vtable, built at
//! composition time, and where "injection" merges default entries into
//! that vtable instead of mutating a live class object.
//!
//! Concrete protocols are declared as statics and collected at link time:
//!
//! ```ignore
//! protocol!(Shape);
//! protocol!(DrawableShape: [Shape]);
//!
//! concrete_protocol! {
//!     DrawableShape {
//!         fn area(this, _args) {
//!             Value::Float(0.0)
//!         }
//!         fn describe(this, _args) {
//!             Value::Str("a shape".into())
//!         }
//!     }
//! }
//!
//! let runtime = ObjectRuntime::new();
//! let db = ProtocolDb::new();
//! // declare types, then:
//! bootstrap(&runtime, &db);
//! ```
//!
//! After [`bootstrap`] every conforming type answers the protocol's
//! concrete selectors — its own definitions always winning over the
//! injected defaults.

#[cfg(test)]
use pretty_assertions as _;

mod bootstrap;
mod defs;
#[cfg(feature = "builtins")]
mod impls;
mod macros;
mod runtime;
mod value;

pub use bootstrap::{activate, bootstrap, bootstrap_with, declare_protocols, register_containers};
pub use defs::{
	ConcreteProtocolDef, ConcreteProtocolReg, MethodDecl, ProtocolDecl, ProtocolDeclReg,
	collected_concrete_defs, collected_protocol_decls,
};
pub use runtime::{DispatchError, Imp, MethodFn, ObjectRuntime, TypeKey};
pub use value::{Instance, Value};

// Re-export the engine surface so consumers depend on one crate.
pub use protolith_core::{
	DiagnosticReport, HostRuntime, InitScope, Initializer, InjectionOutcome, InstallError,
	MethodContainer, PrecedenceList, ProtocolDb, ProtocolId, ProtocolReport, Registry,
	RegistryEntry, RegistryError, Selector,
};
