//! Static declaration layer: protocol and concrete-protocol definitions.
//!
//! Definitions are plain statics collected with `inventory`, so declaring
//! a concrete protocol anywhere in the linked program is enough for the
//! phased [`bootstrap`](crate::bootstrap) to find it — the load-time
//! registration hook, without a global mutable registry.

use std::fmt;

use protolith_core::Initializer;

use crate::runtime::MethodFn;

/// A protocol declaration: its name plus direct super-protocols in
/// declaration order.
pub struct ProtocolDecl {
	pub name: &'static str,
	pub supers: &'static [&'static str],
}

/// Registry wrapper for protocol declarations.
pub struct ProtocolDeclReg(pub &'static ProtocolDecl);
inventory::collect!(ProtocolDeclReg);

/// One default method in a concrete protocol definition.
pub struct MethodDecl {
	pub selector: &'static str,
	pub body: MethodFn,
}

/// A concrete protocol: default method bodies for `protocol`, plus an
/// optional one-time initializer.
pub struct ConcreteProtocolDef {
	pub protocol: &'static str,
	pub methods: &'static [MethodDecl],
	pub initializer: Option<Initializer>,
}

/// Registry wrapper for concrete protocol definitions.
pub struct ConcreteProtocolReg(pub &'static ConcreteProtocolDef);
inventory::collect!(ConcreteProtocolReg);

/// Every statically declared protocol in the linked program.
pub fn collected_protocol_decls() -> Vec<&'static ProtocolDecl> {
	inventory::iter::<ProtocolDeclReg>().map(|reg| reg.0).collect()
}

/// Every statically defined concrete protocol in the linked program.
pub fn collected_concrete_defs() -> Vec<&'static ConcreteProtocolDef> {
	inventory::iter::<ConcreteProtocolReg>().map(|reg| reg.0).collect()
}

impl fmt::Debug for ConcreteProtocolDef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ConcreteProtocolDef")
			.field("protocol", &self.protocol)
			.field("methods", &self.methods.len())
			.field("initializer", &self.initializer.is_some())
			.finish()
	}
}

impl fmt::Debug for ProtocolDecl {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ProtocolDecl")
			.field("name", &self.name)
			.field("supers", &self.supers)
			.finish()
	}
}
