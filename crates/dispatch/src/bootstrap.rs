//! Phased load: declare protocols, register containers, announce readiness.
//!
//! The phases mirror a host's load order while keeping it explicit:
//! registration of every container completes before the first readiness
//! announcement, so the injector never observes a partially-registered
//! registry and precedence lists are resolved against a complete graph.

use rustc_hash::FxHashMap as HashMap;

use protolith_core::{MethodContainer, ProtocolDb, ProtocolId, Selector};

use crate::defs::{
	ConcreteProtocolDef, ProtocolDecl, collected_concrete_defs, collected_protocol_decls,
};
use crate::runtime::{Imp, ObjectRuntime};

/// Loads every statically declared protocol and concrete protocol into
/// `runtime` and `db`, then announces readiness for all of them.
///
/// The final announcement triggers the injection sweep over every type
/// already declared in the runtime.
pub fn bootstrap(runtime: &ObjectRuntime, db: &ProtocolDb<ObjectRuntime>) {
	let decls = collected_protocol_decls();
	let defs = collected_concrete_defs();
	bootstrap_with(runtime, db, &decls, &defs);
}

/// Slice-driven variant of [`bootstrap`], for callers (and tests) that
/// assemble definition lists explicitly instead of collecting them.
pub fn bootstrap_with(
	runtime: &ObjectRuntime,
	db: &ProtocolDb<ObjectRuntime>,
	decls: &[&'static ProtocolDecl],
	defs: &[&'static ConcreteProtocolDef],
) {
	declare_protocols(runtime, decls);
	register_containers(runtime, db, defs);
	activate(runtime, db, defs);
}

/// Phase 1: interns every declared protocol, resolving super-protocol
/// names depth-first so declarations may arrive in any order. A name
/// referenced but never declared is interned with no ancestors.
pub fn declare_protocols(runtime: &ObjectRuntime, decls: &[&'static ProtocolDecl]) {
	let by_name: HashMap<&'static str, &'static ProtocolDecl> =
		decls.iter().map(|decl| (decl.name, *decl)).collect();
	let mut in_flight = Vec::new();
	for decl in decls {
		ensure_declared(runtime, &by_name, decl.name, &mut in_flight);
	}
}

fn ensure_declared(
	runtime: &ObjectRuntime,
	by_name: &HashMap<&'static str, &'static ProtocolDecl>,
	name: &'static str,
	in_flight: &mut Vec<&'static str>,
) -> ProtocolId {
	if let Some(id) = runtime.protocol(name) {
		return id;
	}
	if in_flight.contains(&name) {
		tracing::error!(
			protocol = name,
			"protocol inheritance cycle; breaking at the back edge"
		);
		return runtime.declare_protocol(name, &[]);
	}
	in_flight.push(name);
	let supers: Vec<ProtocolId> = by_name
		.get(name)
		.map(|decl| {
			decl.supers
				.iter()
				.map(|&super_name| ensure_declared(runtime, by_name, super_name, in_flight))
				.collect()
		})
		.unwrap_or_default();
	in_flight.pop();
	runtime.declare_protocol(name, &supers)
}

/// Phase 2: registers one method container per concrete protocol
/// definition. A duplicate definition is reported and discarded; the
/// registry keeps the first.
pub fn register_containers(
	runtime: &ObjectRuntime,
	db: &ProtocolDb<ObjectRuntime>,
	defs: &[&'static ConcreteProtocolDef],
) {
	for def in defs {
		let protocol = runtime.declare_protocol(def.protocol, &[]);
		let mut container = MethodContainer::new(protocol, def.protocol);
		for method in def.methods {
			container = container.method(
				Selector(method.selector),
				Imp {
					origin: def.protocol,
					func: method.body,
				},
			);
		}
		if let Some(initializer) = def.initializer {
			container = container.with_initializer(initializer);
		}
		if let Err(err) = db.register(container) {
			tracing::error!(protocol = def.protocol, %err, "could not load concrete protocol");
		}
	}
}

/// Phase 3: announces readiness for every definition. Each announcement
/// runs that protocol's initializer; the last one triggers the injection
/// sweep. Sequencing errors (unknown or doubly-announced protocols) are
/// reported loudly and skipped.
pub fn activate(
	runtime: &ObjectRuntime,
	db: &ProtocolDb<ObjectRuntime>,
	defs: &[&'static ConcreteProtocolDef],
) {
	for def in defs {
		let Some(protocol) = runtime.protocol(def.protocol) else {
			tracing::error!(protocol = def.protocol, "readiness announced for an undeclared protocol");
			continue;
		};
		if let Err(err) = db.mark_ready(runtime, protocol) {
			tracing::error!(protocol = def.protocol, %err, "concrete protocol readiness announcement failed");
		}
	}
}
