//! The object runtime: protocol table, type records, and vtable dispatch.

use std::fmt;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use thiserror::Error;

use protolith_core::{HostRuntime, InstallError, ProtocolId, Selector};

use crate::value::{Instance, Value};

/// Uniform entry point for every dispatched method.
pub type MethodFn = fn(&mut Instance, &[Value]) -> Value;

/// An invocable implementation occupying one vtable slot.
#[derive(Clone, Copy)]
pub struct Imp {
	/// Which container or type supplied this slot, for diagnostics.
	pub origin: &'static str,
	pub func: MethodFn,
}

impl fmt::Debug for Imp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Imp")
			.field("origin", &self.origin)
			.finish_non_exhaustive()
	}
}

/// Identity of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey(pub u32);

impl TypeKey {
	#[inline]
	pub fn as_u32(self) -> u32 {
		self.0
	}
}

impl fmt::Display for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TypeKey({})", self.0)
	}
}

/// Errors from message dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
	#[error("type `{type_name}` does not recognize selector `{selector}`")]
	UnrecognizedSelector {
		type_name: &'static str,
		selector: Selector,
	},
	#[error("instance refers to a type the runtime does not know")]
	UnknownType,
}

struct ProtocolInfo {
	name: &'static str,
	supers: Vec<ProtocolId>,
}

#[derive(Default)]
struct ProtocolTable {
	by_name: HashMap<&'static str, ProtocolId>,
	infos: Vec<ProtocolInfo>,
}

struct TypeRecord {
	name: &'static str,
	parent: Option<TypeKey>,
	protocols: Vec<ProtocolId>,
	vtable: HashMap<Selector, Imp>,
}

#[derive(Default)]
struct TypeTable {
	by_name: HashMap<&'static str, TypeKey>,
	records: Vec<TypeRecord>,
}

/// The host object system: protocol declarations plus type records whose
/// vtables are built at composition time.
///
/// Every method takes `&self`; the tables live behind reader/writer locks
/// so steady-state dispatch is read-only and callable from any thread.
pub struct ObjectRuntime {
	protocols: RwLock<ProtocolTable>,
	types: RwLock<TypeTable>,
	reserved: HashSet<Selector>,
}

impl Default for ObjectRuntime {
	fn default() -> Self {
		Self::new()
	}
}

impl ObjectRuntime {
	pub fn new() -> Self {
		Self {
			protocols: RwLock::new(ProtocolTable::default()),
			types: RwLock::new(TypeTable::default()),
			reserved: HashSet::default(),
		}
	}

	/// Marks selectors the runtime refuses to install onto.
	pub fn with_reserved_selectors(mut self, selectors: &[Selector]) -> Self {
		self.reserved.extend(selectors.iter().copied());
		self
	}

	/// Declares a protocol with its direct super-protocols in order.
	///
	/// Re-declaring a name returns the existing handle: the same protocol
	/// declaration always yields the same identity.
	pub fn declare_protocol(&self, name: &'static str, supers: &[ProtocolId]) -> ProtocolId {
		let mut table = self.protocols.write();
		if let Some(&id) = table.by_name.get(name) {
			return id;
		}
		let id = ProtocolId(table.infos.len() as u32);
		table.by_name.insert(name, id);
		table.infos.push(ProtocolInfo {
			name,
			supers: supers.to_vec(),
		});
		id
	}

	pub fn protocol(&self, name: &str) -> Option<ProtocolId> {
		self.protocols.read().by_name.get(name).copied()
	}

	pub fn protocol_name(&self, protocol: ProtocolId) -> Option<&'static str> {
		self.protocols
			.read()
			.infos
			.get(protocol.as_u32() as usize)
			.map(|info| info.name)
	}

	/// Declares a type with an optional parent and its conformed protocols.
	pub fn declare_type(
		&self,
		name: &'static str,
		parent: Option<TypeKey>,
		protocols: &[ProtocolId],
	) -> TypeKey {
		let mut table = self.types.write();
		if let Some(&key) = table.by_name.get(name) {
			tracing::warn!(ty = name, "type redeclared; keeping the original record");
			return key;
		}
		let key = TypeKey(table.records.len() as u32);
		table.by_name.insert(name, key);
		table.records.push(TypeRecord {
			name,
			parent,
			protocols: protocols.to_vec(),
			vtable: HashMap::default(),
		});
		key
	}

	pub fn type_key(&self, name: &str) -> Option<TypeKey> {
		self.types.read().by_name.get(name).copied()
	}

	pub fn type_name(&self, ty: TypeKey) -> Option<&'static str> {
		self.types
			.read()
			.records
			.get(ty.as_u32() as usize)
			.map(|record| record.name)
	}

	/// Defines one of the type's own methods (before any injection).
	pub fn define_method(&self, ty: TypeKey, selector: Selector, imp: Imp) {
		let mut table = self.types.write();
		let Some(record) = table.records.get_mut(ty.as_u32() as usize) else {
			tracing::error!(%ty, %selector, "define_method on unknown type");
			return;
		};
		record.vtable.insert(selector, imp);
	}

	/// Looks up `selector` through the type's own vtable, then its parents'.
	pub fn lookup_method(&self, ty: TypeKey, selector: Selector) -> Option<Imp> {
		let table = self.types.read();
		let mut current = Some(ty);
		while let Some(key) = current {
			let record = table.records.get(key.as_u32() as usize)?;
			if let Some(imp) = record.vtable.get(&selector) {
				return Some(*imp);
			}
			current = record.parent;
		}
		None
	}

	/// Whether the type answers `selector`, directly or through its ancestry.
	#[inline]
	pub fn respond_to(&self, ty: TypeKey, selector: Selector) -> bool {
		self.lookup_method(ty, selector).is_some()
	}

	/// Protocols the type declares, along its parent chain.
	pub fn declared_protocols(&self, ty: TypeKey) -> Vec<ProtocolId> {
		let table = self.types.read();
		let mut declared = Vec::new();
		let mut current = Some(ty);
		while let Some(key) = current {
			let Some(record) = table.records.get(key.as_u32() as usize) else {
				break;
			};
			declared.extend(record.protocols.iter().copied());
			current = record.parent;
		}
		declared
	}

	/// Transitive conformance: declaring a protocol also conforms the type
	/// to that protocol's ancestors.
	pub fn conforms_to(&self, ty: TypeKey, protocol: ProtocolId) -> bool {
		let mut stack = self.declared_protocols(ty);
		let protocols = self.protocols.read();
		let mut seen: HashSet<ProtocolId> = HashSet::default();
		while let Some(candidate) = stack.pop() {
			if candidate == protocol {
				return true;
			}
			if !seen.insert(candidate) {
				continue;
			}
			if let Some(info) = protocols.infos.get(candidate.as_u32() as usize) {
				stack.extend(info.supers.iter().copied());
			}
		}
		false
	}

	/// Sends `selector` to `instance`.
	pub fn invoke(
		&self,
		instance: &mut Instance,
		selector: Selector,
		args: &[Value],
	) -> Result<Value, DispatchError> {
		let ty = instance.type_key();
		let Some(type_name) = self.type_name(ty) else {
			return Err(DispatchError::UnknownType);
		};
		let imp = self
			.lookup_method(ty, selector)
			.ok_or(DispatchError::UnrecognizedSelector {
				type_name,
				selector,
			})?;
		Ok((imp.func)(instance, args))
	}
}

impl HostRuntime for ObjectRuntime {
	type Type = TypeKey;
	type Imp = Imp;

	fn protocol_of(&self, name: &str) -> Option<ProtocolId> {
		self.protocol(name)
	}

	fn super_protocols_of(&self, protocol: ProtocolId) -> Vec<ProtocolId> {
		self.protocols
			.read()
			.infos
			.get(protocol.as_u32() as usize)
			.map(|info| info.supers.clone())
			.unwrap_or_default()
	}

	fn type_defines_method(&self, ty: &Self::Type, selector: Selector) -> bool {
		self.respond_to(*ty, selector)
	}

	fn install_method(
		&self,
		ty: &Self::Type,
		selector: Selector,
		imp: &Self::Imp,
	) -> Result<(), InstallError> {
		if self.reserved.contains(&selector) {
			return Err(InstallError::ReservedSelector(selector));
		}
		let mut table = self.types.write();
		let Some(record) = table.records.get_mut(ty.as_u32() as usize) else {
			return Err(InstallError::UnknownType);
		};
		record.vtable.insert(selector, *imp);
		Ok(())
	}

	fn conforming_types_of(&self, protocol: ProtocolId) -> Vec<Self::Type> {
		let count = self.types.read().records.len();
		(0..count as u32)
			.map(TypeKey)
			.filter(|&ty| self.conforms_to(ty, protocol))
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	// Distinct origins tell slots apart; the body echoes the `tag` field so
	// invoke() has something observable.
	fn marker(origin: &'static str) -> Imp {
		Imp {
			origin,
			func: |this, _args| this.field("tag").cloned().unwrap_or(Value::Unit),
		}
	}

	#[test]
	fn protocol_identity_is_stable() {
		let runtime = ObjectRuntime::new();
		let shape = runtime.declare_protocol("Shape", &[]);
		assert_eq!(runtime.declare_protocol("Shape", &[]), shape);
		assert_eq!(runtime.protocol("Shape"), Some(shape));
		assert_eq!(runtime.protocol_name(shape), Some("Shape"));
		assert_eq!(runtime.protocol("Missing"), None);
	}

	#[test]
	fn method_lookup_walks_the_parent_chain() {
		let runtime = ObjectRuntime::new();
		let parent = runtime.declare_type("Parent", None, &[]);
		let child = runtime.declare_type("Child", Some(parent), &[]);
		runtime.define_method(parent, Selector("greet"), marker("Parent"));

		assert!(runtime.respond_to(child, Selector("greet")));
		assert_eq!(
			runtime.lookup_method(child, Selector("greet")).unwrap().origin,
			"Parent"
		);
		assert!(!runtime.respond_to(child, Selector("missing")));
	}

	#[test]
	fn conformance_is_transitive_over_protocol_ancestry() {
		let runtime = ObjectRuntime::new();
		let shape = runtime.declare_protocol("Shape", &[]);
		let drawable = runtime.declare_protocol("DrawableShape", &[shape]);
		let circle = runtime.declare_type("Circle", None, &[drawable]);
		let blob = runtime.declare_type("Blob", None, &[]);

		assert!(runtime.conforms_to(circle, drawable));
		assert!(runtime.conforms_to(circle, shape));
		assert!(!runtime.conforms_to(blob, shape));

		assert_eq!(runtime.conforming_types_of(shape), vec![circle]);
	}

	#[test]
	fn reserved_selectors_refuse_installation() {
		let runtime = ObjectRuntime::new().with_reserved_selectors(&[Selector("dealloc")]);
		let ty = runtime.declare_type("T", None, &[]);

		let err = runtime
			.install_method(&ty, Selector("dealloc"), &marker("C"))
			.unwrap_err();
		assert_eq!(err, InstallError::ReservedSelector(Selector("dealloc")));

		runtime
			.install_method(&ty, Selector("fine"), &marker("C"))
			.unwrap();
		assert!(runtime.respond_to(ty, Selector("fine")));

		assert_eq!(
			runtime.install_method(&TypeKey(99), Selector("fine"), &marker("C")),
			Err(InstallError::UnknownType)
		);
	}

	#[test]
	fn invoke_dispatches_and_reports_unknown_selectors() {
		let runtime = ObjectRuntime::new();
		let ty = runtime.declare_type("T", None, &[]);
		runtime.define_method(ty, Selector("tag"), marker("T"));

		let mut instance = Instance::new(ty).with_field("tag", "hello");
		assert_eq!(
			runtime.invoke(&mut instance, Selector("tag"), &[]).unwrap(),
			Value::Str("hello".into())
		);

		let err = runtime
			.invoke(&mut instance, Selector("nope"), &[])
			.unwrap_err();
		assert_eq!(
			err,
			DispatchError::UnrecognizedSelector {
				type_name: "T",
				selector: Selector("nope"),
			}
		);
	}
}
