//! Append-only table of concrete-protocol registrations.

use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap as HashMap;
use thiserror::Error;

use crate::ProtocolId;
use crate::container::MethodContainer;

/// Errors raised by registry call sequencing.
///
/// All of these are load-time diagnostics: callers report them and keep
/// going, they never abort process startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
	/// A protocol was registered twice. The second container is discarded;
	/// the registry keeps the first.
	#[error("protocol {0} already has a registered method container")]
	AlreadyRegistered(ProtocolId),
	/// `mark_ready` named a protocol with no registered container — a
	/// mis-paired declaration/definition.
	#[error("protocol {0} has no registered method container")]
	UnknownProtocol(ProtocolId),
	/// `mark_ready` was called twice for the same protocol.
	#[error("protocol {0} was already marked ready")]
	AlreadyReady(ProtocolId),
}

/// A registered concrete protocol: its method container plus readiness.
///
/// The container is immutable from the moment the entry is created; only
/// the readiness flag ever changes, and only once.
pub struct RegistryEntry<I> {
	container: Arc<MethodContainer<I>>,
	ready: AtomicBool,
}

impl<I> fmt::Debug for RegistryEntry<I> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RegistryEntry")
			.field("protocol", &self.container.protocol())
			.field("ready", &self.is_ready())
			.finish()
	}
}

impl<I> RegistryEntry<I> {
	fn new(container: MethodContainer<I>) -> Self {
		Self {
			container: Arc::new(container),
			ready: AtomicBool::new(false),
		}
	}

	/// The container holding this protocol's default implementations.
	#[inline]
	pub fn container(&self) -> &Arc<MethodContainer<I>> {
		&self.container
	}

	/// Whether the protocol's methods are fully registered and safe to use
	/// for injection.
	#[inline]
	pub fn is_ready(&self) -> bool {
		self.ready.load(Ordering::Acquire)
	}

	/// Flips the readiness flag. First caller wins.
	fn mark_ready(&self) -> bool {
		self.ready
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.is_ok()
	}
}

/// Process-lifetime table mapping protocols to their method containers.
///
/// Mutation is append-only: entries are created by [`register`](Registry::register)
/// and never removed or replaced. A completed registration is visible to
/// every read that could return it.
pub struct Registry<I> {
	entries: RwLock<HashMap<ProtocolId, Arc<RegistryEntry<I>>>>,
}

impl<I> Default for Registry<I> {
	fn default() -> Self {
		Self::new()
	}
}

impl<I> Registry<I> {
	pub fn new() -> Self {
		Self {
			entries: RwLock::new(HashMap::default()),
		}
	}

	/// Registers `container` for its protocol. The new entry starts
	/// not-ready.
	pub fn register(&self, container: MethodContainer<I>) -> Result<(), RegistryError> {
		let protocol = container.protocol();
		let mut entries = self.entries.write();
		match entries.entry(protocol) {
			Entry::Occupied(_) => Err(RegistryError::AlreadyRegistered(protocol)),
			Entry::Vacant(slot) => {
				slot.insert(Arc::new(RegistryEntry::new(container)));
				Ok(())
			}
		}
	}

	/// Marks `protocol` ready and returns its entry.
	///
	/// Under concurrent calls exactly one caller gets `Ok`; the others get
	/// [`RegistryError::AlreadyReady`].
	pub fn mark_ready(&self, protocol: ProtocolId) -> Result<Arc<RegistryEntry<I>>, RegistryError> {
		let entry = self
			.lookup(protocol)
			.ok_or(RegistryError::UnknownProtocol(protocol))?;
		if entry.mark_ready() {
			Ok(entry)
		} else {
			Err(RegistryError::AlreadyReady(protocol))
		}
	}

	/// Returns the entry for `protocol`, if one was registered.
	///
	/// `None` is the normal answer for plain protocols with no concrete
	/// methods.
	pub fn lookup(&self, protocol: ProtocolId) -> Option<Arc<RegistryEntry<I>>> {
		self.entries.read().get(&protocol).cloned()
	}

	#[inline]
	pub fn is_ready(&self, protocol: ProtocolId) -> bool {
		self.entries
			.read()
			.get(&protocol)
			.is_some_and(|entry| entry.is_ready())
	}

	/// True when every registered protocol has been marked ready.
	///
	/// An empty registry is trivially quiescent.
	pub fn all_ready(&self) -> bool {
		self.entries.read().values().all(|entry| entry.is_ready())
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	/// Every registered protocol, in unspecified order.
	pub fn protocols(&self) -> Vec<ProtocolId> {
		self.entries.read().keys().copied().collect()
	}

	/// Every protocol whose entry is ready, in unspecified order.
	pub fn ready_protocols(&self) -> Vec<ProtocolId> {
		self.entries
			.read()
			.iter()
			.filter(|(_, entry)| entry.is_ready())
			.map(|(protocol, _)| *protocol)
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Selector;

	const P: ProtocolId = ProtocolId(7);

	#[test]
	fn second_registration_is_refused_and_first_kept() {
		let registry = Registry::new();
		registry
			.register(MethodContainer::new(P, "C1").method(Selector("m"), "c1"))
			.unwrap();

		let err = registry
			.register(MethodContainer::new(P, "C2").method(Selector("m"), "c2"))
			.unwrap_err();
		assert_eq!(err, RegistryError::AlreadyRegistered(P));

		let entry = registry.lookup(P).unwrap();
		assert_eq!(entry.container().label(), "C1");
		assert_eq!(entry.container().methods()[0].1, "c1");
	}

	#[test]
	fn mark_ready_sequencing() {
		let registry: Registry<&'static str> = Registry::new();
		assert_eq!(
			registry.mark_ready(P).unwrap_err(),
			RegistryError::UnknownProtocol(P)
		);

		registry.register(MethodContainer::new(P, "C1")).unwrap();
		assert!(!registry.is_ready(P));
		assert!(!registry.all_ready());

		registry.mark_ready(P).unwrap();
		assert!(registry.is_ready(P));
		assert!(registry.all_ready());

		assert_eq!(
			registry.mark_ready(P).unwrap_err(),
			RegistryError::AlreadyReady(P)
		);
	}

	#[test]
	fn lookup_missing_is_none() {
		let registry: Registry<&'static str> = Registry::new();
		assert!(registry.lookup(ProtocolId(42)).is_none());
		assert!(registry.is_empty());
		assert!(registry.all_ready());
	}
}
