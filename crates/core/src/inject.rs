//! Non-destructive installation of default method implementations.

use rustc_hash::FxHashSet as HashSet;

use crate::Selector;
use crate::host::HostRuntime;
use crate::resolve::PrecedenceList;

/// Counters from one injection pass over a `(type, protocol)` pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InjectionOutcome {
	/// Default implementations installed.
	pub installed: u32,
	/// Method names the type already defined (own or inherited).
	pub skipped: u32,
	/// Installations the host refused.
	pub failed: u32,
}

impl InjectionOutcome {
	/// Total method names considered.
	#[inline]
	pub fn total(&self) -> u32 {
		self.installed + self.skipped + self.failed
	}
}

/// Installs the defaults from `list` onto `ty`.
///
/// Injection only fills gaps: a method the type already defines — its own
/// or inherited — is never removed or replaced. Within the pass, the first
/// container supplying a name claims it, so a more-derived protocol's
/// default shadows the same name from an ancestor. A refused installation
/// is reported and does not block the remaining methods.
///
/// Safe to repeat: a method installed by a prior pass counts as already
/// defined on the next one.
pub fn inject_into<H: HostRuntime>(
	host: &H,
	ty: &H::Type,
	list: &PrecedenceList<H::Imp>,
) -> InjectionOutcome {
	let mut outcome = InjectionOutcome::default();
	let mut claimed: HashSet<Selector> = HashSet::default();

	for container in list.iter() {
		for (selector, imp) in container.methods() {
			if !claimed.insert(*selector) {
				// A more-derived container already owns this name.
				continue;
			}
			if host.type_defines_method(ty, *selector) {
				outcome.skipped += 1;
				continue;
			}
			match host.install_method(ty, *selector, imp) {
				Ok(()) => {
					outcome.installed += 1;
					tracing::trace!(
						ty = ?ty,
						%selector,
						container = container.label(),
						"installed default method"
					);
				}
				Err(err) => {
					outcome.failed += 1;
					tracing::warn!(
						ty = ?ty,
						%selector,
						container = container.label(),
						%err,
						"host refused method installation"
					);
				}
			}
		}
	}

	outcome
}

#[cfg(test)]
mod tests {
	use parking_lot::Mutex;
	use rustc_hash::FxHashMap as HashMap;

	use super::*;
	use crate::container::MethodContainer;
	use crate::host::InstallError;
	use crate::registry::Registry;
	use crate::{ProtocolId, resolve};

	const BASE: ProtocolId = ProtocolId(0);
	const DERIVED: ProtocolId = ProtocolId(1);

	/// Host with one flat level of types and an optional refused selector.
	struct TableHost {
		edges: Vec<(ProtocolId, Vec<ProtocolId>)>,
		tables: Mutex<HashMap<&'static str, HashMap<Selector, &'static str>>>,
		refused: Option<Selector>,
	}

	impl TableHost {
		fn new(edges: Vec<(ProtocolId, Vec<ProtocolId>)>) -> Self {
			Self {
				edges,
				tables: Mutex::new(HashMap::default()),
				refused: None,
			}
		}

		fn with_own_method(self, ty: &'static str, selector: Selector, imp: &'static str) -> Self {
			self.tables.lock().entry(ty).or_default().insert(selector, imp);
			self
		}

		fn slot(&self, ty: &'static str, selector: Selector) -> Option<&'static str> {
			self.tables
				.lock()
				.get(ty)
				.and_then(|table| table.get(&selector).copied())
		}
	}

	impl HostRuntime for TableHost {
		type Type = &'static str;
		type Imp = &'static str;

		fn protocol_of(&self, _name: &str) -> Option<ProtocolId> {
			None
		}

		fn super_protocols_of(&self, protocol: ProtocolId) -> Vec<ProtocolId> {
			self.edges
				.iter()
				.find(|(p, _)| *p == protocol)
				.map(|(_, supers)| supers.clone())
				.unwrap_or_default()
		}

		fn type_defines_method(&self, ty: &Self::Type, selector: Selector) -> bool {
			self.slot(ty, selector).is_some()
		}

		fn install_method(
			&self,
			ty: &Self::Type,
			selector: Selector,
			imp: &Self::Imp,
		) -> Result<(), InstallError> {
			if self.refused == Some(selector) {
				return Err(InstallError::ReservedSelector(selector));
			}
			self.tables.lock().entry(ty).or_default().insert(selector, imp);
			Ok(())
		}

		fn conforming_types_of(&self, _protocol: ProtocolId) -> Vec<Self::Type> {
			Vec::new()
		}
	}

	fn two_level_registry() -> Registry<&'static str> {
		let registry = Registry::new();
		registry
			.register(
				MethodContainer::new(BASE, "Base")
					.method(Selector("greet"), "base::greet")
					.method(Selector("farewell"), "base::farewell"),
			)
			.unwrap();
		registry.mark_ready(BASE).unwrap();
		registry
			.register(MethodContainer::new(DERIVED, "Derived").method(Selector("greet"), "derived::greet"))
			.unwrap();
		registry.mark_ready(DERIVED).unwrap();
		registry
	}

	#[test]
	fn fills_gaps_and_respects_existing_methods() {
		let host = TableHost::new(vec![(DERIVED, vec![BASE])])
			.with_own_method("Circle", Selector("greet"), "circle::greet");
		let registry = two_level_registry();
		let list = resolve(&host, &registry, DERIVED);

		let outcome = inject_into(&host, &"Circle", &list);
		assert_eq!(outcome, InjectionOutcome { installed: 1, skipped: 1, failed: 0 });

		// Own method untouched, gap filled from the ancestor.
		assert_eq!(host.slot("Circle", Selector("greet")), Some("circle::greet"));
		assert_eq!(host.slot("Circle", Selector("farewell")), Some("base::farewell"));
	}

	#[test]
	fn derived_default_shadows_ancestor_default() {
		let host = TableHost::new(vec![(DERIVED, vec![BASE])]);
		let registry = two_level_registry();
		let list = resolve(&host, &registry, DERIVED);

		inject_into(&host, &"X", &list);
		assert_eq!(host.slot("X", Selector("greet")), Some("derived::greet"));
		assert_eq!(host.slot("X", Selector("farewell")), Some("base::farewell"));
	}

	#[test]
	fn refused_installation_does_not_block_the_rest() {
		let mut host = TableHost::new(vec![(DERIVED, vec![BASE])]);
		host.refused = Some(Selector("greet"));
		let registry = two_level_registry();
		let list = resolve(&host, &registry, DERIVED);

		let outcome = inject_into(&host, &"X", &list);
		assert_eq!(outcome, InjectionOutcome { installed: 1, skipped: 0, failed: 1 });
		assert_eq!(host.slot("X", Selector("greet")), None);
		assert_eq!(host.slot("X", Selector("farewell")), Some("base::farewell"));
	}

	#[test]
	fn repeat_injection_is_idempotent() {
		let host = TableHost::new(vec![(DERIVED, vec![BASE])]);
		let registry = two_level_registry();
		let list = resolve(&host, &registry, DERIVED);

		let first = inject_into(&host, &"X", &list);
		assert_eq!(first.installed, 2);
		let before = host.tables.lock().clone();

		let second = inject_into(&host, &"X", &list);
		assert_eq!(second.installed, 0);
		assert_eq!(second.skipped, 2);
		assert_eq!(*host.tables.lock(), before);
	}
}
