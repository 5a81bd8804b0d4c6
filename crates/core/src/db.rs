//! Facade sequencing registration, readiness, and injection.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

use crate::ProtocolId;
use crate::container::{MethodContainer, run_initializer};
use crate::host::HostRuntime;
use crate::inject::{InjectionOutcome, inject_into};
use crate::registry::{Registry, RegistryError};
use crate::resolve::{PrecedenceCache, PrecedenceList};

/// Per-protocol line of a [`DiagnosticReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolReport {
	pub protocol: ProtocolId,
	pub label: &'static str,
	pub ready: bool,
	pub methods: usize,
}

/// Snapshot of registry and injection state.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticReport {
	/// Registered protocols, ordered by handle.
	pub protocols: Vec<ProtocolReport>,
	/// Conformances queued while registrations were still pending.
	pub pending_conformances: usize,
	/// `(type, protocol)` pairs already visited for injection.
	pub injected_pairs: usize,
}

/// Owns the registry, the precedence cache, and the injection bookkeeping
/// for one host runtime.
///
/// Registrations and readiness announcements may arrive in any relative
/// order; injection sweeps run only once every registered protocol is
/// ready, so the injector never observes a partially-registered registry.
/// After that point the database is effectively read-only and safe to
/// query from multiple threads.
pub struct ProtocolDb<H: HostRuntime> {
	registry: Registry<H::Imp>,
	cache: PrecedenceCache<H::Imp>,
	injected: Mutex<HashSet<(H::Type, ProtocolId)>>,
	pending: Mutex<HashMap<ProtocolId, Vec<H::Type>>>,
}

impl<H: HostRuntime> Default for ProtocolDb<H> {
	fn default() -> Self {
		Self::new()
	}
}

impl<H: HostRuntime> ProtocolDb<H> {
	pub fn new() -> Self {
		Self {
			registry: Registry::new(),
			cache: PrecedenceCache::new(),
			injected: Mutex::new(HashSet::default()),
			pending: Mutex::new(HashMap::default()),
		}
	}

	/// The underlying registry, for lookups and diagnostics.
	#[inline]
	pub fn registry(&self) -> &Registry<H::Imp> {
		&self.registry
	}

	/// Registers a method container for its protocol.
	///
	/// Re-registration is refused, never an overwrite; the caller reports
	/// the error and keeps loading.
	pub fn register(&self, container: MethodContainer<H::Imp>) -> Result<(), RegistryError> {
		self.registry.register(container)?;
		self.cache.clear();
		Ok(())
	}

	/// Marks `protocol` ready: runs its one-time initializer, and — once
	/// every registered protocol is ready — performs the injection sweep
	/// over all known conformances.
	pub fn mark_ready(&self, host: &H, protocol: ProtocolId) -> Result<(), RegistryError> {
		let entry = self.registry.mark_ready(protocol)?;
		run_initializer(entry.container());
		self.cache.clear();
		if self.registry.all_ready() {
			self.sweep(host);
		}
		Ok(())
	}

	/// Resolves the precedence list for `protocol` through the cache.
	pub fn resolve(&self, host: &H, protocol: ProtocolId) -> Arc<PrecedenceList<H::Imp>> {
		if let Some(list) = self.cache.get(protocol) {
			return list;
		}
		let list = Arc::new(crate::resolve::resolve(host, &self.registry, protocol));
		self.cache.store(protocol, Arc::clone(&list));
		list
	}

	/// Injects defaults for one `(type, protocol)` conformance event.
	///
	/// Runs at most once per pair; repeats are no-ops. Calling this for a
	/// registered protocol that is not yet ready is a sequencing bug and
	/// is reported and skipped.
	pub fn inject(&self, host: &H, ty: &H::Type, protocol: ProtocolId) -> InjectionOutcome {
		if let Some(entry) = self.registry.lookup(protocol)
			&& !entry.is_ready()
		{
			tracing::error!(%protocol, "injection requested before protocol was marked ready");
			return InjectionOutcome::default();
		}
		if !self.injected.lock().insert((ty.clone(), protocol)) {
			return InjectionOutcome::default();
		}
		let list = self.resolve(host, protocol);
		inject_into(host, ty, &list)
	}

	/// Subscription entry point for conformances discovered after load.
	///
	/// While any registered protocol is still pending readiness the pair is
	/// queued and picked up by the sweep; afterwards it injects immediately.
	pub fn conformance_discovered(&self, host: &H, ty: H::Type, protocol: ProtocolId) {
		if self.registry.all_ready() {
			self.inject(host, &ty, protocol);
		} else {
			self.pending.lock().entry(protocol).or_default().push(ty);
		}
	}

	/// Injection sweep over every known conformance.
	///
	/// Protocols with longer precedence lists go first (ties broken by
	/// handle), so a derived protocol's defaults land before an ancestor's
	/// can claim shared method names.
	fn sweep(&self, host: &H) {
		let mut seen = HashSet::default();
		let mut work: Vec<(ProtocolId, Arc<PrecedenceList<H::Imp>>)> = Vec::new();
		for protocol in self.registry.ready_protocols() {
			if seen.insert(protocol) {
				work.push((protocol, self.resolve(host, protocol)));
			}
		}
		// Plain protocols can carry queued conformances too; their lists
		// hold only ancestor entries.
		let queued: Vec<ProtocolId> = self.pending.lock().keys().copied().collect();
		for protocol in queued {
			if seen.insert(protocol) {
				work.push((protocol, self.resolve(host, protocol)));
			}
		}
		work.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.0.cmp(&b.0)));

		for (protocol, _) in work {
			let mut targets = host.conforming_types_of(protocol);
			if let Some(queued) = self.pending.lock().remove(&protocol) {
				targets.extend(queued);
			}
			for ty in targets {
				self.inject(host, &ty, protocol);
			}
		}
	}

	/// Snapshot of the database for diagnostics.
	pub fn report(&self) -> DiagnosticReport {
		let mut protocols: Vec<ProtocolReport> = self
			.registry
			.protocols()
			.into_iter()
			.filter_map(|protocol| {
				self.registry.lookup(protocol).map(|entry| ProtocolReport {
					protocol,
					label: entry.container().label(),
					ready: entry.is_ready(),
					methods: entry.container().len(),
				})
			})
			.collect();
		protocols.sort_by_key(|line| line.protocol);

		DiagnosticReport {
			protocols,
			pending_conformances: self.pending.lock().values().map(Vec::len).sum(),
			injected_pairs: self.injected.lock().len(),
		}
	}
}
