//! Precedence resolution over the protocol inheritance graph.

use std::sync::Arc;

use arc_swap::ArcSwap;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

use crate::ProtocolId;
use crate::container::MethodContainer;
use crate::host::HostRuntime;
use crate::registry::Registry;

/// Resolution order among a protocol and its concrete ancestors.
///
/// Most-derived first; duplicates removed keeping the first occurrence;
/// only ready registry entries contribute.
pub struct PrecedenceList<I> {
	entries: Vec<Arc<MethodContainer<I>>>,
}

impl<I> PrecedenceList<I> {
	/// Containers in precedence order.
	#[inline]
	pub fn iter(&self) -> impl Iterator<Item = &Arc<MethodContainer<I>>> {
		self.entries.iter()
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Protocols contributing entries, in precedence order.
	pub fn protocols(&self) -> Vec<ProtocolId> {
		self.entries.iter().map(|c| c.protocol()).collect()
	}
}

/// Walks the protocol graph and produces the precedence list for `protocol`.
///
/// Depth-first, pre-order: a node's own ready entry is appended before its
/// ancestors are visited, and each directly-inherited protocol is visited
/// in declaration order — so when two unrelated ancestor branches define
/// the same method name, the branch declared first wins. Plain protocols
/// contribute no entry but their ancestors are still traversed. A visited
/// set guards against revisits, which also makes the walk terminate on
/// malformed (cyclic) graphs.
pub fn resolve<H: HostRuntime>(
	host: &H,
	registry: &Registry<H::Imp>,
	protocol: ProtocolId,
) -> PrecedenceList<H::Imp> {
	let mut entries = Vec::new();
	let mut visited = HashSet::default();
	walk(host, registry, protocol, &mut visited, &mut entries);
	PrecedenceList { entries }
}

fn walk<H: HostRuntime>(
	host: &H,
	registry: &Registry<H::Imp>,
	protocol: ProtocolId,
	visited: &mut HashSet<ProtocolId>,
	out: &mut Vec<Arc<MethodContainer<H::Imp>>>,
) {
	if !visited.insert(protocol) {
		return;
	}
	if let Some(entry) = registry.lookup(protocol)
		&& entry.is_ready()
	{
		out.push(entry.container().clone());
	}
	for ancestor in host.super_protocols_of(protocol) {
		walk(host, registry, ancestor, visited, out);
	}
}

/// Snapshot cache of resolved precedence lists, keyed by protocol.
///
/// Reads are lock-free loads; writers replace the whole snapshot. The
/// owning facade clears the cache on every registration and readiness
/// event, so a cached list can never miss an entry that was ready before
/// it was resolved.
pub struct PrecedenceCache<I> {
	lists: ArcSwap<HashMap<ProtocolId, Arc<PrecedenceList<I>>>>,
}

impl<I> Default for PrecedenceCache<I> {
	fn default() -> Self {
		Self::new()
	}
}

impl<I> PrecedenceCache<I> {
	pub fn new() -> Self {
		Self {
			lists: ArcSwap::from_pointee(HashMap::default()),
		}
	}

	#[inline]
	pub fn get(&self, protocol: ProtocolId) -> Option<Arc<PrecedenceList<I>>> {
		self.lists.load().get(&protocol).cloned()
	}

	/// Publishes a resolved list. Racing writers may each publish a copy;
	/// the losing insert is simply recomputed on the next miss.
	pub fn store(&self, protocol: ProtocolId, list: Arc<PrecedenceList<I>>) {
		self.lists.rcu(|current| {
			let mut next = (**current).clone();
			next.insert(protocol, Arc::clone(&list));
			next
		});
	}

	/// Drops every cached list.
	pub fn clear(&self) {
		self.lists.store(Arc::new(HashMap::default()));
	}
}
