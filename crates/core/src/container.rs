//! Method containers and the one-time protocol initializer.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::{ProtocolId, Selector};

/// One-time setup routine attached to a concrete protocol.
///
/// Runs exactly once, when the protocol is marked ready — strictly after
/// its methods exist in the registry, but with no guarantee that any
/// conforming type has received them yet.
pub type Initializer = fn(&mut InitScope);

/// Deterministic-cleanup scope handed to a protocol initializer.
///
/// Transient resources the initializer allocates are released through
/// [`defer`](InitScope::defer) when the scope ends, in reverse
/// registration order, no matter how the routine exits.
#[derive(Default)]
pub struct InitScope {
	cleanups: Vec<Box<dyn FnOnce() + Send>>,
}

impl InitScope {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a cleanup to run when the scope ends.
	pub fn defer(&mut self, cleanup: impl FnOnce() + Send + 'static) {
		self.cleanups.push(Box::new(cleanup));
	}

	/// Number of cleanups currently registered.
	#[inline]
	pub fn depth(&self) -> usize {
		self.cleanups.len()
	}
}

impl Drop for InitScope {
	fn drop(&mut self) {
		while let Some(cleanup) = self.cleanups.pop() {
			cleanup();
		}
	}
}

/// A named bundle of default method implementations for one protocol.
///
/// Containers are immutable once registered: the [`Registry`](crate::Registry)
/// takes ownership and never hands out a mutable view again.
pub struct MethodContainer<I> {
	protocol: ProtocolId,
	label: &'static str,
	methods: Vec<(Selector, I)>,
	initializer: Option<Initializer>,
}

impl<I> MethodContainer<I> {
	/// Creates an empty container for `protocol`, labeled for diagnostics.
	pub fn new(protocol: ProtocolId, label: &'static str) -> Self {
		Self {
			protocol,
			label,
			methods: Vec::new(),
			initializer: None,
		}
	}

	/// Adds a default implementation under `selector`.
	///
	/// Duplicate selectors within one container keep the first body.
	pub fn method(mut self, selector: Selector, imp: I) -> Self {
		if self.methods.iter().any(|(s, _)| *s == selector) {
			tracing::warn!(
				container = self.label,
				%selector,
				"duplicate selector in method container; keeping the first"
			);
			return self;
		}
		self.methods.push((selector, imp));
		self
	}

	/// Attaches the one-time setup routine.
	pub fn with_initializer(mut self, initializer: Initializer) -> Self {
		self.initializer = Some(initializer);
		self
	}

	/// The protocol this container implements.
	#[inline]
	pub fn protocol(&self) -> ProtocolId {
		self.protocol
	}

	/// Diagnostic label (conventionally the protocol name).
	#[inline]
	pub fn label(&self) -> &'static str {
		self.label
	}

	/// Default implementations in declaration order.
	#[inline]
	pub fn methods(&self) -> &[(Selector, I)] {
		&self.methods
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.methods.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.methods.is_empty()
	}

	/// The attached initializer, if any.
	#[inline]
	pub fn initializer(&self) -> Option<Initializer> {
		self.initializer
	}
}

impl<I> fmt::Debug for MethodContainer<I> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MethodContainer")
			.field("protocol", &self.protocol)
			.field("label", &self.label)
			.field("methods", &self.methods.len())
			.field("initializer", &self.initializer.is_some())
			.finish()
	}
}

/// Runs the container's initializer inside a fresh [`InitScope`].
///
/// A panic is contained and reported; the protocol stays available for
/// injection either way. Scope cleanups run after the routine exits,
/// panicking or not.
pub(crate) fn run_initializer<I>(container: &MethodContainer<I>) {
	let Some(initializer) = container.initializer() else {
		return;
	};
	let mut scope = InitScope::new();
	let outcome = panic::catch_unwind(AssertUnwindSafe(|| initializer(&mut scope)));
	drop(scope);
	if outcome.is_err() {
		tracing::error!(
			container = container.label(),
			"protocol initializer panicked; protocol remains available for injection"
		);
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;

	static CLEANUPS: AtomicUsize = AtomicUsize::new(0);
	static PANICKED_CLEANUPS: AtomicUsize = AtomicUsize::new(0);

	#[test]
	fn duplicate_selector_keeps_first() {
		let container = MethodContainer::new(ProtocolId(0), "Test")
			.method(Selector("greet"), "first")
			.method(Selector("greet"), "second");

		assert_eq!(container.len(), 1);
		assert_eq!(container.methods()[0].1, "first");
	}

	#[test]
	fn init_scope_runs_cleanups_in_reverse() {
		let order = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
		let mut scope = InitScope::new();
		let first = order.clone();
		scope.defer(move || first.lock().push(1));
		let second = order.clone();
		scope.defer(move || second.lock().push(2));
		assert_eq!(scope.depth(), 2);
		drop(scope);
		assert_eq!(*order.lock(), vec![2, 1]);
	}

	fn counting_init(scope: &mut InitScope) {
		scope.defer(|| {
			CLEANUPS.fetch_add(1, Ordering::SeqCst);
		});
	}

	fn panicking_init(scope: &mut InitScope) {
		scope.defer(|| {
			PANICKED_CLEANUPS.fetch_add(1, Ordering::SeqCst);
		});
		panic!("initializer failure");
	}

	#[test]
	fn initializer_runs_and_cleans_up() {
		let container = MethodContainer::<&'static str>::new(ProtocolId(1), "Counting")
			.with_initializer(counting_init);
		run_initializer(&container);
		assert_eq!(CLEANUPS.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn initializer_panic_is_contained_and_cleanups_still_run() {
		let container = MethodContainer::<&'static str>::new(ProtocolId(2), "Panicking")
			.with_initializer(panicking_init);
		run_initializer(&container);
		assert_eq!(PANICKED_CLEANUPS.load(Ordering::SeqCst), 1);
	}
}
