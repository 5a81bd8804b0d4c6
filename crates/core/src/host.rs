//! Boundary with the host object/runtime system.

use std::fmt;
use std::hash::Hash;

use thiserror::Error;

use crate::{ProtocolId, Selector};

/// Raised when the host refuses a method installation.
///
/// Installation failures are per-method: the injector reports them and
/// continues with the remaining methods.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstallError {
	/// The target type is not known to the host runtime.
	#[error("type is not known to the host runtime")]
	UnknownType,
	/// The selector is reserved by the host and cannot be replaced.
	#[error("selector `{0}` is reserved by the host runtime")]
	ReservedSelector(Selector),
	/// Any other host-side refusal (e.g. an incompatible signature).
	#[error("installation rejected: {0}")]
	Rejected(&'static str),
}

/// The narrow interface this engine requires from its host object system.
///
/// The host owns protocol declarations, type identity, and the dispatch
/// surface methods are installed onto. Everything else — which defaults
/// exist, in what precedence order, and when they are installed — is this
/// crate's business.
pub trait HostRuntime {
	/// Identity of a conforming type. Cheap to clone and hashable so the
	/// engine can track visited `(type, protocol)` pairs.
	type Type: Clone + Eq + Hash + fmt::Debug;
	/// The host's representation of an invocable method implementation.
	type Imp: Clone;

	/// Resolves a declared protocol by its identifier.
	fn protocol_of(&self, name: &str) -> Option<ProtocolId>;

	/// Direct super-protocols of `protocol`, in declaration order.
	///
	/// Declaration order is load-bearing: it decides ties between
	/// unrelated ancestor branches during precedence resolution.
	fn super_protocols_of(&self, protocol: ProtocolId) -> Vec<ProtocolId>;

	/// Whether `ty` already defines `selector`, directly or through its
	/// own ancestry. A type's own method always beats an injected default.
	fn type_defines_method(&self, ty: &Self::Type, selector: Selector) -> bool;

	/// Installs `imp` as `ty`'s implementation of `selector`.
	fn install_method(
		&self,
		ty: &Self::Type,
		selector: Selector,
		imp: &Self::Imp,
	) -> Result<(), InstallError>;

	/// Types currently known to conform to `protocol`.
	///
	/// Types discovered later reach the engine through
	/// [`ProtocolDb::conformance_discovered`](crate::ProtocolDb::conformance_discovered).
	fn conforming_types_of(&self, protocol: ProtocolId) -> Vec<Self::Type>;
}
