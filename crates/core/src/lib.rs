//! Concrete-protocol registry and default-method injection engine.
//!
//! A *concrete protocol* is a protocol (interface) declaration that also
//! supplies default implementations for some of its methods. This crate
//! provides the machinery that tracks those implementations and installs
//! them into conforming types:
//!
//! - [`Registry`]: append-only table from protocol identity to its
//!   [`MethodContainer`], with a two-phase registered/ready lifecycle
//! - [`resolve`]: the precedence walk over a protocol and its ancestor
//!   concrete protocols, most-derived first
//! - [`inject_into`]: the non-destructive installation pass
//! - [`ProtocolDb`]: the facade sequencing readiness, one-time
//!   initializers, and injection sweeps
//!
//! The host object system is consumed only through the [`HostRuntime`]
//! trait; the engine never assumes a particular dispatch representation.

use std::fmt;

pub mod container;
pub mod db;
pub mod host;
pub mod inject;
pub mod registry;
pub mod resolve;

pub use container::{InitScope, Initializer, MethodContainer};
pub use db::{DiagnosticReport, ProtocolDb, ProtocolReport};
pub use host::{HostRuntime, InstallError};
pub use inject::{InjectionOutcome, inject_into};
pub use registry::{Registry, RegistryEntry, RegistryError};
pub use resolve::{PrecedenceCache, PrecedenceList, resolve};

/// Opaque identity of a declared protocol.
///
/// Handles are minted by the host runtime; equality is identity-based
/// (the same protocol declaration always yields the same handle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolId(pub u32);

impl ProtocolId {
	/// Represents an invalid protocol handle.
	pub const INVALID: ProtocolId = ProtocolId(u32::MAX);

	/// Returns true if this handle is valid.
	#[inline]
	pub fn is_valid(self) -> bool {
		self != Self::INVALID
	}

	/// Returns the underlying u32 value.
	#[inline]
	pub fn as_u32(self) -> u32 {
		self.0
	}
}

impl fmt::Display for ProtocolId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if *self == Self::INVALID {
			write!(f, "ProtocolId(INVALID)")
		} else {
			write!(f, "ProtocolId({})", self.0)
		}
	}
}

/// Method-signature key: the name a method is installed and looked up under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selector(pub &'static str);

impl Selector {
	/// Returns the selector name.
	#[inline]
	pub fn as_str(self) -> &'static str {
		self.0
	}
}

impl fmt::Display for Selector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.0)
	}
}
