//! The component polymorphism seam.
//!
//! Leaves, composites and adapters all meet the same three-trait contract:
//! [`Discoverable`] is the surface the discovery pass matches on,
//! [`ComponentDef`] is the definition-time surface a composite assembles
//! from, and [`Component`] is the live surface wiring binds together.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::{Result, WireError};
use crate::name::PortName;
use crate::needs::NeedSig;
use crate::ports::{PortArray, PortFn, PortSlots};

/// The introspection surface the discovery pass matches on.
pub trait Discoverable: Send + Sync {
	/// A human-readable identifier, used in error messages and logs.
	fn label(&self) -> &str;

	/// The port names this component requires.
	fn needs(&self) -> Vec<PortName>;

	/// The port names this component exposes.
	fn provides(&self) -> Vec<PortName>;
}

/// A component definition: the not-yet-instantiated form of a leaf,
/// composite or adapter.
pub trait ComponentDef: Discoverable {
	/// The metadata flags attached to a provided port.
	fn provider_flags(&self, port: &str) -> Result<BTreeMap<String, Value>>;

	/// One flag value, or `None` when the flag is unset.
	fn provider_flag(&self, port: &str, key: &str) -> Result<Option<Value>>;

	/// The doc line attached to a provided port, if any.
	fn provider_doc(&self, port: &str) -> Result<Option<String>>;

	/// The signature template declared for a required port, if the need
	/// was declared through an interface.
	fn need_template(&self, port: &str) -> Option<NeedSig>;

	/// Builds a live instance with its own, fresh connection state.
	fn instantiate(self: Arc<Self>) -> Result<Arc<dyn Component>>;
}

/// A live component instance.
pub trait Component: Discoverable {
	/// Resolves the callable exposed under `port`.
	fn provider_func(&self, port: &str) -> Result<PortFn>;

	/// The metadata flags attached to a provided port.
	fn provider_flags(&self, port: &str) -> Result<BTreeMap<String, Value>>;

	/// One flag value, or `None` when the flag is unset.
	fn provider_flag(&self, port: &str, key: &str) -> Result<Option<Value>>;

	/// The requirement slots of this instance, when it has any.
	fn deps_slots(&self) -> Option<Arc<dyn PortSlots>>;

	/// Satisfies the named need with `provider`'s exposed callable.
	fn set_provider(&self, port: &str, provider: &dyn Component) -> Result<()>;

	/// Invokes a provided port.
	fn call(&self, port: &str, args: Value) -> Result<Value>;
}

/// The narrow requirement-access handle an op body receives.
///
/// Ops consume their service's needs exclusively through
/// [`Deps::call`]; the port array itself stays private to the instance.
pub struct Deps {
	slots: Arc<PortArray>,
}

impl Deps {
	pub(crate) fn new(slots: Arc<PortArray>) -> Self {
		Self { slots }
	}

	/// Invokes the named required port.
	pub fn call(&self, name: &str, args: Value) -> Result<Value> {
		self.slots.invoke(name, args)
	}
}

/// Per-instance record of which provider satisfied which need.
///
/// A need accepts exactly one provider; offering a second fails with
/// [`WireError::DuplicateProviders`] naming both.
#[derive(Default)]
pub(crate) struct AssignedProviders {
	by_port: RwLock<FxHashMap<String, String>>,
}

impl AssignedProviders {
	fn existing(&self, port: &str) -> Option<String> {
		self.by_port.read().get(port).cloned()
	}

	fn record(&self, port: &str, provider: &str) {
		self.by_port.write().insert(port.to_string(), provider.to_string());
	}
}

/// Shared `set_provider` flow: reject a second provider, resolve the
/// callable through the provider's own metadata, connect, then record.
///
/// A failed connect leaves no record behind, so a later attempt with a
/// different provider starts clean.
pub(crate) fn assign_provider(
	assigned: &AssignedProviders,
	slots: &dyn PortSlots,
	port: &str,
	provider: &dyn Component,
) -> Result<()> {
	if let Some(first) = assigned.existing(port) {
		return Err(WireError::DuplicateProviders {
			port: port.to_string(),
			first,
			second: provider.label().to_string(),
		});
	}
	let func = provider.provider_func(port)?;
	slots.connect_port(port, func)?;
	assigned.record(port, provider.label());
	Ok(())
}

/// Identity comparison for `Arc`-held components, by allocation address.
pub(crate) fn same_component<A: ?Sized, B: ?Sized>(a: &Arc<A>, b: &Arc<B>) -> bool {
	std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
