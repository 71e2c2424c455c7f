//! Per-instance port slot tables.
//!
//! A [`PortArray`] is the connection state of one component instance: a set
//! of declared port names, each slot either unbound or bound to a callable.
//! Declaration happens once, at definition time; instances get their own
//! fresh copy through [`PortArray::replicate`], so siblings never share
//! connection state.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::trace;

use crate::error::{Result, WireError};
use crate::name::PortName;

/// The uniform callable bound into a port slot.
pub type PortFn = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// The slot surface shared by [`PortArray`] and
/// [`ShadowPortArray`](crate::ShadowPortArray).
pub trait PortSlots: Send + Sync {
	/// Declared port names, sorted.
	fn ports(&self) -> Vec<PortName>;

	/// Binds `func` into the named slot.
	fn connect_port(&self, name: &str, func: PortFn) -> Result<()>;

	/// Resets the named slot to unbound.
	fn disconnect_port(&self, name: &str) -> Result<()>;
}

/// A component instance's table of declared ports.
///
/// Slots start unbound; invoking an unbound slot fails with
/// [`WireError::DisconnectedPort`]. A bound slot must be explicitly
/// disconnected before it can be rebound.
#[derive(Default)]
pub struct PortArray {
	slots: RwLock<FxHashMap<PortName, Option<PortFn>>>,
}

impl PortArray {
	/// An empty array with no declared ports.
	pub fn new() -> Self {
		Self::default()
	}

	/// Declares a new port, unbound.
	pub fn add_port(&self, name: &str) -> Result<()> {
		let name = PortName::new(name)?;
		let mut slots = self.slots.write();
		if slots.contains_key(name.as_str()) {
			return Err(WireError::DuplicatePort(name.to_string()));
		}
		trace!(port = %name, "declared port");
		slots.insert(name, None);
		Ok(())
	}

	/// Binds `func` into the named slot.
	pub fn connect_port(&self, name: &str, func: PortFn) -> Result<()> {
		let mut slots = self.slots.write();
		match slots.get_mut(name) {
			None => Err(WireError::UnknownPort(name.to_string())),
			Some(Some(_)) => Err(WireError::DuplicatePort(name.to_string())),
			Some(slot) => {
				trace!(port = name, "connected port");
				*slot = Some(func);
				Ok(())
			}
		}
	}

	/// Resets the named slot to unbound. Idempotent on unbound slots.
	pub fn disconnect_port(&self, name: &str) -> Result<()> {
		let mut slots = self.slots.write();
		match slots.get_mut(name) {
			None => Err(WireError::UnknownPort(name.to_string())),
			Some(slot) => {
				*slot = None;
				Ok(())
			}
		}
	}

	/// Whether the named slot is declared but currently unbound.
	pub fn is_disconnected(&self, name: &str) -> Result<bool> {
		let slots = self.slots.read();
		match slots.get(name) {
			None => Err(WireError::UnknownPort(name.to_string())),
			Some(slot) => Ok(slot.is_none()),
		}
	}

	/// Calls the function bound to the named slot.
	///
	/// The slot table lock is released before the callable runs, so a bound
	/// function may itself invoke ports on this array.
	pub fn invoke(&self, name: &str, args: Value) -> Result<Value> {
		let func = {
			let slots = self.slots.read();
			match slots.get(name) {
				None => return Err(WireError::UnknownPort(name.to_string())),
				Some(None) => return Err(WireError::DisconnectedPort(name.to_string())),
				Some(Some(func)) => func.clone(),
			}
		};
		func(args)
	}

	/// A fresh array with the same declared ports, all unbound, regardless
	/// of this array's connection state.
	pub fn replicate(&self) -> Self {
		let slots = self.slots.read();
		let fresh = slots.keys().map(|name| (name.clone(), None)).collect();
		Self {
			slots: RwLock::new(fresh),
		}
	}

	/// Declared port names, sorted.
	pub fn ports(&self) -> Vec<PortName> {
		let mut names: Vec<PortName> = self.slots.read().keys().cloned().collect();
		names.sort();
		names
	}
}

impl PortSlots for PortArray {
	fn ports(&self) -> Vec<PortName> {
		PortArray::ports(self)
	}

	fn connect_port(&self, name: &str, func: PortFn) -> Result<()> {
		PortArray::connect_port(self, name, func)
	}

	fn disconnect_port(&self, name: &str) -> Result<()> {
		PortArray::disconnect_port(self, name)
	}
}
