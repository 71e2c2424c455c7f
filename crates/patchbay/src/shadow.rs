//! Multiplexing views over several port arrays.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Result, WireError};
use crate::name::PortName;
use crate::ports::{PortFn, PortSlots};

/// A view that fronts the requirement ports of several underlying arrays.
///
/// The declared set is the union of the fronted arrays' ports minus an
/// ignore set (names already satisfied elsewhere). Connect and disconnect
/// broadcast to every fronted array declaring the name, so one external
/// provider can satisfy many components through a single connection. The
/// shadow keeps no slot state of its own.
pub struct ShadowPortArray {
	ports: BTreeMap<PortName, Vec<Arc<dyn PortSlots>>>,
}

impl ShadowPortArray {
	/// Builds a view over `arrays`, excluding the names in `ignore`.
	///
	/// Fronted port sets are gathered once, here; ports declared on an
	/// underlying array later are not picked up.
	pub fn new(arrays: Vec<Arc<dyn PortSlots>>, ignore: &[PortName]) -> Self {
		let mut ports: BTreeMap<PortName, Vec<Arc<dyn PortSlots>>> = BTreeMap::new();
		for array in arrays {
			for port in array.ports() {
				if ignore.contains(&port) {
					continue;
				}
				ports.entry(port).or_default().push(array.clone());
			}
		}
		Self { ports }
	}

	fn arrays_for(&self, name: &str) -> Result<&[Arc<dyn PortSlots>]> {
		self.ports
			.get(name)
			.map(Vec::as_slice)
			.ok_or_else(|| WireError::UnknownPort(name.to_string()))
	}
}

impl PortSlots for ShadowPortArray {
	fn ports(&self) -> Vec<PortName> {
		self.ports.keys().cloned().collect()
	}

	fn connect_port(&self, name: &str, func: PortFn) -> Result<()> {
		for array in self.arrays_for(name)? {
			array.connect_port(name, func.clone())?;
		}
		Ok(())
	}

	fn disconnect_port(&self, name: &str) -> Result<()> {
		for array in self.arrays_for(name)? {
			array.disconnect_port(name)?;
		}
		Ok(())
	}
}
