//! The name-matching pass that pairs requirers with providers.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::component::{Discoverable, same_component};
use crate::error::{Result, WireError};
use crate::name::PortName;

/// A discovered requirer/provider pairing. Transient: connections exist
/// only to drive a wiring pass, nothing persists them.
pub struct Connection<T: ?Sized> {
	/// The matched port name.
	pub port: PortName,
	/// The component whose need is satisfied.
	pub consumer: Arc<T>,
	/// The component exposing the port.
	pub provider: Arc<T>,
}

impl<T: ?Sized> Clone for Connection<T> {
	fn clone(&self) -> Self {
		Self {
			port: self.port.clone(),
			consumer: self.consumer.clone(),
			provider: self.provider.clone(),
		}
	}
}

/// The result of one discovery pass over a component collection.
///
/// Matching is purely by port-name equality; input order is irrelevant and
/// every derived view comes back sorted. Generic over the component surface
/// so one pass serves definition-level assembly (over defs) and
/// instance-level wiring (over live components).
pub struct AutoDiscovery<T: ?Sized> {
	needs: BTreeMap<PortName, Vec<Arc<T>>>,
	provides: BTreeMap<PortName, Arc<T>>,
}

impl<T: ?Sized> std::fmt::Debug for AutoDiscovery<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AutoDiscovery")
			.field("needs", &self.needs.keys().collect::<Vec<_>>())
			.field("provides", &self.provides.keys().collect::<Vec<_>>())
			.finish()
	}
}

impl<T: Discoverable + ?Sized> AutoDiscovery<T> {
	/// Gathers needs and provides across `components` and validates the
	/// collection.
	///
	/// Fails eagerly: a port exposed by two components is
	/// [`WireError::DuplicateProviders`], and a component requiring a port
	/// it provides itself is [`WireError::SelfReferencingMadness`].
	pub fn over(components: &[Arc<T>]) -> Result<Self> {
		let mut needs: BTreeMap<PortName, Vec<Arc<T>>> = BTreeMap::new();
		for component in components {
			for port in component.needs() {
				needs.entry(port).or_default().push(component.clone());
			}
		}

		let mut provides: BTreeMap<PortName, Arc<T>> = BTreeMap::new();
		for component in components {
			for port in component.provides() {
				if let Some(first) = provides.get(&port) {
					return Err(WireError::DuplicateProviders {
						port: port.to_string(),
						first: first.label().to_string(),
						second: component.label().to_string(),
					});
				}
				provides.insert(port, component.clone());
			}
		}

		for (port, requirers) in &needs {
			if let Some(provider) = provides.get(port)
				&& requirers.iter().any(|requirer| same_component(requirer, provider))
			{
				return Err(WireError::SelfReferencingMadness {
					component: provider.label().to_string(),
					port: port.to_string(),
				});
			}
		}

		let discovered = Self { needs, provides };
		debug!(
			needs = ?discovered.needs(),
			provides = ?discovered.provides(),
			unsatisfied = ?discovered.unsatisfied_needs(),
			"discovery pass complete"
		);
		Ok(discovered)
	}

	/// Every required port name, sorted.
	pub fn needs(&self) -> Vec<PortName> {
		self.needs.keys().cloned().collect()
	}

	/// Every provided port name, sorted.
	pub fn provides(&self) -> Vec<PortName> {
		self.provides.keys().cloned().collect()
	}

	/// Required names no component provides, sorted.
	pub fn unsatisfied_needs(&self) -> Vec<PortName> {
		self.needs
			.keys()
			.filter(|port| !self.provides.contains_key(port.as_str()))
			.cloned()
			.collect()
	}

	/// Required names some component provides, sorted.
	pub fn satisfied_needs(&self) -> Vec<PortName> {
		self.needs
			.keys()
			.filter(|port| self.provides.contains_key(port.as_str()))
			.cloned()
			.collect()
	}

	/// The component providing `port`.
	pub fn provider_of(&self, port: &str) -> Result<Arc<T>> {
		self.provides
			.get(port)
			.cloned()
			.ok_or_else(|| WireError::UnknownPort(port.to_string()))
	}

	/// The components requiring `port`, in gather order. A component
	/// listed twice in the input appears twice here.
	pub fn requirers_of(&self, port: &str) -> Vec<Arc<T>> {
		self.needs.get(port).cloned().unwrap_or_default()
	}

	/// One connection per (satisfied port, requirer) pair.
	pub fn connections(&self) -> Vec<Connection<T>> {
		let mut connections = Vec::new();
		for (port, requirers) in &self.needs {
			let Some(provider) = self.provides.get(port) else {
				continue;
			};
			for consumer in requirers {
				connections.push(Connection {
					port: port.clone(),
					consumer: consumer.clone(),
					provider: provider.clone(),
				});
			}
		}
		connections
	}
}
