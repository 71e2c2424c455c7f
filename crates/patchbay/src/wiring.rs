//! Batch wiring entry points.

use std::sync::Arc;

use tracing::debug;

use crate::component::Component;
use crate::discovery::AutoDiscovery;
use crate::error::{Result, WireError};

/// Discovers and wires connections across `components`, leaving needs
/// nobody provides unbound.
pub fn wire(components: &[Arc<dyn Component>]) -> Result<()> {
	run(components, false)
}

/// Discovers and wires connections across `components`, failing with
/// [`WireError::DisconnectedPorts`] if any need would remain unsatisfied.
///
/// The check runs before any binding, so a failed call leaves every
/// component exactly as it was.
pub fn wire_strict(components: &[Arc<dyn Component>]) -> Result<()> {
	run(components, true)
}

fn run(components: &[Arc<dyn Component>], require_all: bool) -> Result<()> {
	let discovered = AutoDiscovery::over(components)?;

	if require_all {
		let missing = discovered.unsatisfied_needs();
		if !missing.is_empty() {
			return Err(WireError::DisconnectedPorts(
				missing.iter().map(ToString::to_string).collect(),
			));
		}
	}

	wire_connections(&discovered)
}

/// Binds every discovered connection, resolving each callable through the
/// provider's own metadata.
pub(crate) fn wire_connections(discovered: &AutoDiscovery<dyn Component>) -> Result<()> {
	for connection in discovered.connections() {
		connection
			.consumer
			.set_provider(connection.port.as_str(), connection.provider.as_ref())?;
		debug!(
			port = %connection.port,
			consumer = connection.consumer.label(),
			provider = connection.provider.label(),
			"wired connection"
		);
	}
	Ok(())
}
