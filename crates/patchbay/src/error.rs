//! Error types for declaration, discovery, wiring and invocation.

use thiserror::Error;

/// Every failure the wiring engine reports.
///
/// Failures are raised eagerly, at the first point the violated rule is
/// detectable, and are local to the operation that raised them: a failed
/// call never leaves a component half modified.
#[derive(Debug, Clone, Error)]
pub enum WireError {
	/// A port name failed validation.
	#[error("\"{name}\" is not a valid port name: {reason}")]
	InvalidPortName {
		/// The rejected name.
		name: String,
		/// What the name violated.
		reason: String,
	},

	/// A port name was declared twice in one registry, or a bound slot was
	/// connected again without an explicit disconnect first.
	#[error("port \"{0}\" is already in use")]
	DuplicatePort(String),

	/// Two components claim one port name, or one need was offered two
	/// providers.
	#[error("duplicate providers for \"{port}\": {first} and {second}")]
	DuplicateProviders {
		/// The contested port name.
		port: String,
		/// The provider seen first.
		first: String,
		/// The provider that collided with it.
		second: String,
	},

	/// An op references needs its service never declared.
	#[error("{op} references undeclared needs: {}", .ports.join(", "))]
	UnknownPorts {
		/// The offending op, as `service.op`.
		op: String,
		/// The undeclared names, sorted.
		ports: Vec<String>,
	},

	/// Declared needs that no op of the service references.
	#[error("{service} has unused needs: {}", .ports.join(", "))]
	UnusedPorts {
		/// The service whose declaration is too wide.
		service: String,
		/// The never-referenced names, sorted.
		ports: Vec<String>,
	},

	/// Requirers of one unresolved port declared conflicting interface
	/// templates.
	#[error("components {} all need \"{port}\" but expect different interfaces", .components.join(", "))]
	InconsistentInterface {
		/// The contested port name.
		port: String,
		/// The requirers holding a template, sorted.
		components: Vec<String>,
	},

	/// A component both needs and provides the same port.
	#[error("{component} both needs and provides \"{port}\". Madness.")]
	SelfReferencingMadness {
		/// The conflicted component.
		component: String,
		/// The port it wants from itself.
		port: String,
	},

	/// A service definition broke a structural rule.
	#[error("invalid service definition: {0}")]
	ServiceDefinition(String),

	/// A domain definition broke a structural rule.
	#[error("invalid domain definition: {0}")]
	DomainDefinition(String),

	/// A needs interface declared an invalid stub.
	#[error("invalid needs interface: {0}")]
	NeedsInterfaceDefinition(String),

	/// Strict wiring found needs no component provides.
	#[error("the following ports are disconnected: {}", .0.join(", "))]
	DisconnectedPorts(Vec<String>),

	/// An unbound port was invoked.
	#[error("port \"{0}\" has not been connected")]
	DisconnectedPort(String),

	/// A port name that is not declared or provided here.
	#[error("\"{0}\" is not a valid port")]
	UnknownPort(String),

	/// A listed port has no matching method on the adapted object.
	#[error("\"{name}\" is not a method of {object}")]
	AttributeMissing {
		/// The adapted object's label.
		object: String,
		/// The missing method name.
		name: String,
	},

	/// Usage analysis could not parse an op body.
	#[error(transparent)]
	DepScan(#[from] patchbay_depscan::DepScanError),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, WireError>;
