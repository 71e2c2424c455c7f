//! Requirement declarations.
//!
//! A service declares the ports it requires through a [`Needs`] value,
//! either as a flat name list or as a typed interface whose stub signatures
//! double as documentation and as templates for cross-component interface
//! checks (see [`DomainDef`](crate::DomainDef)).

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, WireError};
use crate::name::PortName;

/// The declared parameter names of a required operation.
///
/// Attached to a need declared through an interface; needs declared as
/// plain names carry no signature and are compatible with anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeedSig {
	params: Vec<String>,
}

impl NeedSig {
	/// A signature with the given parameter names.
	pub fn new<I, S>(params: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			params: params.into_iter().map(Into::into).collect(),
		}
	}

	/// The parameter names, in declaration order.
	pub fn params(&self) -> &[String] {
		&self.params
	}
}

impl fmt::Display for NeedSig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "({})", self.params.join(", "))
	}
}

/// One stub of an interface-form declaration, as produced by
/// [`needs_interface!`](crate::needs_interface).
pub struct NeedStub {
	name: String,
	params: Vec<String>,
}

impl NeedStub {
	/// A stub for port `name` expecting the given parameters.
	pub fn new(name: &str, params: &[&str]) -> Self {
		Self {
			name: name.to_string(),
			params: params.iter().map(|p| p.to_string()).collect(),
		}
	}
}

/// The set of ports a service requires.
#[derive(Debug, Default)]
pub struct Needs {
	ports: Vec<PortName>,
	templates: BTreeMap<PortName, NeedSig>,
}

impl Needs {
	/// No requirements.
	pub fn none() -> Self {
		Self::default()
	}

	/// Declares requirements from a list of port names.
	///
	/// Every name is validated; a name listed twice fails
	/// [`WireError::DuplicatePort`].
	pub fn new<I, S>(ports: I) -> Result<Self>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut declared = Self::none();
		for port in ports {
			declared.declare(port.into())?;
		}
		Ok(declared)
	}

	/// Declares requirements from interface stubs, keeping each stub's
	/// parameter list as the port's signature template.
	pub fn interface<I>(stubs: I) -> Result<Self>
	where
		I: IntoIterator<Item = NeedStub>,
	{
		let mut declared = Self::none();
		for stub in stubs {
			let mut seen = Vec::new();
			for param in &stub.params {
				if seen.contains(&param) {
					return Err(WireError::NeedsInterfaceDefinition(format!(
						"{}: parameter \"{param}\" is listed twice",
						stub.name
					)));
				}
				seen.push(param);
			}
			let name = declared.declare(stub.name)?;
			declared.templates.insert(name, NeedSig::new(stub.params));
		}
		Ok(declared)
	}

	fn declare(&mut self, port: String) -> Result<PortName> {
		let name = PortName::new(port)?;
		if self.ports.contains(&name) {
			return Err(WireError::DuplicatePort(name.to_string()));
		}
		self.ports.push(name.clone());
		Ok(name)
	}

	/// The declared port names, in declaration order.
	pub fn ports(&self) -> &[PortName] {
		&self.ports
	}

	/// Whether `name` is among the declared ports.
	pub fn contains(&self, name: &str) -> bool {
		self.ports.iter().any(|port| port.as_str() == name)
	}

	/// The signature template for `name`, when declared through an
	/// interface.
	pub fn template(&self, name: &str) -> Option<&NeedSig> {
		self.templates.get(name)
	}

	/// Whether no ports are declared.
	pub fn is_empty(&self) -> bool {
		self.ports.is_empty()
	}
}

/// Declares a [`Needs`] set from port name literals.
///
/// ```
/// # use patchbay::needs;
/// let deps = needs!("get_time", "store_order").unwrap();
/// assert_eq!(deps.ports().len(), 2);
/// ```
#[macro_export]
macro_rules! needs {
	($($port:expr),+ $(,)?) => {
		$crate::Needs::new([$($port),+])
	};
}

/// Declares a [`Needs`] set as a typed interface.
///
/// Each stub names a required port and the parameters its provider is
/// expected to take; the stubs become signature templates used when a
/// composite compares multiple requirers of one port.
///
/// ```
/// # use patchbay::needs_interface;
/// let deps = needs_interface! {
/// 	/// Store one order record.
/// 	fn store_order(order_id, record);
/// 	fn get_time();
/// }
/// .unwrap();
/// assert!(deps.template("store_order").is_some());
/// ```
#[macro_export]
macro_rules! needs_interface {
	($($(#[$meta:meta])* fn $name:ident($($param:ident),* $(,)?);)+) => {
		$crate::Needs::interface([
			$($crate::NeedStub::new(stringify!($name), &[$(stringify!($param)),*])),+
		])
	};
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keeps_declaration_order() {
		let needs = Needs::new(["zeta", "alpha", "mid"]).unwrap();
		let names: Vec<&str> = needs.ports().iter().map(|n| n.as_str()).collect();
		assert_eq!(names, ["zeta", "alpha", "mid"]);
		assert!(needs.contains("alpha"));
		assert!(!needs.contains("omega"));
	}

	#[test]
	fn rejects_duplicates() {
		let err = Needs::new(["again", "again"]).expect_err("duplicate");
		assert!(matches!(err, WireError::DuplicatePort(name) if name == "again"));
	}

	#[test]
	fn rejects_invalid_names() {
		assert!(matches!(
			Needs::new(["MixedUp"]),
			Err(WireError::InvalidPortName { .. })
		));
	}

	#[test]
	fn plain_needs_have_no_templates() {
		let needs = needs!("lookup").unwrap();
		assert!(needs.template("lookup").is_none());
	}

	#[test]
	fn interface_stubs_become_templates() {
		let needs = needs_interface! {
			/// Fetch an order by id.
			fn get_order(order_id);
			fn get_time();
		}
		.unwrap();

		assert_eq!(
			needs.template("get_order"),
			Some(&NeedSig::new(["order_id"]))
		);
		assert_eq!(needs.template("get_time"), Some(&NeedSig::new::<_, String>([])));
		assert_eq!(needs.template("get_order").unwrap().to_string(), "(order_id)");
	}

	#[test]
	fn interface_rejects_duplicate_parameters() {
		let err = Needs::interface([NeedStub::new("store", &["key", "key"])]).expect_err("dup param");
		assert!(matches!(err, WireError::NeedsInterfaceDefinition(_)));
	}

	#[test]
	fn interface_rejects_duplicate_ports() {
		let err = needs_interface! {
			fn store(key);
			fn store(other);
		}
		.expect_err("dup port");
		assert!(matches!(err, WireError::DuplicatePort(name) if name == "store"));
	}
}
