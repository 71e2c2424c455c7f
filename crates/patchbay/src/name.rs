//! Port name validation.

use std::borrow::Borrow;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, WireError};

static VALID_PORT_NAME: LazyLock<Regex> =
	LazyLock::new(|| Regex::new("^[a-z][A-Za-z0-9_]*$").expect("port name pattern compiles"));

/// Names that collide with the port-management surface itself and are
/// therefore never accepted as port names.
const RESERVED_PORT_NAMES: &[&str] = &[
	"add_port",
	"call",
	"connect_port",
	"deps",
	"disconnect_port",
	"get_needs",
	"get_provider_flag",
	"get_provider_flags",
	"get_provider_func",
	"get_provides",
	"invoke",
	"is_disconnected",
	"meta",
	"ports",
	"replicate",
	"set_provider",
];

/// A validated port name.
///
/// Names start with a lowercase letter, continue with letters, digits or
/// underscores, and avoid the reserved set. Validation happens once, at
/// construction; everything downstream trades in already-valid names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortName(String);

impl PortName {
	/// Validates `name` and wraps it.
	pub fn new(name: impl Into<String>) -> Result<Self> {
		let name = name.into();
		if !VALID_PORT_NAME.is_match(&name) {
			return Err(WireError::InvalidPortName {
				name,
				reason: "must start with a lowercase letter followed by letters, digits or underscores".to_string(),
			});
		}
		if RESERVED_PORT_NAMES.contains(&name.as_str()) {
			return Err(WireError::InvalidPortName {
				name,
				reason: "reserved word".to_string(),
			});
		}
		Ok(Self(name))
	}

	/// The name as a plain string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for PortName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl Borrow<str> for PortName {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl AsRef<str> for PortName {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accepts_well_formed_names() {
		for name in ["a", "ask", "ask_question", "askQuestion", "port9", "x_"] {
			assert!(PortName::new(name).is_ok(), "{name} should be accepted");
		}
	}

	#[test]
	fn rejects_malformed_names() {
		for name in ["", "Ask", "9lives", "_hidden", "with space", "dash-ed", "émile"] {
			let err = PortName::new(name).expect_err("should be rejected");
			assert!(
				matches!(err, WireError::InvalidPortName { name: rejected, .. } if rejected == name),
				"unexpected error for {name:?}"
			);
		}
	}

	#[test]
	fn rejects_reserved_words() {
		for name in ["deps", "call", "ports", "set_provider", "meta"] {
			let err = PortName::new(name).expect_err("reserved word should be rejected");
			match err {
				WireError::InvalidPortName { reason, .. } => assert_eq!(reason, "reserved word"),
				other => panic!("unexpected error: {other}"),
			}
		}
	}

	#[test]
	fn compares_and_borrows_as_str() {
		let name = PortName::new("lookup").unwrap();
		assert_eq!(name.as_str(), "lookup");
		assert_eq!(name.to_string(), "lookup");
	}
}
