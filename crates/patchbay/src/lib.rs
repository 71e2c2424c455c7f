//! A component-wiring engine.
//!
//! Components declare the capabilities they require (needs) and the
//! capabilities they expose (provides) as named ports; a discovery pass
//! matches requirers to providers by name across an arbitrary component
//! collection, and a wiring pass binds each requirer's port slot to the
//! matched provider's callable. Once wired, calls go straight through the
//! bound callable with no engine involvement.
//!
//! Three component kinds share one contract:
//!
//! * [`ServiceDef`] / [`Service`] — leaves: ops declared with [`op!`],
//!   requirements with [`needs!`] or [`needs_interface!`], everything
//!   validated when the definition is built;
//! * [`DomainDef`] / [`Domain`] — composites: children wired internally at
//!   assembly, leftover requirements re-exposed as the composite's own;
//! * [`adapters`] — plain functions and objects lifted into the provider
//!   contract.
//!
//! ```
//! use std::sync::Arc;
//!
//! use patchbay::{Component, ComponentDef, ServiceDef, adapters, needs, op, wire_strict};
//! use serde_json::json;
//!
//! # fn main() -> patchbay::Result<()> {
//! let greeter = ServiceDef::builder("Greeter")
//! 	.needs(needs!("lookup_name")?)
//! 	.provide(op!(greet, |deps, args| {
//! 		let name = deps.call("lookup_name", args)?;
//! 		Ok(json!(format!("hello, {}", name.as_str().unwrap_or("you"))))
//! 	}))
//! 	.build()?
//! 	.instantiate()?;
//!
//! let directory: Arc<dyn Component> =
//! 	adapters::func_as_provider("lookup_name", |_| Ok(json!("ada")))?;
//!
//! wire_strict(&[greeter.clone(), directory])?;
//! assert_eq!(greeter.call("greet", json!(null))?, json!("hello, ada"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod adapters;
mod component;
mod discovery;
mod domain;
mod error;
mod name;
mod needs;
mod ports;
mod service;
mod shadow;
mod wiring;

pub use component::{Component, ComponentDef, Deps, Discoverable};
pub use discovery::{AutoDiscovery, Connection};
pub use domain::{AutoProvide, Domain, DomainDef, DomainDefBuilder};
pub use error::{Result, WireError};
pub use name::PortName;
pub use needs::{NeedSig, NeedStub, Needs};
pub use ports::{PortArray, PortFn, PortSlots};
pub use service::{Op, OpHandler, Service, ServiceDef, ServiceDefBuilder, WITH_NAME_FLAG};
pub use shadow::ShadowPortArray;
pub use wiring::{wire, wire_strict};

pub use adapters::{MethodSource, func_as_provider, object_as_provider};
/// The payload and flag value type used across the engine.
pub use serde_json::Value;
