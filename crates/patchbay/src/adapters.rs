//! Bridges from plain functions and objects to the provider contract.
//!
//! Adapters carry no needs and no connection state, so one value serves as
//! both its own definition and its own instance: `instantiate` hands the
//! same `Arc` back, and the adapter can sit in a [`wire`](crate::wire)
//! call or inside a domain's child list alike.

use std::collections::BTreeMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::component::{Component, ComponentDef, Discoverable};
use crate::error::{Result, WireError};
use crate::name::PortName;
use crate::needs::NeedSig;
use crate::ports::{PortFn, PortSlots};

/// Publishes a single function as a provider of one port.
pub fn func_as_provider<F>(port: &str, func: F) -> Result<Arc<FuncProvider>>
where
	F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
{
	let port = PortName::new(port)?;
	Ok(Arc::new(FuncProvider {
		label: format!("func<{port}>"),
		port,
		func: Arc::new(func),
	}))
}

/// A resolvable collection of named callables, adapted by
/// [`object_as_provider`].
pub trait MethodSource {
	/// A human-readable identifier, used in error messages.
	fn label(&self) -> &str;

	/// The callable published under `name`, if the source has one.
	fn method(&self, name: &str) -> Option<PortFn>;
}

/// Publishes some of an object's methods as provided ports.
///
/// Every listed port is resolved eagerly; a name the source cannot supply
/// fails [`WireError::AttributeMissing`] right here rather than at first
/// call.
pub fn object_as_provider<S: MethodSource>(source: &S, ports: &[&str]) -> Result<Arc<ObjectProvider>> {
	let label = source.label().to_string();
	let mut funcs: IndexMap<PortName, PortFn> = IndexMap::new();
	for port in ports {
		let name = PortName::new(*port)?;
		if funcs.contains_key(&name) {
			return Err(WireError::DuplicatePort(name.to_string()));
		}
		let func = source.method(name.as_str()).ok_or_else(|| WireError::AttributeMissing {
			object: label.clone(),
			name: name.to_string(),
		})?;
		funcs.insert(name, func);
	}
	Ok(Arc::new(ObjectProvider { label, funcs }))
}

/// A single function published under one port name.
pub struct FuncProvider {
	label: String,
	port: PortName,
	func: PortFn,
}

impl FuncProvider {
	fn check_port(&self, port: &str) -> Result<()> {
		if port == self.port.as_str() {
			Ok(())
		} else {
			Err(WireError::UnknownPort(port.to_string()))
		}
	}
}

impl Discoverable for FuncProvider {
	fn label(&self) -> &str {
		&self.label
	}

	fn needs(&self) -> Vec<PortName> {
		Vec::new()
	}

	fn provides(&self) -> Vec<PortName> {
		vec![self.port.clone()]
	}
}

impl ComponentDef for FuncProvider {
	fn provider_flags(&self, port: &str) -> Result<BTreeMap<String, Value>> {
		self.check_port(port)?;
		Ok(BTreeMap::new())
	}

	fn provider_flag(&self, port: &str, _key: &str) -> Result<Option<Value>> {
		self.check_port(port)?;
		Ok(None)
	}

	fn provider_doc(&self, port: &str) -> Result<Option<String>> {
		self.check_port(port)?;
		Ok(None)
	}

	fn need_template(&self, _port: &str) -> Option<NeedSig> {
		None
	}

	fn instantiate(self: Arc<Self>) -> Result<Arc<dyn Component>> {
		Ok(self)
	}
}

impl Component for FuncProvider {
	fn provider_func(&self, port: &str) -> Result<PortFn> {
		self.check_port(port)?;
		Ok(self.func.clone())
	}

	fn provider_flags(&self, port: &str) -> Result<BTreeMap<String, Value>> {
		ComponentDef::provider_flags(self, port)
	}

	fn provider_flag(&self, port: &str, key: &str) -> Result<Option<Value>> {
		ComponentDef::provider_flag(self, port, key)
	}

	fn deps_slots(&self) -> Option<Arc<dyn PortSlots>> {
		None
	}

	fn set_provider(&self, port: &str, _provider: &dyn Component) -> Result<()> {
		Err(WireError::UnknownPort(port.to_string()))
	}

	fn call(&self, port: &str, args: Value) -> Result<Value> {
		self.check_port(port)?;
		(self.func)(args)
	}
}

/// An object's methods published as provided ports.
pub struct ObjectProvider {
	label: String,
	funcs: IndexMap<PortName, PortFn>,
}

impl std::fmt::Debug for ObjectProvider {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ObjectProvider")
			.field("label", &self.label)
			.field("funcs", &self.funcs.keys().collect::<Vec<_>>())
			.finish()
	}
}

impl ObjectProvider {
	fn func(&self, port: &str) -> Result<&PortFn> {
		self.funcs
			.get(port)
			.ok_or_else(|| WireError::UnknownPort(port.to_string()))
	}
}

impl Discoverable for ObjectProvider {
	fn label(&self) -> &str {
		&self.label
	}

	fn needs(&self) -> Vec<PortName> {
		Vec::new()
	}

	fn provides(&self) -> Vec<PortName> {
		let mut ports: Vec<PortName> = self.funcs.keys().cloned().collect();
		ports.sort();
		ports
	}
}

impl ComponentDef for ObjectProvider {
	fn provider_flags(&self, port: &str) -> Result<BTreeMap<String, Value>> {
		self.func(port)?;
		Ok(BTreeMap::new())
	}

	fn provider_flag(&self, port: &str, _key: &str) -> Result<Option<Value>> {
		self.func(port)?;
		Ok(None)
	}

	fn provider_doc(&self, port: &str) -> Result<Option<String>> {
		self.func(port)?;
		Ok(None)
	}

	fn need_template(&self, _port: &str) -> Option<NeedSig> {
		None
	}

	fn instantiate(self: Arc<Self>) -> Result<Arc<dyn Component>> {
		Ok(self)
	}
}

impl Component for ObjectProvider {
	fn provider_func(&self, port: &str) -> Result<PortFn> {
		Ok(self.func(port)?.clone())
	}

	fn provider_flags(&self, port: &str) -> Result<BTreeMap<String, Value>> {
		ComponentDef::provider_flags(self, port)
	}

	fn provider_flag(&self, port: &str, key: &str) -> Result<Option<Value>> {
		ComponentDef::provider_flag(self, port, key)
	}

	fn deps_slots(&self) -> Option<Arc<dyn PortSlots>> {
		None
	}

	fn set_provider(&self, port: &str, _provider: &dyn Component) -> Result<()> {
		Err(WireError::UnknownPort(port.to_string()))
	}

	fn call(&self, port: &str, args: Value) -> Result<Value> {
		(self.func(port)?)(args)
	}
}
