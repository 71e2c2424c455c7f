//! Composite components.
//!
//! A domain aggregates child component definitions, auto-wires them
//! internally, and re-exposes a chosen subset of their provided ports as
//! its own. Whatever the children require and no sibling provides becomes
//! the domain's own requirement set, fronted by a single
//! [`ShadowPortArray`] so one external provider can satisfy every child
//! that declared the name.

use std::collections::BTreeMap;
use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::component::{
	AssignedProviders, Component, ComponentDef, Discoverable, assign_provider, same_component,
};
use crate::discovery::AutoDiscovery;
use crate::error::{Result, WireError};
use crate::name::PortName;
use crate::needs::NeedSig;
use crate::ports::{PortArray, PortFn, PortSlots};
use crate::service::WITH_NAME_FLAG;
use crate::shadow::ShadowPortArray;
use crate::wiring::wire_connections;

/// Selects a domain's re-exported ports by predicate instead of by
/// explicit list: everything the children provide, optionally filtered by
/// a pattern matched at the start of the name.
pub struct AutoProvide {
	matcher: Option<Regex>,
}

impl AutoProvide {
	/// Re-export every port the children provide.
	pub fn all() -> Self {
		Self { matcher: None }
	}

	/// Re-export the provided ports whose name starts with a match of
	/// `pattern`.
	pub fn matching(pattern: &str) -> Result<Self> {
		let matcher = Regex::new(&format!("^(?:{pattern})"))
			.map_err(|err| WireError::DomainDefinition(format!("invalid provides pattern {pattern:?}: {err}")))?;
		Ok(Self { matcher: Some(matcher) })
	}

	fn filter(&self, ports: Vec<PortName>) -> Vec<PortName> {
		match &self.matcher {
			None => ports,
			Some(matcher) => ports.into_iter().filter(|port| matcher.is_match(port.as_str())).collect(),
		}
	}
}

enum ProvidesSpec {
	Explicit(Vec<String>),
	Auto(AutoProvide),
}

/// Accumulates a domain declaration for validation.
pub struct DomainDefBuilder {
	name: String,
	children: Vec<Arc<dyn ComponentDef>>,
	provides: ProvidesSpec,
}

impl DomainDefBuilder {
	/// Adds one child component definition.
	pub fn child(mut self, child: Arc<dyn ComponentDef>) -> Self {
		self.children.push(child);
		self
	}

	/// Adds several child component definitions.
	pub fn children<I>(mut self, children: I) -> Self
	where
		I: IntoIterator<Item = Arc<dyn ComponentDef>>,
	{
		self.children.extend(children);
		self
	}

	/// Declares the ports this domain re-exposes. Every listed name must
	/// be provided by some child.
	pub fn provides<I, S>(mut self, ports: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.provides = ProvidesSpec::Explicit(ports.into_iter().map(Into::into).collect());
		self
	}

	/// Declares the re-exposed ports by predicate instead of by list.
	pub fn auto_provides(mut self, auto: AutoProvide) -> Self {
		self.provides = ProvidesSpec::Auto(auto);
		self
	}

	/// Runs discovery over the child definitions and produces the
	/// validated domain definition.
	pub fn build(self) -> Result<Arc<DomainDef>> {
		let discovered = AutoDiscovery::over(&self.children)?;

		let exported = match self.provides {
			ProvidesSpec::Auto(auto) => auto.filter(discovered.provides()),
			ProvidesSpec::Explicit(ports) => {
				let provided = discovered.provides();
				let mut exported = Vec::new();
				for port in ports {
					let name = PortName::new(port)?;
					if !provided.contains(&name) {
						return Err(WireError::DomainDefinition(format!(
							"\"{name}\" listed in {}.provides is not provided by any child",
							self.name
						)));
					}
					exported.push(name);
				}
				exported
			}
		};

		let unresolved = discovered.unsatisfied_needs();
		let mut need_templates = BTreeMap::new();
		for port in &unresolved {
			if let Some(template) = representative_template(&discovered, port)? {
				need_templates.insert(port.clone(), template);
			}
		}

		let mut re_exports = IndexMap::new();
		for port in exported {
			let provider = discovered.provider_of(port.as_str())?;
			let mut flags = provider.provider_flags(port.as_str())?;
			flags.remove(WITH_NAME_FLAG);
			let doc = provider.provider_doc(port.as_str())?;
			re_exports.insert(
				port,
				DefExport {
					child: provider,
					flags,
					doc,
				},
			);
		}

		Ok(Arc::new(DomainDef {
			name: self.name,
			children: self.children,
			needs: unresolved,
			need_templates,
			re_exports,
		}))
	}
}

/// Picks one signature template for an unresolved port required by
/// several children.
///
/// Needs declared without an interface are generic and defer to any typed
/// sibling; typed requirers must agree with each other or the whole
/// definition fails.
fn representative_template(
	discovered: &AutoDiscovery<dyn ComponentDef>,
	port: &PortName,
) -> Result<Option<NeedSig>> {
	let mut typed: Vec<(String, NeedSig)> = Vec::new();
	for requirer in discovered.requirers_of(port.as_str()) {
		if let Some(template) = requirer.need_template(port.as_str()) {
			typed.push((requirer.label().to_string(), template));
		}
	}

	let Some(first) = typed.first().map(|(_, template)| template.clone()) else {
		return Ok(None);
	};
	if typed.iter().any(|(_, template)| *template != first) {
		let mut components: Vec<String> = typed.into_iter().map(|(label, _)| label).collect();
		components.sort();
		components.dedup();
		return Err(WireError::InconsistentInterface {
			port: port.to_string(),
			components,
		});
	}
	Ok(Some(first))
}

struct DefExport {
	child: Arc<dyn ComponentDef>,
	flags: BTreeMap<String, Value>,
	doc: Option<String>,
}

/// A validated composite-component definition.
pub struct DomainDef {
	name: String,
	children: Vec<Arc<dyn ComponentDef>>,
	needs: Vec<PortName>,
	need_templates: BTreeMap<PortName, NeedSig>,
	re_exports: IndexMap<PortName, DefExport>,
}

impl std::fmt::Debug for DomainDef {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DomainDef")
			.field("name", &self.name)
			.finish_non_exhaustive()
	}
}

impl DomainDef {
	/// Starts a declaration for a domain named `name`.
	pub fn builder(name: impl Into<String>) -> DomainDefBuilder {
		DomainDefBuilder {
			name: name.into(),
			children: Vec::new(),
			provides: ProvidesSpec::Explicit(Vec::new()),
		}
	}

	fn export(&self, port: &str) -> Result<&DefExport> {
		self.re_exports
			.get(port)
			.ok_or_else(|| WireError::UnknownPort(port.to_string()))
	}
}

impl Discoverable for DomainDef {
	fn label(&self) -> &str {
		&self.name
	}

	fn needs(&self) -> Vec<PortName> {
		self.needs.clone()
	}

	fn provides(&self) -> Vec<PortName> {
		self.re_exports.keys().cloned().collect()
	}
}

impl ComponentDef for DomainDef {
	fn provider_flags(&self, port: &str) -> Result<BTreeMap<String, Value>> {
		Ok(self.export(port)?.flags.clone())
	}

	fn provider_flag(&self, port: &str, key: &str) -> Result<Option<Value>> {
		Ok(self.export(port)?.flags.get(key).cloned())
	}

	fn provider_doc(&self, port: &str) -> Result<Option<String>> {
		Ok(self.export(port)?.doc.clone())
	}

	fn need_template(&self, port: &str) -> Option<NeedSig> {
		self.need_templates.get(port).cloned()
	}

	fn instantiate(self: Arc<Self>) -> Result<Arc<dyn Component>> {
		let instance = Domain::assemble(self)?;
		Ok(instance)
	}
}

struct InstanceExport {
	child: Arc<dyn Component>,
	flags: BTreeMap<String, Value>,
}

/// A live composite instance: one instance per distinct child definition,
/// internally wired, with leftover child needs fronted by a shadow array.
pub struct Domain {
	def: Arc<DomainDef>,
	exports: PortArray,
	export_meta: IndexMap<PortName, InstanceExport>,
	shadow: Arc<ShadowPortArray>,
	assigned: AssignedProviders,
}

impl Domain {
	fn assemble(def: Arc<DomainDef>) -> Result<Arc<Self>> {
		// One instance per distinct child def. A def listed twice shares
		// its instance across both listings.
		let mut instances: Vec<(Arc<dyn ComponentDef>, Arc<dyn Component>)> = Vec::new();
		for child in &def.children {
			if instances.iter().any(|(existing, _)| same_component(existing, child)) {
				warn!(
					domain = %def.name,
					child = child.label(),
					"child definition listed more than once; sharing one instance"
				);
				continue;
			}
			let instance = child.clone().instantiate()?;
			instances.push((child.clone(), instance));
		}

		let exports = PortArray::new();
		let mut export_meta = IndexMap::new();
		for (port, export) in &def.re_exports {
			let Some((_, child)) = instances.iter().find(|(child_def, _)| same_component(child_def, &export.child))
			else {
				return Err(WireError::DomainDefinition(format!(
					"{}: no child instance provides \"{port}\"",
					def.name
				)));
			};
			exports.add_port(port.as_str())?;
			exports.connect_port(port.as_str(), child.provider_func(port.as_str())?)?;

			let mut flags = child.provider_flags(port.as_str())?;
			flags.remove(WITH_NAME_FLAG);
			export_meta.insert(
				port.clone(),
				InstanceExport {
					child: child.clone(),
					flags,
				},
			);
		}

		let components: Vec<Arc<dyn Component>> = instances.into_iter().map(|(_, instance)| instance).collect();
		let discovered = AutoDiscovery::over(&components)?;
		let fronted: Vec<Arc<dyn PortSlots>> = components.iter().filter_map(|c| c.deps_slots()).collect();
		let shadow = Arc::new(ShadowPortArray::new(fronted, &discovered.satisfied_needs()));
		wire_connections(&discovered)?;

		Ok(Arc::new(Self {
			def,
			exports,
			export_meta,
			shadow,
			assigned: AssignedProviders::default(),
		}))
	}

	fn export(&self, port: &str) -> Result<&InstanceExport> {
		self.export_meta
			.get(port)
			.ok_or_else(|| WireError::UnknownPort(port.to_string()))
	}
}

impl Discoverable for Domain {
	fn label(&self) -> &str {
		&self.def.name
	}

	fn needs(&self) -> Vec<PortName> {
		PortSlots::ports(self.shadow.as_ref())
	}

	fn provides(&self) -> Vec<PortName> {
		self.export_meta.keys().cloned().collect()
	}
}

impl Component for Domain {
	fn provider_func(&self, port: &str) -> Result<PortFn> {
		self.export(port)?.child.provider_func(port)
	}

	fn provider_flags(&self, port: &str) -> Result<BTreeMap<String, Value>> {
		Ok(self.export(port)?.flags.clone())
	}

	fn provider_flag(&self, port: &str, key: &str) -> Result<Option<Value>> {
		Ok(self.export(port)?.flags.get(key).cloned())
	}

	fn deps_slots(&self) -> Option<Arc<dyn PortSlots>> {
		Some(self.shadow.clone())
	}

	fn set_provider(&self, port: &str, provider: &dyn Component) -> Result<()> {
		assign_provider(&self.assigned, self.shadow.as_ref(), port, provider)
	}

	fn call(&self, port: &str, args: Value) -> Result<Value> {
		self.exports.invoke(port, args)
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::service::ServiceDef;
	use crate::{needs, needs_interface, op};

	fn provider_def(name: &str, port: &'static str) -> Arc<ServiceDef> {
		ServiceDef::builder(name)
			.provide(op!(answer, { name: port, }, |deps, args| { Ok(args) }))
			.build()
			.unwrap()
	}

	#[test]
	fn explicit_provides_must_come_from_children() {
		let err = DomainDef::builder("Lonely")
			.child(provider_def("P", "real_port"))
			.provides(["imagined"])
			.build()
			.expect_err("not provided by children");
		assert!(matches!(
			err,
			WireError::DomainDefinition(msg) if msg.contains("\"imagined\"")
		));
	}

	#[test]
	fn auto_provide_filters_by_prefix_pattern() {
		let def = DomainDef::builder("Filtered")
			.child(provider_def("G", "get_thing"))
			.child(provider_def("S", "set_thing"))
			.auto_provides(AutoProvide::matching("get_").unwrap())
			.build()
			.unwrap();
		let provides = Discoverable::provides(def.as_ref());
		let names: Vec<&str> = provides.iter().map(|n| n.as_str()).collect();
		assert_eq!(names, ["get_thing"]);
	}

	#[test]
	fn auto_provide_pattern_anchors_at_the_start() {
		let def = DomainDef::builder("Anchored")
			.child(provider_def("T", "thing_get"))
			.auto_provides(AutoProvide::matching("get").unwrap())
			.build()
			.unwrap();
		assert!(Discoverable::provides(def.as_ref()).is_empty());
	}

	#[test]
	fn auto_provide_all_exports_everything() {
		let def = DomainDef::builder("Open")
			.child(provider_def("G", "get_thing"))
			.child(provider_def("S", "set_thing"))
			.auto_provides(AutoProvide::all())
			.build()
			.unwrap();
		assert_eq!(Discoverable::provides(def.as_ref()).len(), 2);
	}

	#[test]
	fn empty_domain_is_legal() {
		let def = DomainDef::builder("Hollow").build().unwrap();
		let instance = def.instantiate().unwrap();
		assert!(instance.needs().is_empty());
		assert!(instance.provides().is_empty());
	}

	#[test]
	fn typed_requirers_must_agree_on_unresolved_interfaces() {
		let one = ServiceDef::builder("One")
			.needs(
				needs_interface! {
					fn shared_dep(key);
				}
				.unwrap(),
			)
			.provide(op!(first, |deps, args| { deps.call("shared_dep", args) }))
			.build()
			.unwrap();
		let other = ServiceDef::builder("Other")
			.needs(
				needs_interface! {
					fn shared_dep(key, extra);
				}
				.unwrap(),
			)
			.provide(op!(second, |deps, args| { deps.call("shared_dep", args) }))
			.build()
			.unwrap();

		let err = DomainDef::builder("Torn")
			.children([one as Arc<dyn ComponentDef>, other as Arc<dyn ComponentDef>])
			.build()
			.expect_err("conflicting templates");
		match err {
			WireError::InconsistentInterface { port, components } => {
				assert_eq!(port, "shared_dep");
				assert_eq!(components, ["One", "Other"]);
			}
			other => panic!("unexpected error: {other}"),
		}
	}

	#[test]
	fn untyped_requirers_defer_to_the_typed_sibling() {
		let typed = ServiceDef::builder("Typed")
			.needs(
				needs_interface! {
					fn shared_dep(key);
				}
				.unwrap(),
			)
			.provide(op!(first, |deps, args| { deps.call("shared_dep", args) }))
			.build()
			.unwrap();
		let untyped = ServiceDef::builder("Untyped")
			.needs(needs!("shared_dep").unwrap())
			.provide(op!(second, |deps, args| { deps.call("shared_dep", args) }))
			.build()
			.unwrap();

		let def = DomainDef::builder("Mixed")
			.children([typed as Arc<dyn ComponentDef>, untyped as Arc<dyn ComponentDef>])
			.build()
			.unwrap();
		assert_eq!(def.need_template("shared_dep"), Some(NeedSig::new(["key"])));
	}

	#[test]
	fn unresolved_child_needs_become_domain_needs() {
		let needy = ServiceDef::builder("Needy")
			.needs(needs!("outside_help").unwrap())
			.provide(op!(work, |deps, args| { deps.call("outside_help", args) }))
			.build()
			.unwrap();
		let def = DomainDef::builder("Wanting")
			.child(needy)
			.provides(["work"])
			.build()
			.unwrap();

		let needs = Discoverable::needs(def.as_ref());
		let names: Vec<&str> = needs.iter().map(|n| n.as_str()).collect();
		assert_eq!(names, ["outside_help"]);
	}

	#[test]
	fn instance_rejects_providers_for_unknown_needs() {
		let def = DomainDef::builder("Empty").build().unwrap();
		let instance = def.instantiate().unwrap();
		let provider = crate::adapters::func_as_provider("anything", Ok).unwrap();
		assert!(matches!(
			instance.set_provider("anything", provider.as_ref()),
			Err(WireError::UnknownPort(_))
		));
	}

	#[test]
	fn domain_call_reaches_the_child_op() {
		let def = DomainDef::builder("Passthrough")
			.child(provider_def("P", "relay"))
			.provides(["relay"])
			.build()
			.unwrap();
		let instance = def.instantiate().unwrap();
		assert_eq!(instance.call("relay", json!({"x": 1})).unwrap(), json!({"x": 1}));
	}
}
