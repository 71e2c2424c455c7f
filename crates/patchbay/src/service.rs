//! Leaf components.
//!
//! A service definition names its requirements ([`Needs`]) and a set of
//! ops exposed as provided ports. [`ServiceDefBuilder::build`] validates
//! the whole declaration up front: port names, duplicate providers, and —
//! through `patchbay-depscan` — that every op body references only
//! declared needs and that every declared need is referenced somewhere.
//! A definition that fails validation is never produced.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::component::{AssignedProviders, Component, ComponentDef, Deps, Discoverable, assign_provider};
use crate::error::{Result, WireError};
use crate::name::PortName;
use crate::needs::{NeedSig, Needs};
use crate::ports::{PortArray, PortFn, PortSlots};

/// The flag key carrying a port's rename. Stripped when a domain
/// re-exposes the port.
pub const WITH_NAME_FLAG: &str = "with_name";

/// The handler shape every op compiles to.
///
/// A plain function pointer rather than a closure: op bodies cannot
/// capture state, so a service instance's only mutable state is its port
/// array.
pub type OpHandler = fn(&Deps, Value) -> Result<Value>;

/// One provided operation of a service, as produced by [`op!`](crate::op).
pub struct Op {
	name: String,
	deps_ident: String,
	handler: OpHandler,
	body: String,
	doc: Option<String>,
	flags: BTreeMap<String, Value>,
}

impl Op {
	/// Wraps a handler together with its captured body source.
	///
	/// Normally called through [`op!`](crate::op), which pins `deps_ident`
	/// and `body` to the handler's actual source.
	pub fn new(name: &str, deps_ident: &str, handler: OpHandler, body: &str) -> Self {
		Self {
			name: name.to_string(),
			deps_ident: deps_ident.to_string(),
			handler,
			body: body.to_string(),
			doc: None,
			flags: BTreeMap::new(),
		}
	}

	/// Exposes the op under a different port name than its intrinsic one.
	/// Recorded as the `with_name` flag.
	pub fn with_rename(mut self, port: &str) -> Self {
		self.flags.insert(WITH_NAME_FLAG.to_string(), Value::String(port.to_string()));
		self
	}

	/// Attaches a doc line, inherited when a domain re-exposes the port.
	pub fn with_doc(mut self, doc: &str) -> Self {
		self.doc = Some(doc.to_string());
		self
	}

	/// Attaches an arbitrary metadata flag.
	pub fn with_flag(mut self, key: impl Into<String>, value: Value) -> Self {
		self.flags.insert(key.into(), value);
		self
	}

	fn port_name(&self) -> &str {
		self.flags
			.get(WITH_NAME_FLAG)
			.and_then(Value::as_str)
			.unwrap_or(&self.name)
	}
}

/// Accumulates a service declaration for validation.
pub struct ServiceDefBuilder {
	name: String,
	needs: Needs,
	ops: Vec<Op>,
}

impl ServiceDefBuilder {
	/// Declares the service's required ports.
	pub fn needs(mut self, needs: Needs) -> Self {
		self.needs = needs;
		self
	}

	/// Adds one provided op.
	pub fn provide(mut self, op: Op) -> Self {
		self.ops.push(op);
		self
	}

	/// Validates the declaration and produces the definition.
	pub fn build(self) -> Result<Arc<ServiceDef>> {
		for op in &self.ops {
			if op.deps_ident != "deps" {
				return Err(WireError::ServiceDefinition(format!(
					"{}.{}: the requirement parameter must be named \"deps\", not \"{}\"",
					self.name, op.name, op.deps_ident
				)));
			}
		}

		let mut providers: IndexMap<PortName, Op> = IndexMap::new();
		for op in self.ops {
			let port = PortName::new(op.port_name())?;
			if let Some(existing) = providers.get(&port) {
				return Err(WireError::DuplicateProviders {
					port: port.to_string(),
					first: format!("{}.{}", self.name, existing.name),
					second: format!("{}.{}", self.name, op.name),
				});
			}
			providers.insert(port, op);
		}

		let declared: BTreeSet<&str> = self.needs.ports().iter().map(PortName::as_str).collect();
		let mut used: BTreeSet<String> = BTreeSet::new();
		for op in providers.values() {
			let referenced = patchbay_depscan::deps_called(&op.body)?;
			let undeclared: Vec<String> = referenced
				.iter()
				.filter(|name| !declared.contains(name.as_str()))
				.cloned()
				.collect();
			if !undeclared.is_empty() {
				return Err(WireError::UnknownPorts {
					op: format!("{}.{}", self.name, op.name),
					ports: undeclared,
				});
			}
			used.extend(referenced);
		}
		let unused: Vec<String> = declared
			.iter()
			.filter(|name| !used.contains(**name))
			.map(ToString::to_string)
			.collect();
		if !unused.is_empty() {
			return Err(WireError::UnusedPorts {
				service: self.name,
				ports: unused,
			});
		}

		let deps_template = PortArray::new();
		for port in self.needs.ports() {
			deps_template.add_port(port.as_str())?;
		}

		Ok(Arc::new(ServiceDef {
			name: self.name,
			needs: self.needs,
			providers,
			deps_template,
		}))
	}
}

/// A validated leaf-component definition.
pub struct ServiceDef {
	name: String,
	needs: Needs,
	providers: IndexMap<PortName, Op>,
	deps_template: PortArray,
}

impl std::fmt::Debug for ServiceDef {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ServiceDef")
			.field("name", &self.name)
			.field("needs", &self.needs)
			.field("providers", &self.providers.keys().collect::<Vec<_>>())
			.finish_non_exhaustive()
	}
}

impl ServiceDef {
	/// Starts a declaration for a service named `name`.
	pub fn builder(name: impl Into<String>) -> ServiceDefBuilder {
		ServiceDefBuilder {
			name: name.into(),
			needs: Needs::none(),
			ops: Vec::new(),
		}
	}

	fn op(&self, port: &str) -> Result<&Op> {
		self.providers
			.get(port)
			.ok_or_else(|| WireError::UnknownPort(port.to_string()))
	}
}

impl Discoverable for ServiceDef {
	fn label(&self) -> &str {
		&self.name
	}

	fn needs(&self) -> Vec<PortName> {
		self.needs.ports().to_vec()
	}

	fn provides(&self) -> Vec<PortName> {
		self.providers.keys().cloned().collect()
	}
}

impl ComponentDef for ServiceDef {
	fn provider_flags(&self, port: &str) -> Result<BTreeMap<String, Value>> {
		Ok(self.op(port)?.flags.clone())
	}

	fn provider_flag(&self, port: &str, key: &str) -> Result<Option<Value>> {
		Ok(self.op(port)?.flags.get(key).cloned())
	}

	fn provider_doc(&self, port: &str) -> Result<Option<String>> {
		Ok(self.op(port)?.doc.clone())
	}

	fn need_template(&self, port: &str) -> Option<NeedSig> {
		self.needs.template(port).cloned()
	}

	fn instantiate(self: Arc<Self>) -> Result<Arc<dyn Component>> {
		let deps = Arc::new(self.deps_template.replicate());
		Ok(Arc::new(Service {
			def: self,
			deps,
			assigned: AssignedProviders::default(),
		}))
	}
}

/// A live leaf-component instance: the shared definition plus this
/// instance's own connection state.
pub struct Service {
	def: Arc<ServiceDef>,
	deps: Arc<PortArray>,
	assigned: AssignedProviders,
}

impl Discoverable for Service {
	fn label(&self) -> &str {
		&self.def.name
	}

	fn needs(&self) -> Vec<PortName> {
		Discoverable::needs(self.def.as_ref())
	}

	fn provides(&self) -> Vec<PortName> {
		Discoverable::provides(self.def.as_ref())
	}
}

impl Component for Service {
	fn provider_func(&self, port: &str) -> Result<PortFn> {
		let handler = self.def.op(port)?.handler;
		let deps = self.deps.clone();
		Ok(Arc::new(move |args| handler(&Deps::new(deps.clone()), args)))
	}

	fn provider_flags(&self, port: &str) -> Result<BTreeMap<String, Value>> {
		self.def.provider_flags(port)
	}

	fn provider_flag(&self, port: &str, key: &str) -> Result<Option<Value>> {
		self.def.provider_flag(port, key)
	}

	fn deps_slots(&self) -> Option<Arc<dyn PortSlots>> {
		Some(self.deps.clone())
	}

	fn set_provider(&self, port: &str, provider: &dyn Component) -> Result<()> {
		assign_provider(&self.assigned, self.deps.as_ref(), port, provider)
	}

	fn call(&self, port: &str, args: Value) -> Result<Value> {
		let handler = self.def.op(port)?.handler;
		handler(&Deps::new(self.deps.clone()), args)
	}
}

/// Declares one provided op of a service.
///
/// The short form tags the op with its intrinsic name:
///
/// ```
/// # use patchbay::op;
/// # use serde_json::json;
/// let greet = op!(greet, |deps, args| { Ok(json!("hello")) });
/// ```
///
/// The long form renames the exposed port and attaches metadata:
///
/// ```
/// # use patchbay::op;
/// # use serde_json::json;
/// let fetch = op!(fetch_impl, {
/// 	name: "fetch",
/// 	doc: "Fetch one record.",
/// 	flags: { "cacheable" => json!(true) },
/// }, |deps, args| { Ok(args) });
/// ```
///
/// The body is captured as source text for static usage analysis; the
/// requirement parameter must be the literal identifier `deps`, which
/// [`ServiceDefBuilder::build`] enforces.
#[macro_export]
macro_rules! op {
	($name:ident, |$deps:ident, $args:ident| $body:block) => {
		$crate::op!($name, {}, |$deps, $args| $body)
	};
	($name:ident, {
		$(name: $rename:expr,)?
		$(doc: $doc:expr,)?
		$(flags: { $($key:expr => $value:expr),* $(,)? },)?
	}, |$deps:ident, $args:ident| $body:block) => {{
		#[allow(unused_variables)]
		fn __op_handler($deps: &$crate::Deps, $args: $crate::Value) -> $crate::Result<$crate::Value> $body
		$crate::Op::new(stringify!($name), stringify!($deps), __op_handler, stringify!($body))
			$(.with_rename($rename))?
			$(.with_doc($doc))?
			$($(.with_flag($key, $value))*)?
	}};
}
