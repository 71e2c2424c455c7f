//! Composite assembly, re-export, and shadow-port behavior.

use std::sync::Arc;

use patchbay::{
	Component, ComponentDef, Discoverable, DomainDef, ServiceDef, WITH_NAME_FLAG, WireError,
	func_as_provider, needs, op, wire_strict,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn dog() -> Arc<ServiceDef> {
	ServiceDef::builder("Dog")
		.provide(op!(bark, |deps, args| { Ok(json!("woof")) }))
		.build()
		.unwrap()
}

fn cat() -> Arc<ServiceDef> {
	ServiceDef::builder("Cat")
		.provide(op!(meow, {
			doc: "Repeat a polite refusal.",
			flags: { "volume" => json!(11) },
		}, |deps, args| {
			let count = args.as_u64().unwrap_or(0) as usize;
			Ok(json!(vec!["nope"; count].join(" ")))
		}))
		.provide(op!(stroke, |deps, args| { Ok(json!("HISS!")) }))
		.build()
		.unwrap()
}

fn groomer() -> Arc<ServiceDef> {
	ServiceDef::builder("Groomer")
		.needs(needs!("stroke").unwrap())
		.provide(op!(groom, |deps, args| { deps.call("stroke", args) }))
		.build()
		.unwrap()
}

#[test]
fn re_exports_only_the_listed_ports() {
	let zoo = DomainDef::builder("Zoo")
		.children([dog() as Arc<dyn ComponentDef>, cat() as Arc<dyn ComponentDef>])
		.provides(["bark", "meow"])
		.build()
		.unwrap();

	let instance = zoo.instantiate().unwrap();
	assert_eq!(instance.call("bark", json!(null)).unwrap(), json!("woof"));
	assert_eq!(instance.call("meow", json!(3)).unwrap(), json!("nope nope nope"));

	// stroke is provided by Cat but not re-exported.
	assert!(matches!(
		instance.call("stroke", json!(null)),
		Err(WireError::UnknownPort(port)) if port == "stroke"
	));
	assert!(matches!(
		instance.provider_func("stroke"),
		Err(WireError::UnknownPort(_))
	));
}

#[test]
fn hidden_ports_remain_usable_inside_the_domain() {
	let zoo = DomainDef::builder("Zoo")
		.children([
			dog() as Arc<dyn ComponentDef>,
			cat() as Arc<dyn ComponentDef>,
			groomer() as Arc<dyn ComponentDef>,
		])
		.provides(["bark", "meow", "groom"])
		.build()
		.unwrap();

	let instance = zoo.instantiate().unwrap();
	// groom consumes Cat's stroke through internal wiring even though
	// stroke is invisible from outside.
	assert_eq!(instance.call("groom", json!(null)).unwrap(), json!("HISS!"));
	assert!(instance.needs().is_empty());
}

#[test]
fn flags_are_inherited_minus_the_rename_flag() {
	let renamer = ServiceDef::builder("Renamer")
		.provide(op!(hidden_impl, {
			name: "shout",
			doc: "Shout the payload back.",
			flags: { "audited" => json!(true) },
		}, |deps, args| { Ok(args) }))
		.build()
		.unwrap();

	// The leaf carries the rename flag itself.
	assert_eq!(
		renamer.provider_flag("shout", WITH_NAME_FLAG).unwrap(),
		Some(json!("shout"))
	);

	let wrapper = DomainDef::builder("Wrapper")
		.child(renamer as Arc<dyn ComponentDef>)
		.provides(["shout"])
		.build()
		.unwrap();

	// The re-export inherits everything except the rename flag.
	assert_eq!(wrapper.provider_flag("shout", "audited").unwrap(), Some(json!(true)));
	assert_eq!(wrapper.provider_flag("shout", WITH_NAME_FLAG).unwrap(), None);
	assert_eq!(
		wrapper.provider_doc("shout").unwrap().as_deref(),
		Some("Shout the payload back.")
	);

	let instance = wrapper.instantiate().unwrap();
	assert_eq!(instance.provider_flag("shout", "audited").unwrap(), Some(json!(true)));
	assert_eq!(instance.provider_flag("shout", WITH_NAME_FLAG).unwrap(), None);
	assert_eq!(instance.call("shout", json!("hey")).unwrap(), json!("hey"));
}

#[test]
fn domains_nest() {
	let pets = DomainDef::builder("Pets")
		.children([dog() as Arc<dyn ComponentDef>, cat() as Arc<dyn ComponentDef>])
		.provides(["bark", "meow"])
		.build()
		.unwrap();
	let house = DomainDef::builder("House")
		.child(pets as Arc<dyn ComponentDef>)
		.provides(["bark"])
		.build()
		.unwrap();

	let instance = house.instantiate().unwrap();
	assert_eq!(instance.call("bark", json!(null)).unwrap(), json!("woof"));
	// meow was not re-exported by the outer domain.
	assert!(matches!(
		instance.call("meow", json!(1)),
		Err(WireError::UnknownPort(_))
	));
}

#[test]
fn nested_domains_bubble_unresolved_needs_upward() {
	let inner = DomainDef::builder("Inner")
		.child(groomer() as Arc<dyn ComponentDef>)
		.provides(["groom"])
		.build()
		.unwrap();
	let outer = DomainDef::builder("Outer")
		.child(inner as Arc<dyn ComponentDef>)
		.provides(["groom"])
		.build()
		.unwrap();

	let needs = Discoverable::needs(outer.as_ref());
	let names: Vec<&str> = needs.iter().map(|n| n.as_str()).collect();
	assert_eq!(names, ["stroke"]);

	let instance = outer.instantiate().unwrap();
	let hand: Arc<dyn Component> = func_as_provider("stroke", |_| Ok(json!("purr"))).unwrap();
	wire_strict(&[instance.clone(), hand]).unwrap();
	assert_eq!(instance.call("groom", json!(null)).unwrap(), json!("purr"));
}

#[test]
fn one_external_provider_satisfies_every_requiring_child() {
	let stamper = |name: &str, op_name: &'static str| {
		let builder = ServiceDef::builder(name).needs(needs!("clock").unwrap());
		match op_name {
			"stamp_a" => builder.provide(op!(stamp_a, |deps, args| { deps.call("clock", args) })),
			_ => builder.provide(op!(stamp_b, |deps, args| { deps.call("clock", args) })),
		}
		.build()
		.unwrap()
	};
	let first = stamper("First", "stamp_a");
	let second = stamper("Second", "stamp_b");

	let office = DomainDef::builder("Office")
		.children([first as Arc<dyn ComponentDef>, second as Arc<dyn ComponentDef>])
		.provides(["stamp_a", "stamp_b"])
		.build()
		.unwrap();

	let needs = Discoverable::needs(office.as_ref());
	let names: Vec<&str> = needs.iter().map(|n| n.as_str()).collect();
	assert_eq!(names, ["clock"]);

	let instance = office.instantiate().unwrap();
	let clock: Arc<dyn Component> = func_as_provider("clock", |_| Ok(json!("09:00"))).unwrap();
	// One connection on the domain broadcasts to both children.
	instance.set_provider("clock", clock.as_ref()).unwrap();

	assert_eq!(instance.call("stamp_a", json!(null)).unwrap(), json!("09:00"));
	assert_eq!(instance.call("stamp_b", json!(null)).unwrap(), json!("09:00"));

	// The domain accepts exactly one provider per need.
	let other: Arc<dyn Component> = func_as_provider("clock", |_| Ok(json!("10:00"))).unwrap();
	assert!(matches!(
		instance.set_provider("clock", other.as_ref()),
		Err(WireError::DuplicateProviders { port, .. }) if port == "clock"
	));
}

#[test]
fn a_providing_child_listed_twice_is_a_duplicate_provider() {
	let shared = dog();
	let err = DomainDef::builder("EchoZoo")
		.child(shared.clone() as Arc<dyn ComponentDef>)
		.child(shared as Arc<dyn ComponentDef>)
		.provides(["bark"])
		.build()
		.expect_err("same def offers bark twice");
	assert!(matches!(err, WireError::DuplicateProviders { port, .. } if port == "bark"));
}

#[test]
fn a_provides_free_child_listed_twice_collapses_to_one_instance() {
	let bystander = ServiceDef::builder("Bystander").build().unwrap();
	let quiet = DomainDef::builder("Quiet")
		.child(bystander.clone() as Arc<dyn ComponentDef>)
		.child(bystander as Arc<dyn ComponentDef>)
		.build()
		.unwrap();

	let instance = quiet.instantiate().unwrap();
	assert!(instance.provides().is_empty());
	assert!(instance.needs().is_empty());
}
