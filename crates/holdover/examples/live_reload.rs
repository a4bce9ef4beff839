//! Walkthrough of class data surviving an in-place class redefinition.
//!
//! Registers a small hierarchy, overrides an attribute in a subclass,
//! then replaces the base class wholesale and shows the stored values
//! coming back through lazily recreated accessors.
//!
//! Run with:
//!   cargo run --example live_reload

use holdover::{ClassDef, FallbackOutcome, Runtime, RuntimeResult, Value};

fn suggest(
    _rt: &mut Runtime,
    receiver: &str,
    name: &str,
    _args: &[Value],
) -> RuntimeResult<FallbackOutcome> {
    println!("  (no '{name}' on {receiver}; fallback answers instead)");
    Ok(FallbackOutcome::Handled(Value::Null))
}

fn main() -> RuntimeResult<()> {
    let mut rt = Runtime::new();

    // A base class with two class-data attributes and a subclass that
    // inherits both.
    rt.register(
        ClassDef::new("Stuff")
            .class_data("DataFile", Some(Value::from("/etc/stuff/data")))
            .class_data("retries", Some(Value::Int(3))),
    )?;
    rt.register(ClassDef::new("CachedStuff").parent("Stuff"))?;

    println!("freshly registered:");
    println!("  Stuff.DataFile       = {}", rt.call("Stuff", "DataFile", &[])?);
    println!("  CachedStuff.DataFile = {}", rt.call("CachedStuff", "DataFile", &[])?);

    // Writing through the subclass gives it its own slot; the base keeps
    // its value.
    rt.call("CachedStuff", "DataFile", &[Value::from("/var/cache/stuff")])?;
    println!("after subclass override:");
    println!("  Stuff.DataFile       = {}", rt.call("Stuff", "DataFile", &[])?);
    println!("  CachedStuff.DataFile = {}", rt.call("CachedStuff", "DataFile", &[])?);
    println!(
        "  owner of CachedStuff.DataFile: {:?}",
        rt.find_owner("CachedStuff", "DataFile")?
    );

    // Replace the base class in place, as a hot reload would. The new
    // class object starts with an empty method table.
    rt.set_trace(true);
    rt.register(ClassDef::new("Stuff").missing_method(suggest))?;
    let wiped = rt.class("Stuff").map(|c| c.methods.len()).unwrap_or(0);
    println!("after reload, Stuff has {wiped} method entries");

    // The values survived in the side table. The first call through each
    // accessor name rebuilds the method entry (trace lines show it).
    println!("reads after reload:");
    println!("  Stuff.DataFile       = {}", rt.call("Stuff", "DataFile", &[])?);
    println!("  Stuff.retries        = {}", rt.call("Stuff", "retries", &[])?);
    println!("  CachedStuff.DataFile = {}", rt.call("CachedStuff", "DataFile", &[])?);
    rt.set_trace(false);

    // Names the store cannot vouch for fall through to the handler the
    // reloaded class installed.
    rt.call("Stuff", "totally_unknown", &[])?;

    println!(
        "attributes visible from CachedStuff: {:?}",
        rt.attribute_names("CachedStuff")?
    );
    Ok(())
}
