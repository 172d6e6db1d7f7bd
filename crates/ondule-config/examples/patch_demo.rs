//! Patch demo: build a patch in code, print its TOML, then run it.
//!
//! Run with: cargo run -p ondule-config --example patch_demo

use ondule_config::{
    ObjectConfig, Patch, PortRef, factory_patch_names, get_factory_patch, validate_patch,
};
use ondule_objects::ObjectRegistry;

fn main() {
    // --- Patch creation ---
    println!("=== Patch Creation ===\n");

    let patch = Patch::new("Detuned Pair")
        .with_description("Two sines a few hertz apart")
        .with_object(ObjectConfig::new("a", "sine").with_param("Frequency", 220.0))
        .with_object(ObjectConfig::new("b", "sine").with_param("Frequency", 223.0))
        .with_object(ObjectConfig::new("mix", "mixer"))
        .with_object(ObjectConfig::new("amp", "gain").with_param("Gain", 0.3))
        .with_connection("a.Out -> mix.In1".parse().unwrap())
        .with_connection("b.Out -> mix.In2".parse().unwrap())
        .with_connection("mix.Out -> amp.In".parse().unwrap())
        .with_output(0, PortRef::new("amp", "Out"))
        .with_output(1, PortRef::new("amp", "Out"));

    println!("--- Serialized TOML ---");
    println!("{}", patch.to_toml().unwrap());

    match validate_patch(&patch) {
        Ok(()) => println!("Patch is valid.\n"),
        Err(e) => println!("Patch is invalid: {e}\n"),
    }

    // --- Running ---
    println!("=== Running ===\n");

    let live = patch.instantiate(&ObjectRegistry::new()).unwrap();
    let order: Vec<_> = live
        .compilation()
        .order
        .iter()
        .map(|o| o.name().to_string())
        .collect();
    println!("Execution order: {}", order.join(" -> "));

    let out = live.render(375);
    let peak = out.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    println!("Rendered {} samples, peak {peak:.4}", out.len());

    // --- Factory patches ---
    println!("\n=== Factory Patches ===\n");

    for name in factory_patch_names() {
        let Some(patch) = get_factory_patch(name) else {
            continue;
        };
        println!(
            "  {:<12} - {} ({} objects)",
            name,
            patch.description.as_deref().unwrap_or(""),
            patch.len()
        );
    }

    println!("\nPatch demo complete.");
}
