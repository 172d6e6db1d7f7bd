//! Patch validation and execution order report.

use crate::commands::common::{load_patch, object_label};
use clap::Args;
use ondule_objects::ObjectRegistry;

#[derive(Args)]
pub struct CheckArgs {
    /// Patch file (TOML) or factory patch name
    #[arg(value_name = "PATCH")]
    patch: String,
}

pub fn run(args: CheckArgs) -> anyhow::Result<()> {
    let patch = load_patch(&args.patch)?;
    let live = patch.instantiate(&ObjectRegistry::new())?;
    let compiled = live.compilation();

    println!("{}", patch.name);
    println!("{}", "=".repeat(patch.name.len()));
    if let Some(description) = &patch.description {
        println!("{description}");
    }
    println!();

    println!("Execution order:");
    for (i, object) in compiled.order.iter().enumerate() {
        let kind = patch
            .object(object.name())
            .map_or("", |config| config.kind.as_str());
        println!("  {:3}  {:16}  {}", i + 1, object.name(), kind);
    }

    println!();
    if compiled.broken_edges.is_empty() {
        println!("Broken edges: none");
    } else {
        println!("Broken edges (consumer reads the previous frame):");
        for &(producer, consumer) in &compiled.broken_edges {
            println!(
                "  {} -> {}",
                object_label(&live, producer),
                object_label(&live, consumer)
            );
        }
    }

    if compiled.unresolved.is_empty() {
        println!("Unresolved: none");
    } else {
        println!("Unresolved (will not run):");
        for object in &compiled.unresolved {
            println!("  {}", object.name());
        }
    }

    let pooled = live.objects().len() - patch.len();
    if pooled > 0 {
        println!();
        println!("Cached objects: {pooled}");
    }

    println!();
    println!("Patch OK.");
    Ok(())
}
