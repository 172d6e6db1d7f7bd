//! Object catalog listing.

#![allow(clippy::print_literal)] // Table headers use literal strings intentionally

use clap::Args;
use ondule_objects::{ObjectCategory, ObjectRegistry};

#[derive(Args)]
pub struct ObjectsArgs {
    /// Show details for a specific object kind
    #[arg(value_name = "KIND")]
    kind: Option<String>,
}

const CATEGORIES: [ObjectCategory; 4] = [
    ObjectCategory::Source,
    ObjectCategory::Math,
    ObjectCategory::Mixing,
    ObjectCategory::Measurement,
];

pub fn run(args: ObjectsArgs) -> anyhow::Result<()> {
    let registry = ObjectRegistry::new();

    if let Some(kind) = &args.kind {
        let desc = registry
            .all()
            .into_iter()
            .find(|d| d.id.eq_ignore_ascii_case(kind))
            .ok_or_else(|| anyhow::anyhow!("Unknown object kind: {}", kind))?;

        println!("{} ({})", desc.name, desc.id);
        println!("{}", "=".repeat(desc.name.len() + desc.id.len() + 3));
        println!();
        println!("{}", desc.description);
        println!();
        println!("  {:12}  {}", "Inlets", list(desc.inlets));
        println!("  {:12}  {}", "Outlets", list(desc.outlets));
        println!("  {:12}  {}", "Parameters", list(desc.parameters));
        println!();
        println!("Patch entry:");
        println!();
        println!("  [[objects]]");
        println!("  id = \"my_{}\"", desc.id);
        println!("  kind = \"{}\"", desc.id);
        if let Some(param) = desc.parameters.first() {
            println!("  [objects.params]");
            println!("  {param} = 0.5");
        }
        return Ok(());
    }

    println!("Available Objects");
    println!("=================");
    for category in CATEGORIES {
        let descs = registry.in_category(category);
        if descs.is_empty() {
            continue;
        }
        println!();
        println!("{}:", category.name());
        for desc in descs {
            println!("  {:10} - {}", desc.id, desc.description);
        }
    }
    println!();
    println!("Use 'ondule objects <kind>' for ports and parameters.");

    Ok(())
}

fn list(names: &[&str]) -> String {
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}
