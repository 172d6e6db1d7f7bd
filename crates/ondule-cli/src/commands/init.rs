//! Writes a starter patch.

use clap::Args;
use ondule_config::{factory_patch_names, get_factory_patch};
use std::path::PathBuf;

#[derive(Args)]
pub struct InitArgs {
    /// Where to write the patch
    #[arg(value_name = "PATH", required_unless_present = "list")]
    path: Option<PathBuf>,

    /// Factory patch to start from
    #[arg(long, default_value = "init")]
    from: String,

    /// Overwrite an existing file
    #[arg(long)]
    force: bool,

    /// List factory patches instead of writing one
    #[arg(long)]
    list: bool,
}

pub fn run(args: InitArgs) -> anyhow::Result<()> {
    if args.list {
        println!("Factory patches:");
        for name in factory_patch_names() {
            if let Some(patch) = get_factory_patch(name) {
                println!(
                    "  {:12} - {}",
                    name,
                    patch.description.as_deref().unwrap_or("")
                );
            }
        }
        return Ok(());
    }

    let Some(path) = args.path else {
        anyhow::bail!("No output path given");
    };
    if path.exists() && !args.force {
        anyhow::bail!(
            "'{}' already exists (use --force to overwrite)",
            path.display()
        );
    }
    let patch = get_factory_patch(&args.from).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown factory patch '{}'. Use 'ondule init --list' to see them.",
            args.from
        )
    })?;

    patch.save(&path)?;
    println!("Wrote '{}' to {}", patch.name, path.display());
    Ok(())
}
