//! Shared CLI helpers used across multiple commands.

use ondule_config::{LivePatch, Patch, get_factory_patch};
use ondule_core::ObjectId;
use std::path::Path;

/// Load a patch by file path or factory name.
///
/// An existing file wins over a factory patch of the same name.
pub fn load_patch(name: &str) -> anyhow::Result<Patch> {
    let path = Path::new(name);
    if path.exists() {
        return Ok(Patch::load(path)?);
    }

    if let Some(patch) = get_factory_patch(name) {
        return Ok(patch);
    }

    anyhow::bail!(
        "Patch '{}' not found. Pass a .toml file or a factory patch name (see 'ondule init --list').",
        name
    )
}

/// Patch id of a live object, or its raw id if it is not part of the patch.
pub fn object_label(live: &LivePatch, id: ObjectId) -> String {
    live.objects()
        .iter()
        .find(|(_, object)| object.id() == id)
        .map_or_else(|| format!("#{}", id.raw()), |(name, _)| name.clone())
}
