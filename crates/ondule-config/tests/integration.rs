//! Integration tests for ondule-config.
//!
//! These tests verify end-to-end functionality: files on disk, factory
//! patches, and instantiated engines.

use ondule_config::{
    ConfigError, ObjectConfig, Patch, PortRef, factory_patches, get_factory_patch,
};
use ondule_objects::ObjectRegistry;
use tempfile::TempDir;

/// Save to a nested path, load it back, and run it.
#[test]
fn test_save_load_and_run() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("patches").join("offset.toml");

    let patch = Patch::new("Offset")
        .with_description("A ramp scaled by a quarter")
        .with_object(ObjectConfig::new("ramp", "ramp").with_param("Step", 1.0))
        .with_object(ObjectConfig::new("amp", "gain").with_param("Gain", 0.25))
        .with_connection("ramp.Out -> amp.In".parse().unwrap())
        .with_output(1, PortRef::new("amp", "Out"));
    patch.save(&path).expect("save should create parent directories");
    assert!(path.exists());

    let loaded = Patch::load(&path).unwrap();
    assert_eq!(loaded, patch);

    let live = loaded.instantiate(&ObjectRegistry::new()).unwrap();
    let frame = live.engine().output_frame_len();
    let out = live.render(2);
    assert_eq!(out.len(), 2 * frame);

    let ramp = live.object("ramp").unwrap().outlet("Out").unwrap().buffer().to_vec();
    let right: Vec<f32> = out[frame..].iter().skip(1).step_by(2).copied().collect();
    let expected: Vec<f32> = ramp.iter().map(|s| s * 0.25).collect();
    assert_eq!(right, expected);
    assert!(out.iter().step_by(2).all(|s| *s == 0.0), "left is unrouted");
}

#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = Patch::load(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
}

#[test]
fn test_load_malformed_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "name = \n").unwrap();
    assert!(matches!(
        Patch::load(&path).unwrap_err(),
        ConfigError::TomlParse(_)
    ));
}

/// Every factory patch builds, schedules, and renders finite audio.
#[test]
fn test_factory_patches_run() {
    let registry = ObjectRegistry::new();
    for patch in factory_patches() {
        let live = patch
            .instantiate(&registry)
            .unwrap_or_else(|e| panic!("'{}' should instantiate: {e}", patch.name));
        assert!(live.compilation().is_complete(), "'{}' left objects unresolved", patch.name);
        let out = live.render(20);
        assert!(out.iter().all(|s| s.is_finite()), "'{}' produced non-finite output", patch.name);
        assert!(out.iter().any(|s| *s != 0.0), "'{}' is silent", patch.name);
    }
}

#[test]
fn test_feedback_patch_breaks_its_loop() {
    let live = get_factory_patch("feedback")
        .unwrap()
        .instantiate(&ObjectRegistry::new())
        .unwrap();
    let compiled = live.compilation();
    let names: Vec<_> = compiled.order.iter().map(|o| o.name().to_string()).collect();
    assert_eq!(names, vec!["osc", "mix", "loop"]);

    let mix = live.object("mix").unwrap().id();
    let feedback = live.object("loop").unwrap().id();
    assert_eq!(compiled.broken_edges, vec![(feedback, mix)]);

    // Half-gain feedback of a 0.25 sine stays within 0.5.
    let out = live.render(200);
    assert!(out.iter().all(|s| s.abs() <= 0.5 + 1e-6));
}

#[test]
fn test_voices_patch_uses_its_cache() {
    let live = get_factory_patch("voices")
        .unwrap()
        .instantiate(&ObjectRegistry::new())
        .unwrap();
    let cache = live.cache("voice").unwrap();
    assert_eq!(cache.active_size(), 3);
    assert_eq!(cache.capacity(), 8);
    assert_eq!(live.list().len(), 2);
}
