//! Factory patches bundled with the library.
//!
//! Built-in patches that are always available without external files. They
//! double as examples of the patch format and as starting points for `init`.

use crate::Patch;

/// TOML content for factory patches, keyed by internal name.
static FACTORY_PATCHES_TOML: &[(&str, &str)] = &[
    ("init", INIT_PATCH),
    ("stereo_pair", STEREO_PAIR_PATCH),
    ("tremolo", TREMOLO_PATCH),
    ("feedback", FEEDBACK_PATCH),
    ("voices", VOICES_PATCH),
];

/// Initialization patch - one sine on both channels.
const INIT_PATCH: &str = r#"
name = "Init"
description = "A quiet 440 Hz sine on both channels"
connections = ["osc.Out -> amp.In"]

[[objects]]
id = "osc"
kind = "sine"

[[objects]]
id = "amp"
kind = "gain"
[objects.params]
Gain = 0.25

[[outputs]]
channel = 0
from = "amp.Out"

[[outputs]]
channel = 1
from = "amp.Out"
"#;

/// Stereo pair - a fifth, panned slightly right.
const STEREO_PAIR_PATCH: &str = r#"
name = "Stereo Pair"
description = "Two sines a fifth apart through the panner"
connections = [
    "low.Out -> pan.Left",
    "high.Out -> pan.Right",
    "position.Out -> pan.Pan",
]

[[objects]]
id = "low"
kind = "sine"
[objects.params]
Frequency = 220.0
Level = 0.3

[[objects]]
id = "high"
kind = "sine"
[objects.params]
Frequency = 330.0
Level = 0.3

[[objects]]
id = "position"
kind = "constant"
[objects.params]
Value = -0.2

[[objects]]
id = "pan"
kind = "panner"

[[outputs]]
channel = 0
from = "pan.Left"

[[outputs]]
channel = 1
from = "pan.Right"
"#;

/// Tremolo - a slow sine folded into 0..1 scales the carrier.
const TREMOLO_PATCH: &str = r#"
name = "Tremolo"
description = "Carrier amplitude-modulated by a 4 Hz sine"
connections = [
    "lfo.Out -> depth.In",
    "carrier.Out -> vca.Left",
    "depth.Out -> vca.Right",
]

[[objects]]
id = "carrier"
kind = "sine"
[objects.params]
Frequency = 440.0
Level = 0.5

[[objects]]
id = "lfo"
kind = "sine"
[objects.params]
Frequency = 4.0

[[objects]]
id = "depth"
kind = "gainbias"
[objects.params]
Gain = 0.5
Bias = 0.5

[[objects]]
id = "vca"
kind = "multiply"

[[outputs]]
channel = 0
from = "vca.Out"

[[outputs]]
channel = 1
from = "vca.Out"
"#;

/// Feedback - a mixer fed back through a gain; the loop is broken by the
/// compiler and runs a frame behind.
const FEEDBACK_PATCH: &str = r#"
name = "Feedback"
description = "Sine into a mixer with a half-gain feedback path"
connections = [
    "osc.Out -> mix.In1",
    "mix.Out -> loop.In",
    "loop.Out -> mix.In2",
]

[[objects]]
id = "osc"
kind = "sine"
[objects.params]
Frequency = 110.0
Level = 0.25

[[objects]]
id = "mix"
kind = "mixer"

[[objects]]
id = "loop"
kind = "gain"
[objects.params]
Gain = 0.5

[[outputs]]
channel = 0
from = "mix.Out"

[[outputs]]
channel = 1
from = "mix.Out"
"#;

/// Voices - three pooled sines summed into one mixer.
const VOICES_PATCH: &str = r#"
name = "Voices"
description = "Three sines taken from an object cache and mixed"
connections = [
    "voice0.Out -> mix.In1",
    "voice1.Out -> mix.In2",
    "voice2.Out -> mix.In3",
    "mix.Out -> amp.In",
]

[[objects]]
id = "mix"
kind = "mixer"

[[objects]]
id = "amp"
kind = "gain"
[objects.params]
Gain = 0.2

[[outputs]]
channel = 0
from = "amp.Out"

[[outputs]]
channel = 1
from = "amp.Out"

[[caches]]
name = "voice"
kind = "sine"
watermark = 4
capacity = 8
preload = 3
"#;

/// Get all factory patches.
///
/// ```rust
/// use ondule_config::factory_patches;
///
/// for patch in factory_patches() {
///     println!("{}: {}", patch.name, patch.description.as_deref().unwrap_or(""));
/// }
/// ```
pub fn factory_patches() -> Vec<Patch> {
    FACTORY_PATCHES_TOML
        .iter()
        .filter_map(|(_, toml)| Patch::from_toml(toml).ok())
        .collect()
}

/// Get a factory patch by internal or display name, case-insensitively.
///
/// ```rust
/// use ondule_config::get_factory_patch;
///
/// let patch = get_factory_patch("tremolo").unwrap();
/// assert_eq!(patch.name, "Tremolo");
/// assert!(get_factory_patch("Stereo Pair").is_some());
/// ```
pub fn get_factory_patch(name: &str) -> Option<Patch> {
    let name_lower = name.to_lowercase();

    for (patch_name, toml) in FACTORY_PATCHES_TOML {
        if patch_name.to_lowercase() == name_lower {
            return Patch::from_toml(toml).ok();
        }
    }

    FACTORY_PATCHES_TOML
        .iter()
        .filter_map(|(_, toml)| Patch::from_toml(toml).ok())
        .find(|patch| patch.name.to_lowercase() == name_lower)
}

/// Internal names of all factory patches.
pub fn factory_patch_names() -> Vec<&'static str> {
    FACTORY_PATCHES_TOML.iter().map(|(name, _)| *name).collect()
}

/// Returns true if `name` matches a factory patch.
pub fn is_factory_patch(name: &str) -> bool {
    get_factory_patch(name).is_some()
}
