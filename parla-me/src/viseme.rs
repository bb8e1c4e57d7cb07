//! Viseme inventory: id to morph target name

/// Morph target names for viseme ids 0-14. Id 0 is silence.
pub const VISEME_NAMES: [&str; 15] = [
    "viseme_sil",
    "viseme_PP",
    "viseme_FF",
    "viseme_TH",
    "viseme_DD",
    "viseme_kk",
    "viseme_CH",
    "viseme_SS",
    "viseme_nn",
    "viseme_RR",
    "viseme_aa",
    "viseme_E",
    "viseme_I",
    "viseme_O",
    "viseme_U",
];

/// Morph target name for a viseme id, `None` outside the inventory
pub fn viseme_name(id: u32) -> Option<&'static str> {
    VISEME_NAMES.get(id as usize).copied()
}
