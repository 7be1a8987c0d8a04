/// A built-in expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub source: &'static str,
}

/// Factory presets, selected by 1-based slot number.
pub const FACTORY_PRESETS: [Preset; 3] = [
    Preset {
        name: "classic",
        source: "t*(42&t>>10)",
    },
    Preset {
        name: "sierpinski harmony",
        source: "t*((t>>12)|(t>>8))",
    },
    Preset {
        name: "deadbeef melody",
        source: "t*(0xdeadbeef>>(t>>11)&15)/2|t>>3|t>>(t>>10)",
    },
];

/// Looks up preset `slot` (1-based).
pub fn preset(slot: usize) -> Option<&'static Preset> {
    slot.checked_sub(1).and_then(|i| FACTORY_PRESETS.get(i))
}
