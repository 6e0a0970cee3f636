/// Hue increment between consecutive items; the golden angle keeps neighbours apart.
pub const GOLDEN_ANGLE_DEG: f64 = 137.5;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Hsl {
    pub hue: f64,
    pub saturation: u8,
    pub lightness: u8,
}

/// Deterministic outline color for the item at `index` in a result set.
pub fn golden_angle_color(index: usize) -> Hsl {
    Hsl {
        hue: (index as f64 * GOLDEN_ANGLE_DEG) % 360.0,
        saturation: 80,
        lightness: 50,
    }
}

impl std::fmt::Display for Hsl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "hsl({}, {}%, {}%)", self.hue, self.saturation, self.lightness)
    }
}
