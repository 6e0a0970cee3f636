/// Malformed geometry or bbox input, rejected before it reaches any state.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Expected 4 (or 6 for 3-D) numbers, got something else.
    BBoxArity(usize),
    NonFinite,
    Inverted { min: f64, max: f64 },
    /// A position with fewer than two coordinates.
    Position(usize),
    EmptyCoordinates,
    Unsupported(String),
    Malformed(String),
}

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryError::BBoxArity(n) => write!(f, "bbox must have 4 or 6 numbers, got {n}"),
            GeometryError::NonFinite => write!(f, "coordinates must be finite numbers"),
            GeometryError::Inverted { min, max } => {
                write!(f, "bbox minimum {min} exceeds maximum {max}")
            }
            GeometryError::Position(n) => {
                write!(f, "position needs at least 2 coordinates, got {n}")
            }
            GeometryError::EmptyCoordinates => write!(f, "geometry has no coordinates"),
            GeometryError::Unsupported(kind) => write!(f, "unsupported geometry type: {kind}"),
            GeometryError::Malformed(msg) => write!(f, "malformed geometry: {msg}"),
        }
    }
}

impl std::error::Error for GeometryError {}
