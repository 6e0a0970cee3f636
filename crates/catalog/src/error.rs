#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Transport failed before a response arrived.
    Network(String),
    BadStatus { status: u16, url: String },
    /// Response body was not a usable item collection.
    Decode(String),
    InvalidUrl(String),
    InvalidInput(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Network(msg) => write!(f, "catalog request failed: {msg}"),
            CatalogError::BadStatus { status, url } => {
                write!(f, "catalog returned HTTP {status} for {url}")
            }
            CatalogError::Decode(msg) => write!(f, "catalog response could not be decoded: {msg}"),
            CatalogError::InvalidUrl(msg) => write!(f, "invalid catalog url: {msg}"),
            CatalogError::InvalidInput(msg) => write!(f, "invalid query input: {msg}"),
        }
    }
}

impl std::error::Error for CatalogError {}
