//! Registry error types

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Registry is at capacity
    CapacityExceeded {
        /// The configured client limit
        max_clients: usize,
    },
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::CapacityExceeded { max_clients } => {
                write!(f, "registry full: {} clients", max_clients)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
