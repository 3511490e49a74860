//! Error types for the graph runtime.

use thiserror::Error;

/// Result type alias using the graph runtime error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring, running or reading from a graph.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error (graph files, resources)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Graph config could not be parsed
    #[error("graph config error: {0}")]
    Json(#[from] serde_json::Error),

    /// Structural problem in the graph config
    #[error("invalid graph config: {0}")]
    Config(String),

    /// Node references a calculator that is not registered
    #[error("calculator {0} is not registered")]
    UnknownCalculator(String),

    /// Option override targets a node that does not exist
    #[error("no node named {0} in graph")]
    UnknownNode(String),

    /// Option override names an option the calculator does not declare
    #[error("calculator {calculator} has no option {option}")]
    UnknownOption { calculator: String, option: String },

    /// Stream is not declared or produced by the graph
    #[error("no stream named {0} in graph")]
    UnknownStream(String),

    /// Side packet required by a node was not supplied
    #[error("side packet {0} is missing")]
    MissingSidePacket(String),

    /// Pixel buffer or dimensions are invalid
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Image format not handled by the operation
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Packet holds a different type than requested
    #[error("packet type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Calculator failed while opening, processing or closing
    #[error("calculator {node} failed: {message}")]
    Calculator { node: String, message: String },

    /// Argument rejected before it reached the graph
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation not valid in the current instance state
    #[error("{0}")]
    State(String),

    /// Poller stream was closed by the graph
    #[error("poller for stream {0} is closed")]
    PollerClosed(String),

    /// Resource lookup failed
    #[error("resource error: {0}")]
    Resource(String),
}

impl Error {
    /// Build a calculator failure for the named node.
    pub fn calculator(node: impl Into<String>, message: impl ToString) -> Self {
        Self::Calculator {
            node: node.into(),
            message: message.to_string(),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::InvalidImage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_subject() {
        let err = Error::UnknownOption {
            calculator: "ThresholdingCalculator".into(),
            option: "gain".into(),
        };
        assert_eq!(
            err.to_string(),
            "calculator ThresholdingCalculator has no option gain"
        );

        let err = Error::calculator("flip", "bad rotation");
        assert_eq!(err.to_string(), "calculator flip failed: bad rotation");
    }
}
