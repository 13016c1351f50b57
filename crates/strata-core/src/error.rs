//! Error types for Strata

use thiserror::Error;

/// The main error type for Strata operations
#[derive(Debug, Error)]
pub enum StrataError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Image load error: {0}")]
    ImageLoad(String),

    #[error("Corrupt tile file header: {0}")]
    CorruptHeader(String),

    #[error("Tile geometry mismatch: expected cell length {expected}, file has {found}")]
    FormatMismatch { expected: u32, found: u32 },

    #[error("Tile record mismatch: requested {expected:?}, record holds {found:?}")]
    TileMismatch {
        expected: (i32, i32),
        found: (i32, i32),
    },

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Render error: {0}")]
    RenderError(String),
}

/// Result type alias for Strata operations
pub type Result<T> = std::result::Result<T, StrataError>;

impl From<toml::de::Error> for StrataError {
    fn from(err: toml::de::Error) -> Self {
        StrataError::ConfigError(err.to_string())
    }
}

impl From<toml::ser::Error> for StrataError {
    fn from(err: toml::ser::Error) -> Self {
        StrataError::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert() {
        let err: StrataError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, StrataError::IoError(_)));
    }

    #[test]
    fn mismatch_message_names_both_coordinates() {
        let err = StrataError::TileMismatch {
            expected: (1, 2),
            found: (3, 4),
        };
        let msg = err.to_string();
        assert!(msg.contains("(1, 2)"));
        assert!(msg.contains("(3, 4)"));
    }

    #[test]
    fn toml_errors_become_config_errors() {
        let err: StrataError = toml::from_str::<toml::Table>("= nope").unwrap_err().into();
        assert!(matches!(err, StrataError::ConfigError(_)));
    }
}
