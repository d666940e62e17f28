#![warn(missing_docs)]

//! Machine-frame designs built from flat boards.
//!
//! [`MachineDimensions`] is the parameter sheet every design reads: a few
//! measured values (rail lengths, stock thickness, motor size) plus the
//! quantities derived from them. Sheets come from a named [`Preset`] and
//! can be overridden from TOML.
//!
//! The [`designs`] module holds reference assemblies that exercise the
//! joinery end to end.
//!
//! # Example
//!
//! ```
//! use cade::{designs, MachineDimensions};
//!
//! let dims = MachineDimensions::from_toml_str("preset = \"desktop\"").unwrap();
//! let design = designs::box_design(&dims).unwrap();
//! assert_eq!(design.assembly.flat_parts().len(), 5);
//! ```

mod config;
pub mod designs;

pub use config::{MachineDimensions, Preset, CONFIG_VERSION};

use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading or validating a parameter sheet.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The sheet could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The sheet is not valid TOML or has mistyped values.
    #[error("invalid sheet: {0}")]
    Parse(#[from] toml::de::Error),

    /// The sheet could not be written.
    #[error("cannot write sheet: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The sheet was written by an incompatible version.
    #[error("unsupported sheet version {0}")]
    UnsupportedVersion(String),

    /// No preset has this name.
    #[error("unknown preset {0:?}")]
    UnknownPreset(String),

    /// The key does not name a dimension.
    #[error("unknown field {0:?}")]
    UnknownField(String),

    /// The values do not describe a buildable machine.
    #[error("{0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
