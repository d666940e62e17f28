//! Machine parameter sheet with named presets and TOML overrides.

use std::fmt;
use std::path::Path as FsPath;
use std::str::FromStr;

use cade_math::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ConfigError, Result};

/// Format version written into every parameter sheet.
pub const CONFIG_VERSION: &str = "1.0";

/// Major version this build understands.
const SUPPORTED_MAJOR: u32 = 1;

// =============================================================================
// Presets
// =============================================================================

/// Named starting points for a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// One metre of travel on X and Y.
    Standard,
    /// Bench-top machine with 600 mm rails.
    Desktop,
}

impl Preset {
    /// Every preset, in listing order.
    pub const ALL: [Preset; 2] = [Preset::Standard, Preset::Desktop];

    /// The parameter sheet this preset stands for.
    pub fn dimensions(self) -> MachineDimensions {
        match self {
            Preset::Standard => MachineDimensions::standard(),
            Preset::Desktop => MachineDimensions::desktop(),
        }
    }
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Preset::Standard),
            "desktop" => Ok(Preset::Desktop),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preset::Standard => write!(f, "standard"),
            Preset::Desktop => write!(f, "desktop"),
        }
    }
}

// =============================================================================
// Dimensions
// =============================================================================

/// Base measurements of a machine frame, in millimetres.
///
/// Only the independent values are stored; everything that follows from
/// them (travel, tunnel opening, motor support) is computed on demand so
/// an override never leaves the sheet inconsistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineDimensions {
    /// Sheet format version.
    pub version: String,
    /// Length of the X rail.
    pub x_rail_length: f64,
    /// Length of the Y rails.
    pub y_rail_length: f64,
    /// Length of the Z rail.
    pub z_rail_length: f64,
    /// Thickness of the sheet stock.
    pub wood_thickness: f64,
    /// Distance between the wheels of a carrier.
    pub carrier_wheelbase: f64,
    /// Width of the boards carrying the X rail.
    pub x_rail_support_width: f64,
    /// Free space past the end of each Y rail.
    pub y_rail_end_space: f64,
    /// Cutter diameter used for relief corners.
    pub spindle_size: f64,
    /// Gap kept between a joint and the board edge.
    pub join_offset: f64,
    /// Length of a stepper body.
    pub motor_body_length: f64,
    /// Side of a stepper's square flange.
    pub motor_side: f64,
    /// Radius used to round exposed corners.
    pub rounding_radius: f64,
    /// How far the lead screw sits below the support.
    pub screw_sinking: f64,
    /// Distance from the screw axis to its support.
    pub screw_center_to_support: f64,
}

impl Default for MachineDimensions {
    fn default() -> Self {
        Self::standard()
    }
}

impl MachineDimensions {
    /// The full-size machine.
    pub fn standard() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            x_rail_length: 1000.0,
            y_rail_length: 1000.0,
            z_rail_length: 350.0,
            wood_thickness: 15.0,
            carrier_wheelbase: 200.0,
            x_rail_support_width: 100.0,
            y_rail_end_space: 18.0,
            spindle_size: 6.0,
            join_offset: 10.0,
            motor_body_length: 113.5,
            motor_side: 56.0,
            rounding_radius: 10.0,
            screw_sinking: -20.0,
            screw_center_to_support: 25.0,
        }
    }

    /// A smaller machine with the same Z travel.
    pub fn desktop() -> Self {
        Self {
            x_rail_length: 600.0,
            y_rail_length: 600.0,
            z_rail_length: 250.0,
            carrier_wheelbase: 100.0,
            ..Self::standard()
        }
    }

    /// Parse a TOML sheet.
    ///
    /// The sheet may name a base `preset` (standard by default); every
    /// other key overrides one field of that preset. Keys that are not
    /// fields are rejected, as are sheets from a newer major version.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let mut table: toml::Table = toml::from_str(source)?;

        if let Some(version) = table.remove("version") {
            let version = version
                .as_str()
                .ok_or_else(|| ConfigError::Invalid("version must be a string".into()))?;
            check_version(version)?;
        }
        let preset = match table.remove("preset") {
            Some(name) => name
                .as_str()
                .ok_or_else(|| ConfigError::Invalid("preset must be a string".into()))?
                .parse()?,
            None => Preset::Standard,
        };

        let mut merged = toml::Value::try_from(preset.dimensions())?;
        let fields = merged
            .as_table_mut()
            .ok_or_else(|| ConfigError::Invalid("dimensions are not a table".into()))?;
        for (key, value) in table {
            if !fields.contains_key(&key) {
                return Err(ConfigError::UnknownField(key));
            }
            debug!(%preset, field = %key, "override");
            fields.insert(key, value);
        }

        let mut dims: MachineDimensions = merged.try_into()?;
        dims.version = CONFIG_VERSION.to_string();
        dims.validate()?;
        Ok(dims)
    }

    /// Read a TOML sheet from disk.
    pub fn load(path: impl AsRef<FsPath>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Write the full sheet as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Reject sheets no machine can be built from.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("x_rail_length", self.x_rail_length),
            ("y_rail_length", self.y_rail_length),
            ("z_rail_length", self.z_rail_length),
            ("wood_thickness", self.wood_thickness),
            ("spindle_size", self.spindle_size),
            ("motor_side", self.motor_side),
        ];
        for (name, value) in positive {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")));
            }
        }
        if self.join_offset < 0.0 || self.rounding_radius < 0.0 {
            return Err(ConfigError::Invalid(
                "join offset and rounding radius cannot be negative".into(),
            ));
        }
        if self.z_axis_travel() <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "z rail of {} leaves no travel for a {} wheelbase",
                self.z_rail_length, self.carrier_wheelbase
            )));
        }
        if self.tunnel_opening_height() < self.motor_side {
            return Err(ConfigError::Invalid(format!(
                "tunnel opening of {:.1} is smaller than the {} motor",
                self.tunnel_opening_height(),
                self.motor_side
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Derived quantities
    // =========================================================================

    /// Travel of the Z carrier.
    pub fn z_axis_travel(&self) -> f64 {
        self.z_rail_length - self.carrier_wheelbase
    }

    /// Space the tool can reach.
    pub fn open_area(&self) -> Vec3 {
        Vec3::new(
            self.x_rail_length,
            self.y_rail_length + self.y_rail_end_space,
            self.z_axis_travel(),
        )
    }

    /// Width left between the two faces of a rail support.
    pub fn join_width(&self) -> f64 {
        self.x_rail_support_width - 2.0 * self.wood_thickness
    }

    /// Room taken by a board and the gaps on both sides of it.
    pub fn join_space(&self) -> f64 {
        2.0 * self.join_offset + self.wood_thickness
    }

    /// Height of the bridge's top board.
    pub fn bridge_top_thickness(&self) -> f64 {
        self.z_axis_travel()
    }

    /// Top of the bridge above the work surface.
    pub fn bridge_top(&self) -> f64 {
        self.open_area().z + self.bridge_top_thickness()
    }

    /// Height of the tunnel under the work surface.
    pub fn tunnel_height(&self) -> f64 {
        self.open_area().z
    }

    /// Clear height inside the tunnel.
    pub fn tunnel_opening_height(&self) -> f64 {
        self.tunnel_height() - self.wood_thickness - 2.0 * self.join_space()
    }

    /// Height of the Y lead screw.
    pub fn screw_shaft_z(&self) -> f64 {
        self.tunnel_opening_height() / 2.0 + self.join_space()
    }

    /// Clearance around a motor inside the tunnel.
    pub fn motor_support_padding(&self) -> f64 {
        (self.tunnel_opening_height() - self.motor_side) / 2.0
    }

    /// Width of the board carrying a motor.
    pub fn motor_support_width(&self) -> f64 {
        self.motor_side + 2.0 * self.motor_support_padding()
    }

    /// Screw axis relative to the top of its support.
    pub fn screw_center(&self) -> f64 {
        self.screw_sinking + self.screw_center_to_support
    }

    /// Top of the motor support.
    pub fn motor_support_height(&self) -> f64 {
        self.screw_center() + self.motor_support_width() / 2.0
    }

    /// Bottom of the space left for the motor.
    pub fn motor_space_depth(&self) -> f64 {
        self.screw_center() - self.motor_support_width() / 2.0
    }

    /// How far a screw bearing block reaches past its support.
    pub fn bfk_support_extension(&self) -> f64 {
        self.wood_thickness - 1.0
    }
}

fn check_version(version: &str) -> Result<()> {
    let major = version
        .split('.')
        .next()
        .and_then(|m| m.trim().parse::<u32>().ok())
        .ok_or_else(|| ConfigError::UnsupportedVersion(version.to_string()))?;
    if major != SUPPORTED_MAJOR {
        return Err(ConfigError::UnsupportedVersion(version.to_string()));
    }
    Ok(())
}
