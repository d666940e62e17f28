//! Metric fastener catalog and kit selection.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::{FlatError, Result, Solid, SolidKind};

/// Stock bolt lengths (mm).
pub const BOLT_LENGTHS: [f64; 19] = [
    6.0, 8.0, 10.0, 12.0, 16.0, 20.0, 25.0, 30.0, 35.0, 40.0, 45.0, 50.0, 55.0, 60.0, 65.0, 70.0,
    80.0, 90.0, 100.0,
];

/// Extra length a bolt must protrude past its nut (mm).
pub const LENGTH_MARGIN: f64 = 2.0;

/// Diameter of the pocket drilled for a cylinder nut (mm).
pub const CYLINDER_NUT_DIAMETER: f64 = 10.0;

/// Barrel length of a cylinder nut (mm).
pub const CYLINDER_NUT_LENGTH: f64 = 13.0;

const MIN_DIAMETER: f64 = 3.0;
const MAX_DIAMETER: f64 = 9.0;

/// Metric thread sizes carried by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricSize {
    /// M3
    M3,
    /// M4
    M4,
    /// M5
    M5,
    /// M6
    M6,
    /// M8
    M8,
}

impl MetricSize {
    /// All sizes, smallest first.
    pub const ALL: [MetricSize; 5] = [
        MetricSize::M3,
        MetricSize::M4,
        MetricSize::M5,
        MetricSize::M6,
        MetricSize::M8,
    ];

    /// Largest size whose nominal diameter does not exceed `diameter`.
    pub fn from_diameter(diameter: f64) -> Result<Self> {
        if !(MIN_DIAMETER..=MAX_DIAMETER).contains(&diameter) {
            return Err(FlatError::UnsupportedDiameter(diameter));
        }
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|s| s.diameter() <= diameter + 1e-9)
            .ok_or(FlatError::UnsupportedDiameter(diameter))
    }

    /// Nominal diameter (mm).
    pub fn diameter(self) -> f64 {
        match self {
            MetricSize::M3 => 3.0,
            MetricSize::M4 => 4.0,
            MetricSize::M5 => 5.0,
            MetricSize::M6 => 6.0,
            MetricSize::M8 => 8.0,
        }
    }

    /// Hex nut height (mm).
    pub fn nut_thickness(self) -> f64 {
        match self {
            MetricSize::M3 => 2.4,
            MetricSize::M4 => 3.2,
            MetricSize::M5 => 4.0,
            MetricSize::M6 => 5.0,
            MetricSize::M8 => 6.5,
        }
    }

    /// Flat washer thickness (mm).
    pub fn washer_thickness(self) -> f64 {
        match self {
            MetricSize::M3 => 0.5,
            MetricSize::M4 => 0.8,
            MetricSize::M5 => 1.0,
            MetricSize::M6 | MetricSize::M8 => 1.6,
        }
    }

    /// Flat washer outer diameter (mm).
    pub fn washer_diameter(self) -> f64 {
        match self {
            MetricSize::M3 => 7.0,
            MetricSize::M4 => 9.0,
            MetricSize::M5 => 10.0,
            MetricSize::M6 => 12.0,
            MetricSize::M8 => 16.0,
        }
    }

    /// Hex head height (mm).
    pub fn head_height(self) -> f64 {
        match self {
            MetricSize::M3 => 2.0,
            MetricSize::M4 => 2.8,
            MetricSize::M5 => 3.5,
            MetricSize::M6 => 4.0,
            MetricSize::M8 => 5.3,
        }
    }

    fn number(self) -> u32 {
        self.diameter() as u32
    }
}

impl fmt::Display for MetricSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.number())
    }
}

/// Bolt, nut and washer for a through-bolted joint.
#[derive(Debug, Clone)]
pub struct FastenerKit {
    /// The bolt.
    pub bolt: Rc<Solid>,
    /// The nut.
    pub nut: Rc<Solid>,
    /// The washer under the head.
    pub washer: Rc<Solid>,
}

/// Bolt, washer and cylinder nut for a joint into a board edge.
#[derive(Debug, Clone)]
pub struct BarrelNutKit {
    /// The bolt.
    pub bolt: Rc<Solid>,
    /// The washer under the head.
    pub washer: Rc<Solid>,
    /// The cylinder nut.
    pub cylinder_nut: Rc<Solid>,
}

/// Fastener solids, created on demand and shared per size and length.
///
/// Asking twice for the same bolt returns the same [`Rc`].
#[derive(Debug, Default)]
pub struct FastenerCatalog {
    bolts: HashMap<(MetricSize, u32), Rc<Solid>>,
    nuts: HashMap<MetricSize, Rc<Solid>>,
    washers: HashMap<MetricSize, Rc<Solid>>,
    cylinder_nuts: HashMap<MetricSize, Rc<Solid>>,
}

impl FastenerCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shortest stock length of at least `required`.
    pub fn bolt_length_for(size: MetricSize, required: f64) -> Result<f64> {
        BOLT_LENGTHS
            .iter()
            .copied()
            .find(|&l| l >= required - 1e-9)
            .ok_or(FlatError::BoltTooLong {
                size: size.number(),
                required,
            })
    }

    /// Bolt of a stock length.
    pub fn bolt(&mut self, size: MetricSize, length: f64) -> Rc<Solid> {
        let key = (size, length.round() as u32);
        self.bolts
            .entry(key)
            .or_insert_with(|| {
                Rc::new(Solid::with_kind(
                    format!("{size}x{} bolt", key.1),
                    SolidKind::Bolt {
                        size,
                        length: key.1 as f64,
                    },
                ))
            })
            .clone()
    }

    /// Hex nut.
    pub fn nut(&mut self, size: MetricSize) -> Rc<Solid> {
        self.nuts
            .entry(size)
            .or_insert_with(|| Rc::new(Solid::with_kind(format!("{size} nut"), SolidKind::Nut { size })))
            .clone()
    }

    /// Flat washer.
    pub fn washer(&mut self, size: MetricSize) -> Rc<Solid> {
        self.washers
            .entry(size)
            .or_insert_with(|| {
                Rc::new(Solid::with_kind(
                    format!("{size} washer"),
                    SolidKind::Washer { size },
                ))
            })
            .clone()
    }

    /// Cylinder nut.
    pub fn cylinder_nut(&mut self, size: MetricSize) -> Rc<Solid> {
        self.cylinder_nuts
            .entry(size)
            .or_insert_with(|| {
                Rc::new(Solid::with_kind(
                    format!("{size} cylinder nut"),
                    SolidKind::CylinderNut {
                        size,
                        length: CYLINDER_NUT_LENGTH,
                    },
                ))
            })
            .clone()
    }

    /// Kit for a hole of `diameter` clamping `clamp` mm of material.
    ///
    /// With `add_length_for_nut` the bolt must also pass through its nut and
    /// protrude by [`LENGTH_MARGIN`].
    pub fn get_fastener_kit(
        &mut self,
        diameter: f64,
        clamp: f64,
        add_length_for_nut: bool,
    ) -> Result<FastenerKit> {
        let size = MetricSize::from_diameter(diameter)?;
        let required = if add_length_for_nut {
            clamp + size.nut_thickness() + LENGTH_MARGIN
        } else {
            clamp
        };
        let length = Self::bolt_length_for(size, required)?;
        debug!(%size, clamp, required, length, "selected bolt");
        Ok(FastenerKit {
            bolt: self.bolt(size, length),
            nut: self.nut(size),
            washer: self.washer(size),
        })
    }

    /// Kit for bolting into a cylinder nut whose axis sits `clamp` mm from
    /// the bearing face under the washer.
    pub fn bolt_and_barrel_nut(&mut self, diameter: f64, clamp: f64) -> Result<BarrelNutKit> {
        let size = MetricSize::from_diameter(diameter)?;
        let required =
            clamp + size.washer_thickness() + CYLINDER_NUT_DIAMETER / 2.0 + LENGTH_MARGIN;
        let length = Self::bolt_length_for(size, required)?;
        debug!(%size, clamp, required, length, "selected bolt for cylinder nut");
        Ok(BarrelNutKit {
            bolt: self.bolt(size, length),
            washer: self.washer(size),
            cylinder_nut: self.cylinder_nut(size),
        })
    }
}
