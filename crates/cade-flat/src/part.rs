//! Boards cut from sheet stock.

use std::cell::RefCell;
use std::rc::Rc;

use cade_math::{Point2, Vec2};
use cade_path::{Path, PathError};

use crate::{FlatError, Result};

/// Shared handle to a board.
///
/// Placing the same handle several times places the same board: an edit
/// through one placement shows up at all of them. Identity is pointer
/// identity ([`Rc::ptr_eq`]); use [`FlatPart::deep_clone`] to break sharing.
pub type FlatPartRef = Rc<RefCell<FlatPart>>;

/// A board: closed outside contour, cutouts and thickness.
///
/// The board occupies `0 <= z <= thickness` in its own frame, with its
/// contours in the XY plane.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatPart {
    /// Name used in cut lists and error messages.
    pub name: String,
    thickness: f64,
    outside: Path,
    insides: Vec<Path>,
}

impl FlatPart {
    /// Create a board from a closed outline.
    pub fn new(name: impl Into<String>, outside: Path, thickness: f64) -> Result<Self> {
        if thickness.is_nan() || thickness <= 0.0 {
            return Err(FlatError::InvalidThickness(thickness));
        }
        if !outside.is_closed() {
            return Err(PathError::NotClosed.into());
        }
        Ok(Self {
            name: name.into(),
            thickness,
            outside,
            insides: Vec::new(),
        })
    }

    /// Wrap in a shared handle.
    pub fn into_ref(self) -> FlatPartRef {
        Rc::new(RefCell::new(self))
    }

    /// Independent copy in a fresh handle.
    pub fn deep_clone(&self) -> FlatPartRef {
        self.clone().into_ref()
    }

    /// Board thickness.
    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    /// Outside contour.
    pub fn outside(&self) -> &Path {
        &self.outside
    }

    /// Cutouts.
    pub fn insides(&self) -> &[Path] {
        &self.insides
    }

    /// Add a cutout.
    pub fn add_inside(&mut self, inside: Path) -> Result<()> {
        if !inside.is_closed() {
            return Err(PathError::NotClosed.into());
        }
        self.insides.push(inside);
        Ok(())
    }

    /// Add several cutouts. Nothing is added if any of them is open.
    pub fn add_insides(&mut self, insides: impl IntoIterator<Item = Path>) -> Result<()> {
        let insides: Vec<Path> = insides.into_iter().collect();
        if insides.iter().any(|p| !p.is_closed()) {
            return Err(PathError::NotClosed.into());
        }
        self.insides.extend(insides);
        Ok(())
    }

    /// Replace the outside contour.
    pub fn assign_outside_path(&mut self, outside: Path) -> Result<()> {
        if !outside.is_closed() {
            return Err(PathError::NotClosed.into());
        }
        self.outside = outside;
        Ok(())
    }

    /// Reflect the board across the Y axis of its own frame.
    pub fn mirror(&mut self) {
        self.mirror_about(Point2::origin(), Vec2::y());
    }

    /// Reflect the board across a line of its plane.
    pub fn mirror_about(&mut self, point: Point2, direction: Vec2) {
        self.outside = self.outside.reflected(point, direction);
        for inside in &mut self.insides {
            *inside = inside.reflected(point, direction);
        }
    }

    /// Complete a half board: the outside becomes the union with its
    /// reflection across the line, and reflected copies of the cutouts are
    /// added.
    pub fn symmetrize(&mut self, point: Point2, direction: Vec2) -> Result<()> {
        let reflected = self.outside.reflected(point, direction);
        self.outside = self.outside.boolean_union(&reflected)?;
        let mirrored: Vec<Path> = self
            .insides
            .iter()
            .map(|p| p.reflected(point, direction))
            .collect();
        self.insides.extend(mirrored);
        Ok(())
    }

    /// Material area: outside region minus cutouts.
    pub fn area(&self) -> f64 {
        let cut: f64 = self.insides.iter().map(|p| p.area().abs()).sum();
        self.outside.region_area() - cut
    }

    /// Bounding box of the outside contour.
    pub fn bounding_box(&self) -> Option<(Point2, Point2)> {
        self.outside.bounding_box()
    }
}
