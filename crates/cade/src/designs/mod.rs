//! Reference designs and the cut list they produce.

mod box_design;
mod cable_chain;

pub use box_design::{alternating_layout, box_design, BoxDesign, BOX_HEIGHT, BOX_LENGTH, BOX_WIDTH};
pub use cable_chain::{
    cable_chain_links, chain_directrix, DEFAULT_CHAIN_LENGTH, LINK_HEIGHT, LINK_PITCH,
};

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use cade_flat::{Assembly, FlatPartRef};
use serde::Serialize;

use crate::{ConfigError, MachineDimensions};

/// Designs that can be built by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesignKind {
    /// [`box_design`].
    Box,
    /// [`cable_chain_links`] spanning the Y travel.
    CableChain,
}

impl DesignKind {
    /// Every design, in listing order.
    pub const ALL: [DesignKind; 2] = [DesignKind::Box, DesignKind::CableChain];

    /// Build the design for a machine.
    pub fn build(self, dims: &MachineDimensions) -> cade_flat::Result<Assembly> {
        match self {
            DesignKind::Box => Ok(box_design(dims)?.assembly),
            DesignKind::CableChain => cable_chain_links(
                dims.x_rail_support_width,
                dims.tunnel_opening_height(),
                DEFAULT_CHAIN_LENGTH.max(dims.open_area().y / 2.0),
            ),
        }
    }
}

impl FromStr for DesignKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "box" => Ok(DesignKind::Box),
            "cable-chain" => Ok(DesignKind::CableChain),
            _ => Err(ConfigError::Invalid(format!("unknown design {s:?}"))),
        }
    }
}

impl fmt::Display for DesignKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesignKind::Box => write!(f, "box"),
            DesignKind::CableChain => write!(f, "cable-chain"),
        }
    }
}

// =============================================================================
// Cut list
// =============================================================================

/// One distinct board to cut, with how many placements use it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardCut {
    /// Board name.
    pub name: String,
    /// Stock thickness.
    pub thickness: f64,
    /// Bounding-box width of the outline.
    pub width: f64,
    /// Bounding-box height of the outline.
    pub height: f64,
    /// Area of the outline less the cutouts.
    pub area: f64,
    /// Number of cutouts.
    pub cutouts: usize,
    /// Placements in the assembly.
    pub count: usize,
}

/// Everything needed to build an assembly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutList {
    /// Assembly name.
    pub design: String,
    /// Boards, in first-placement order.
    pub boards: Vec<BoardCut>,
    /// Other solids by name, with their counts.
    pub hardware: BTreeMap<String, usize>,
}

impl CutList {
    /// Gather boards and hardware from every level of `assembly`.
    pub fn from_assembly(assembly: &Assembly) -> Self {
        let mut parts: Vec<(FlatPartRef, usize)> = Vec::new();
        for (part, _) in assembly.flat_parts() {
            match parts.iter_mut().find(|(p, _)| Rc::ptr_eq(p, &part)) {
                Some((_, count)) => *count += 1,
                None => parts.push((part, 1)),
            }
        }
        let boards = parts
            .into_iter()
            .map(|(part, count)| {
                let part = part.borrow();
                let (width, height) = part
                    .bounding_box()
                    .map(|(min, max)| (max.x - min.x, max.y - min.y))
                    .unwrap_or_default();
                BoardCut {
                    name: part.name.clone(),
                    thickness: part.thickness(),
                    width,
                    height,
                    area: part.area(),
                    cutouts: part.insides().len(),
                    count,
                }
            })
            .collect();

        let mut hardware = BTreeMap::new();
        for (solid, _) in assembly.solids() {
            *hardware.entry(solid.name.clone()).or_insert(0) += 1;
        }
        Self {
            design: assembly.name.clone(),
            boards,
            hardware,
        }
    }
}

impl fmt::Display for CutList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.design)?;
        if !self.boards.is_empty() {
            writeln!(f, "boards:")?;
            for b in &self.boards {
                writeln!(
                    f,
                    "  {} x{}  {:.1} x {:.1} x {:.1}  area {:.0}  cutouts {}",
                    b.name, b.count, b.width, b.height, b.thickness, b.area, b.cutouts
                )?;
            }
        }
        if !self.hardware.is_empty() {
            writeln!(f, "hardware:")?;
            for (name, count) in &self.hardware {
                writeln!(f, "  {name} x{count}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_design_kind_from_str() {
        assert_eq!("Cable_Chain".parse::<DesignKind>().unwrap(), DesignKind::CableChain);
        assert_eq!(DesignKind::Box.to_string(), "box");
        assert!("table".parse::<DesignKind>().is_err());
    }

    #[test]
    fn test_box_cut_list() {
        let asm = DesignKind::Box.build(&MachineDimensions::standard()).unwrap();
        let list = CutList::from_assembly(&asm);
        assert_eq!(list.design, "box");
        assert_eq!(list.boards.len(), 5);
        assert!(list.boards.iter().all(|b| b.count == 1));
        assert_eq!(list.hardware.get("M6x45 bolt"), Some(&10));
        assert_eq!(list.hardware.values().sum::<usize>(), 30);
        assert!(list.to_string().contains("hardware:"));
    }

    #[test]
    fn test_chain_cut_list_has_no_boards() {
        let asm = DesignKind::CableChain
            .build(&MachineDimensions::desktop())
            .unwrap();
        let list = CutList::from_assembly(&asm);
        assert!(list.boards.is_empty());
        assert_eq!(list.hardware.get("start chain element"), Some(&1));
    }
}
