//! Minimal scene graph: placed boards, opaque solids and sub-assemblies.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use cade_math::{Transform, Vec3};

use crate::fasteners::MetricSize;
use crate::{FlatError, FlatPartRef, Result};

// =============================================================================
// Solids
// =============================================================================

/// What an opaque solid stands for.
#[derive(Debug, Clone, PartialEq)]
pub enum SolidKind {
    /// Hex bolt; the placement origin is under the head, Z runs down the shank.
    Bolt {
        /// Thread size.
        size: MetricSize,
        /// Shank length (mm).
        length: f64,
    },
    /// Hex nut.
    Nut {
        /// Thread size.
        size: MetricSize,
    },
    /// Flat washer.
    Washer {
        /// Thread size.
        size: MetricSize,
    },
    /// Cross-drilled barrel nut; its axis is the placement's Z axis.
    CylinderNut {
        /// Thread size.
        size: MetricSize,
        /// Barrel length (mm).
        length: f64,
    },
    /// Anything else: motors, rails, bought-in parts.
    Opaque,
}

/// A solid modeled outside this crate, known only by name and kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Solid {
    /// Display name.
    pub name: String,
    /// What the solid is.
    pub kind: SolidKind,
}

impl Solid {
    /// An opaque solid.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SolidKind::Opaque,
        }
    }

    /// A solid of a known kind.
    pub fn with_kind(name: impl Into<String>, kind: SolidKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

// =============================================================================
// Assembly
// =============================================================================

/// Shared handle to a sub-assembly.
pub type AssemblyRef = Rc<RefCell<Assembly>>;

/// Anything that can be placed in an [`Assembly`].
///
/// Cloning an entity clones the handle, not the thing it points to.
#[derive(Debug, Clone)]
pub enum Entity {
    /// A board.
    Flat(FlatPartRef),
    /// An opaque solid.
    Solid(Rc<Solid>),
    /// A nested assembly.
    Assembly(AssemblyRef),
}

impl Entity {
    /// Whether both handles point at the same thing.
    pub fn same(&self, other: &Entity) -> bool {
        match (self, other) {
            (Entity::Flat(a), Entity::Flat(b)) => Rc::ptr_eq(a, b),
            (Entity::Solid(a), Entity::Solid(b)) => Rc::ptr_eq(a, b),
            (Entity::Assembly(a), Entity::Assembly(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Name of the thing the handle points at.
    pub fn name(&self) -> String {
        match self {
            Entity::Flat(p) => p.borrow().name.clone(),
            Entity::Solid(s) => s.name.clone(),
            Entity::Assembly(a) => a.borrow().name.clone(),
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// A named node with ordered, placed children.
#[derive(Debug, Clone)]
pub struct Assembly {
    /// Name of the assembly.
    pub name: String,
    children: Vec<(Entity, Transform)>,
}

impl Assembly {
    /// Create an empty assembly.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Wrap in a shared handle.
    pub fn into_ref(self) -> AssemblyRef {
        Rc::new(RefCell::new(self))
    }

    /// Place a child. The same entity may be placed any number of times.
    pub fn add_child(&mut self, entity: Entity, placement: Transform) {
        self.children.push((entity, placement));
    }

    /// Direct children with their placements.
    pub fn children(&self) -> &[(Entity, Transform)] {
        &self.children
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// True if the assembly has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Placement of the first occurrence of `needle`, depth first, composed
    /// down from this assembly.
    pub fn find_child(&self, needle: &Entity) -> Option<Transform> {
        for (entity, placement) in &self.children {
            if entity.same(needle) {
                return Some(placement.clone());
            }
            if let Entity::Assembly(sub) = entity {
                if let Some(inner) = sub.borrow().find_child(needle) {
                    return Some(placement.then(&inner));
                }
            }
        }
        None
    }

    /// Like [`Assembly::find_child`] but fails with
    /// [`FlatError::NotInAssembly`].
    pub fn placement_of(&self, needle: &Entity) -> Result<Transform> {
        self.find_child(needle)
            .ok_or_else(|| FlatError::NotInAssembly(needle.name()))
    }

    /// Placement of a board.
    pub fn placement_of_part(&self, part: &FlatPartRef) -> Result<Transform> {
        self.placement_of(&Entity::Flat(part.clone()))
    }

    /// Placements of every occurrence of `needle`, depth first.
    pub fn find_all(&self, needle: &Entity) -> Vec<Transform> {
        let mut found = Vec::new();
        self.collect_placements(needle, &Transform::identity(), &mut found);
        found
    }

    fn collect_placements(&self, needle: &Entity, parent: &Transform, out: &mut Vec<Transform>) {
        for (entity, placement) in &self.children {
            let world = parent.then(placement);
            if entity.same(needle) {
                out.push(world.clone());
            }
            if let Entity::Assembly(sub) = entity {
                sub.borrow().collect_placements(needle, &world, out);
            }
        }
    }

    /// A new assembly holding the same children, reflected across the plane
    /// through the origin with the given normal.
    pub fn mirror(&self, normal: &Vec3) -> Assembly {
        let reflection = Transform::reflection(normal);
        Assembly {
            name: format!("{} mirror", self.name),
            children: self
                .children
                .iter()
                .map(|(e, p)| (e.clone(), reflection.then(p)))
                .collect(),
        }
    }

    /// Replace every direct placement of `part` with one independent copy
    /// and return the copy. Returns `None` if the part is not a direct child.
    pub fn fork_child(&mut self, part: &FlatPartRef) -> Option<FlatPartRef> {
        let mut fork: Option<FlatPartRef> = None;
        for (entity, _) in &mut self.children {
            if let Entity::Flat(p) = entity {
                if Rc::ptr_eq(p, part) {
                    let copy = fork
                        .get_or_insert_with(|| part.borrow().deep_clone())
                        .clone();
                    *p = copy;
                }
            }
        }
        fork
    }

    /// Every board placement, depth first, with composed placements.
    ///
    /// A board placed twice is listed twice.
    pub fn flat_parts(&self) -> Vec<(FlatPartRef, Transform)> {
        let mut out = Vec::new();
        self.collect_flat_parts(&Transform::identity(), &mut out);
        out
    }

    fn collect_flat_parts(&self, parent: &Transform, out: &mut Vec<(FlatPartRef, Transform)>) {
        for (entity, placement) in &self.children {
            let world = parent.then(placement);
            match entity {
                Entity::Flat(p) => out.push((p.clone(), world)),
                Entity::Assembly(sub) => sub.borrow().collect_flat_parts(&world, out),
                Entity::Solid(_) => {}
            }
        }
    }

    /// Every solid placement, depth first, with composed placements.
    pub fn solids(&self) -> Vec<(Rc<Solid>, Transform)> {
        let mut out = Vec::new();
        self.collect_solids(&Transform::identity(), &mut out);
        out
    }

    fn collect_solids(&self, parent: &Transform, out: &mut Vec<(Rc<Solid>, Transform)>) {
        for (entity, placement) in &self.children {
            let world = parent.then(placement);
            match entity {
                Entity::Solid(s) => out.push((s.clone(), world)),
                Entity::Assembly(sub) => sub.borrow().collect_solids(&world, out),
                Entity::Flat(_) => {}
            }
        }
    }
}
