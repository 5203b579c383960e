//! Sparse control tree overlaid on the scene graph.
//!
//! The gate tree is built once per scene load, after the scene is fully
//! constructed and validated, and is sized by the number of gating and
//! activity control points only — purely structural nodes never grow it.
//! Gates hold non-owning [`NodeId`] references back into the scene arena.

use serde::{Deserialize, Serialize};

use crate::error::{try_grow, BuildError};
use crate::scene::{Control, NodeId, Scene};

/// Handle to a gate in the tree arena.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct GateId(pub u32);

/// Open/closed state of a gate, resolved once per frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum GateState {
    Open,
    Closed,
}

/// One control boundary in the overlay tree.
#[derive(Debug)]
pub struct Gate {
    /// Scene node exposing the gating capability; `None` only for the
    /// synthetic root, which is always open.
    pub(crate) owner: Option<NodeId>,
    pub(crate) state: GateState,
    pub(crate) last_evaluated: Option<f64>,
    /// Time at which this gate was first observed closed, cleared when it
    /// opens again. Drives the idle-release window.
    pub(crate) closed_since: Option<f64>,
    pub(crate) children: Vec<GateId>,
    /// Activity nodes attached to this gate (their nearest enclosing one).
    pub(crate) activities: Vec<NodeId>,
}

impl Gate {
    fn new(owner: Option<NodeId>, state: GateState) -> Self {
        Self {
            owner,
            state,
            last_evaluated: None,
            closed_since: None,
            children: Vec::new(),
            activities: Vec::new(),
        }
    }

    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn children(&self) -> &[GateId] {
        &self.children
    }

    pub fn activities(&self) -> &[NodeId] {
        &self.activities
    }
}

/// Arena-backed gate tree.
#[derive(Debug)]
pub struct GateTree {
    gates: Vec<Gate>,
    root: GateId,
}

impl GateTree {
    /// Build the gate tree with one depth-first walk over the scene.
    ///
    /// Gating nodes allocate a child gate and recursion descends under it;
    /// activity nodes attach to the current gate; structural nodes pass
    /// through without growing the tree. Any allocation failure aborts
    /// construction; the partially built tree is dropped by the caller.
    pub fn build(scene: &Scene) -> Result<Self, BuildError> {
        let root_gate = Gate::new(None, GateState::Open);
        let mut tree = Self {
            gates: vec![root_gate],
            root: GateId(0),
        };
        tree.walk(scene, scene.root(), GateId(0))?;
        log::debug!(
            "gate tree built: {} gate(s) over {} scene node(s)",
            tree.gates.len(),
            scene.len()
        );
        Ok(tree)
    }

    pub fn root(&self) -> GateId {
        self.root
    }

    /// Number of gates, synthetic root included.
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    pub fn gate(&self, id: GateId) -> &Gate {
        &self.gates[id.0 as usize]
    }

    pub(crate) fn gate_mut(&mut self, id: GateId) -> &mut Gate {
        &mut self.gates[id.0 as usize]
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Gate> {
        self.gates.iter_mut()
    }

    fn alloc_gate(&mut self, parent: GateId, owner: NodeId) -> Result<GateId, BuildError> {
        try_grow(&mut self.gates, 1, "gate arena")?;
        let id = GateId(self.gates.len() as u32);
        self.gates.push(Gate::new(Some(owner), GateState::Closed));
        let parent = self.gate_mut(parent);
        try_grow(&mut parent.children, 1, "gate children")?;
        parent.children.push(id);
        Ok(id)
    }

    fn walk(&mut self, scene: &Scene, node_id: NodeId, current: GateId) -> Result<(), BuildError> {
        let node = scene.node(node_id);
        let next_gate = match node.control {
            Control::TimeGate(_) | Control::ToggleGate { .. } => {
                self.alloc_gate(current, node_id)?
            }
            Control::Activity(_) => {
                let gate = self.gate_mut(current);
                try_grow(&mut gate.activities, 1, "gate activities")?;
                gate.activities.push(node_id);
                current
            }
            Control::Structural => current,
        };
        for &child in &node.children {
            self.walk(scene, child, next_gate)?;
        }
        Ok(())
    }
}
