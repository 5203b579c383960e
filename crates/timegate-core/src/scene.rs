//! Scene-graph facade consumed by the scheduler.
//!
//! The real scene graph lives outside this crate; the scheduler only needs
//! a compact arena describing where the gating and resource-lifecycle
//! control points sit. Nodes are held in a dense `Vec` and referenced by
//! opaque [`NodeId`] handles, so the gate tree can keep non-owning indices
//! back into the scene across rebuilds.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, ResourceError};
use crate::timeline::Timeline;

/// Handle to a node in the scene arena.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Resource state of an activity node, mutated only by the evaluator.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ResourceState {
    Unloaded,
    Loaded,
}

/// Resource lifecycle hooks exposed by an activity node.
///
/// `prefetch` allocates/uploads the node's GPU-backed resources ahead of
/// need; `release` frees them and must be safe to call on an
/// already-released node.
pub trait ResourceHooks {
    fn prefetch(&mut self) -> Result<(), ResourceError>;
    fn release(&mut self) -> Result<(), ResourceError>;
}

/// An activity node's hooks plus the scheduler-owned resource state.
pub struct ActivitySlot {
    hooks: Box<dyn ResourceHooks>,
    state: ResourceState,
}

impl ActivitySlot {
    fn new(hooks: Box<dyn ResourceHooks>) -> Self {
        Self {
            hooks,
            state: ResourceState::Unloaded,
        }
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub(crate) fn prefetch(&mut self) -> Result<(), ResourceError> {
        self.hooks.prefetch()?;
        self.state = ResourceState::Loaded;
        Ok(())
    }

    pub(crate) fn release(&mut self) -> Result<(), ResourceError> {
        self.hooks.release()?;
        self.state = ResourceState::Unloaded;
        Ok(())
    }
}

impl fmt::Debug for ActivitySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivitySlot")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Closed set of per-node control capabilities, resolved once when the
/// scene is described and never re-probed during playback.
#[derive(Debug)]
pub enum Control {
    /// Plain structural node (group, pass-through transform); does not
    /// appear in the gate tree.
    Structural,
    /// Time-range-controlled gate: open wherever the timeline is active.
    TimeGate(Timeline),
    /// User/live-toggle-controlled gate.
    ToggleGate { enabled: bool },
    /// Owner of GPU-backed resources with prefetch/release hooks.
    Activity(ActivitySlot),
}

#[derive(Debug)]
pub struct SceneNode {
    pub name: String,
    pub(crate) control: Control,
    pub(crate) children: Vec<NodeId>,
    attached: bool,
}

/// Dense single-owner scene arena.
#[derive(Debug)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    root: NodeId,
}

impl Scene {
    /// Create a scene with a structural root node.
    pub fn new(root_name: &str) -> Self {
        let root = SceneNode {
            name: root_name.to_string(),
            control: Control::Structural,
            children: Vec::new(),
            attached: true,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn add_node(&mut self, name: &str, control: Control) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SceneNode {
            name: name.to_string(),
            control,
            children: Vec::new(),
            attached: false,
        });
        id
    }

    pub fn add_structural(&mut self, name: &str) -> NodeId {
        self.add_node(name, Control::Structural)
    }

    pub fn add_time_gate(&mut self, name: &str, timeline: Timeline) -> NodeId {
        self.add_node(name, Control::TimeGate(timeline))
    }

    pub fn add_toggle_gate(&mut self, name: &str, enabled: bool) -> NodeId {
        self.add_node(name, Control::ToggleGate { enabled })
    }

    pub fn add_activity(&mut self, name: &str, hooks: Box<dyn ResourceHooks>) -> NodeId {
        self.add_node(name, Control::Activity(ActivitySlot::new(hooks)))
    }

    /// Attach `child` under `parent`. The scene is a single-owner tree:
    /// a node can be attached once, never to itself, and never above one
    /// of its own ancestors.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), BuildError> {
        if parent == child {
            return Err(BuildError::InvalidConfiguration(format!(
                "cannot attach node {child:?} to itself"
            )));
        }
        let child_node = self.try_node(child)?;
        if child_node.attached {
            return Err(BuildError::InvalidConfiguration(format!(
                "node {child:?} ({}) already has a parent",
                child_node.name
            )));
        }
        if self.is_reachable(child, parent) {
            return Err(BuildError::InvalidConfiguration(format!(
                "attaching {child:?} under {parent:?} would create a cycle"
            )));
        }
        self.try_node(parent)?;
        self.nodes[child.0 as usize].attached = true;
        self.nodes[parent.0 as usize].children.push(child);
        Ok(())
    }

    /// Flip a live toggle gate. Takes effect at the next evaluation pass.
    pub fn set_toggle(&mut self, node: NodeId, enabled: bool) -> Result<(), BuildError> {
        match &mut self.node_mut(node).control {
            Control::ToggleGate { enabled: e } => {
                *e = enabled;
                Ok(())
            }
            _ => Err(BuildError::InvalidConfiguration(format!(
                "node {node:?} is not a toggle gate"
            ))),
        }
    }

    /// Resource state of an activity node, `None` for other node kinds.
    pub fn resource_state(&self, node: NodeId) -> Option<ResourceState> {
        match &self.node(node).control {
            Control::Activity(slot) => Some(slot.state()),
            _ => None,
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0 as usize]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut SceneNode {
        &mut self.nodes[id.0 as usize]
    }

    fn try_node(&self, id: NodeId) -> Result<&SceneNode, BuildError> {
        self.nodes.get(id.0 as usize).ok_or_else(|| {
            BuildError::InvalidConfiguration(format!("unknown node {id:?}"))
        })
    }

    pub(crate) fn activity_slot_mut(&mut self, id: NodeId) -> Option<&mut ActivitySlot> {
        match &mut self.node_mut(id).control {
            Control::Activity(slot) => Some(slot),
            _ => None,
        }
    }

    fn is_reachable(&self, from: NodeId, target: NodeId) -> bool {
        if from == target {
            return true;
        }
        self.node(from)
            .children
            .iter()
            .any(|&c| self.is_reachable(c, target))
    }
}
