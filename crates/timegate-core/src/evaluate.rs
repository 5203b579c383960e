//! Per-frame gate runtime evaluation.
//!
//! The evaluator walks the gate tree once per frame at playback time `t`,
//! resolving each gate strictly before its children, and drives the
//! prefetch/release lifecycle of every activity node based on the resolved
//! state. Evaluation is single-threaded and idempotent within a frame: a
//! gate already resolved at `t` (for example reached twice via two render
//! passes sharing a sub-scene) is skipped along with its whole subtree.

use crate::config::Config;
use crate::error::{BuildError, EvalError};
use crate::gate::{GateId, GateState, GateTree};
use crate::scene::{Control, NodeId, Scene};

/// Effective liveness of a gate's subtree for the frame being evaluated.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Liveness {
    /// Open now: resources must be loaded, subtree is rendered.
    Active,
    /// Closed, but opening within the prefetch window: resources are
    /// loaded ahead of need, subtree is not rendered yet.
    Opening,
    /// Closed with no imminent activation.
    Idle,
}

impl Liveness {
    /// Children can never be more live than their parent: a closed parent
    /// forces the subtree idle, and a merely-opening parent caps children
    /// at opening.
    fn capped_by(self, parent: Liveness) -> Liveness {
        match parent {
            Liveness::Active => self,
            Liveness::Opening if self == Liveness::Active => Liveness::Opening,
            Liveness::Opening => self,
            Liveness::Idle => Liveness::Idle,
        }
    }
}

/// Gate runtime evaluator; owns the timing configuration.
#[derive(Clone, Debug)]
pub struct Evaluator {
    cfg: Config,
}

impl Evaluator {
    pub fn new(cfg: Config) -> Result<Self, BuildError> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Evaluate the whole tree at time `t`, once per frame, before draw.
    ///
    /// A failing resource hook aborts the frame; the failing gate's
    /// committed state and the affected node's resource state are left
    /// unchanged so the frame can be retried.
    pub fn evaluate(
        &self,
        tree: &mut GateTree,
        scene: &mut Scene,
        t: f64,
    ) -> Result<(), EvalError> {
        let root = tree.root();
        if tree.gate(root).last_evaluated == Some(t) {
            return Ok(());
        }

        // Root activities are ungated and therefore always live.
        for i in 0..tree.gate(root).activities().len() {
            let node = tree.gate(root).activities()[i];
            self.apply_policy(scene, node, Liveness::Active, None, t)?;
        }
        for i in 0..tree.gate(root).children().len() {
            let child = tree.gate(root).children()[i];
            self.eval_gate(tree, scene, child, Liveness::Active, t)?;
        }

        tree.gate_mut(root).last_evaluated = Some(t);
        Ok(())
    }

    fn eval_gate(
        &self,
        tree: &mut GateTree,
        scene: &mut Scene,
        gate_id: GateId,
        parent: Liveness,
        t: f64,
    ) -> Result<(), EvalError> {
        if tree.gate(gate_id).last_evaluated == Some(t) {
            return Ok(());
        }

        let own = self.decide(scene, tree.gate(gate_id).owner(), t);
        let effective = own.capped_by(parent);

        let closed_since = if effective == Liveness::Active {
            None
        } else {
            // The idle clock starts the first frame the gate is observed
            // closed and keeps running until it opens again.
            tree.gate(gate_id).closed_since.or(Some(t))
        };

        for i in 0..tree.gate(gate_id).activities().len() {
            let node = tree.gate(gate_id).activities()[i];
            self.apply_policy(scene, node, effective, closed_since, t)?;
        }

        // Commit only after every lifecycle call succeeded, so a failed
        // frame re-resolves this gate from its previous state.
        let gate = tree.gate_mut(gate_id);
        let new_state = if effective == Liveness::Active {
            GateState::Open
        } else {
            GateState::Closed
        };
        if gate.state != new_state {
            log::debug!("gate {gate_id:?} -> {new_state:?} at t={t}");
        }
        gate.state = new_state;
        gate.closed_since = closed_since;
        gate.last_evaluated = Some(t);

        for i in 0..tree.gate(gate_id).children().len() {
            let child = tree.gate(gate_id).children()[i];
            self.eval_gate(tree, scene, child, effective, t)?;
        }
        Ok(())
    }

    /// Resolve a gate owner's own open/closed decision for time `t`.
    fn decide(&self, scene: &Scene, owner: Option<NodeId>, t: f64) -> Liveness {
        let Some(owner) = owner else {
            return Liveness::Active;
        };
        match &scene.node(owner).control {
            Control::TimeGate(timeline) => {
                if timeline.is_active_at(t) {
                    Liveness::Active
                } else {
                    match timeline.next_active_start(t) {
                        Some(start) if start - t <= self.cfg.prefetch_time => Liveness::Opening,
                        _ => Liveness::Idle,
                    }
                }
            }
            Control::ToggleGate { enabled } => {
                // Live toggles have no timeline to probe, so no lookahead.
                if *enabled {
                    Liveness::Active
                } else {
                    Liveness::Idle
                }
            }
            // The builder only creates gates for gating controls.
            Control::Structural | Control::Activity(_) => {
                debug_assert!(false, "gate owned by a non-gating node");
                Liveness::Active
            }
        }
    }

    /// Apply the resource policy to one activity node under a gate whose
    /// liveness for `t` is known.
    fn apply_policy(
        &self,
        scene: &mut Scene,
        node: NodeId,
        liveness: Liveness,
        closed_since: Option<f64>,
        t: f64,
    ) -> Result<(), EvalError> {
        let Some(slot) = scene.activity_slot_mut(node) else {
            return Ok(());
        };
        match liveness {
            Liveness::Active | Liveness::Opening => {
                if slot.state() == crate::scene::ResourceState::Unloaded {
                    slot.prefetch().map_err(|source| EvalError::Resource {
                        node,
                        op: "prefetch",
                        source,
                    })?;
                    log::debug!("prefetched node {node:?} at t={t}");
                }
            }
            Liveness::Idle => {
                let idle_for = closed_since.map_or(0.0, |since| t - since);
                if slot.state() == crate::scene::ResourceState::Loaded
                    && idle_for >= self.cfg.max_idle_time
                {
                    slot.release().map_err(|source| EvalError::Resource {
                        node,
                        op: "release",
                        source,
                    })?;
                    log::debug!("released node {node:?} after {idle_for}s idle");
                }
                // Within the idle grace period the resource state is left
                // untouched; the subtree is simply not rendered.
            }
        }
        Ok(())
    }
}

/// Force a release pass over every still-loaded activity node and reset
/// all per-gate runtime state.
///
/// Must run before the tree and scene are torn down or rebuilt, so no
/// GPU-resident resource leaks across a scene replacement. Every slot is
/// visited even if one fails; the first failure is reported.
pub fn release_all(tree: &mut GateTree, scene: &mut Scene) -> Result<(), EvalError> {
    let mut first_err = None;

    let activities: Vec<NodeId> = {
        let mut nodes = Vec::new();
        for gate in tree.iter_mut() {
            nodes.extend_from_slice(gate.activities());
            gate.last_evaluated = None;
            gate.closed_since = None;
            gate.state = if gate.owner().is_none() {
                GateState::Open
            } else {
                GateState::Closed
            };
        }
        nodes
    };

    for node in activities {
        let Some(slot) = scene.activity_slot_mut(node) else {
            continue;
        };
        if slot.state() == crate::scene::ResourceState::Loaded {
            if let Err(source) = slot.release() {
                log::warn!("release failed for node {node:?} during teardown: {source}");
                first_err.get_or_insert(EvalError::Resource {
                    node,
                    op: "release",
                    source,
                });
            }
        }
    }

    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
