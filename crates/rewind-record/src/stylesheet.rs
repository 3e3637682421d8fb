//! Stylesheet rule tracker
//!
//! Keeps a shadow copy of every tracked rule container and replays the
//! current tick's raw operations against it. A rule inserted and then
//! deleted at the same resulting address within one tick cancels
//! completely; what survives becomes at most one delta per container per
//! tick. Removed pre-existing rules are reported at their pre-tick
//! positions in descending order, surviving insertions at their
//! post-tick positions in ascending order, so a replayer can apply the
//! lists as given without re-addressing.
//!
//! When the host cannot address nested containers the tracker runs in
//! flat mode: only top-level operations are tracked, with the same
//! cancellation semantics at the flat level.

use std::collections::BTreeMap;

use rewind_dom::{CssRule, RuleOp, RuleOpKind};

use crate::event::{RuleAdd, RuleRemove, StyleRuleDelta};
use crate::registry::MirrorId;

/// Addressing fidelity, resolved once at session start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Nested,
    FlatOnly,
}

#[derive(Debug)]
enum SlotOrigin {
    /// Present before this tick, at the recorded position
    Existing { pre_pos: Vec<u32> },
    /// Inserted during this tick
    Fresh { text: String },
}

#[derive(Debug)]
struct Slot {
    origin: SlotOrigin,
    /// Nested container for group rules (None in flat mode)
    children: Option<Vec<Slot>>,
}

#[derive(Debug, Default)]
struct ContainerState {
    shadow: Vec<Slot>,
    /// Pre-tick positions of removed pre-existing rules
    removed: Vec<Vec<u32>>,
    dirty: bool,
}

/// Per-container transaction log with same-tick cancellation
#[derive(Debug)]
pub(crate) struct StyleRuleTracker {
    mode: AddressingMode,
    containers: BTreeMap<MirrorId, ContainerState>,
}

impl StyleRuleTracker {
    pub fn new(mode: AddressingMode) -> Self {
        Self {
            mode,
            containers: BTreeMap::new(),
        }
    }

    /// Drop all tracked containers (registry reset)
    pub fn reset(&mut self) {
        self.containers.clear();
    }

    /// Start tracking a container from its current live state. Any
    /// operations already observed for it this tick are subsumed by the
    /// adopted state.
    pub fn adopt(&mut self, container: MirrorId, rules: &[CssRule]) {
        let mut state = ContainerState {
            shadow: build_shadow(rules, self.mode),
            removed: Vec::new(),
            dirty: false,
        };
        commit(&mut state.shadow, &mut Vec::new());
        self.containers.insert(container, state);
    }

    /// Apply one raw operation to the container's shadow
    pub fn apply(&mut self, container: MirrorId, op: &RuleOp) {
        if self.mode == AddressingMode::FlatOnly && !op.path.is_empty() {
            tracing::trace!(?container, "nested rule op ignored in flat mode");
            return;
        }
        let Some(state) = self.containers.get_mut(&container) else {
            // Container adopted later this tick (freshly added sheet);
            // its adopted state will subsume this operation.
            tracing::trace!(?container, "rule op for untracked container ignored");
            return;
        };
        let Some(slots) = slots_at_path(&mut state.shadow, &op.path) else {
            tracing::warn!(?container, path = ?op.path, "rule op path unresolvable, dropped");
            return;
        };
        match op.kind {
            RuleOpKind::Insert => {
                if op.index as usize > slots.len() {
                    tracing::warn!(?container, index = op.index, "rule insert out of bounds");
                    return;
                }
                let children = match (self.mode, op.is_group) {
                    (AddressingMode::Nested, true) => Some(Vec::new()),
                    _ => None,
                };
                slots.insert(
                    op.index as usize,
                    Slot {
                        origin: SlotOrigin::Fresh {
                            text: op.text.clone().unwrap_or_default(),
                        },
                        children,
                    },
                );
                state.dirty = true;
            }
            RuleOpKind::Delete => {
                if op.index as usize >= slots.len() {
                    tracing::warn!(?container, index = op.index, "rule delete out of bounds");
                    return;
                }
                let slot = slots.remove(op.index as usize);
                match slot.origin {
                    // Insert + delete of the same rule within one tick:
                    // full cancellation, nothing to report.
                    SlotOrigin::Fresh { .. } => {}
                    SlotOrigin::Existing { pre_pos } => state.removed.push(pre_pos),
                }
                state.dirty = true;
            }
        }
    }

    /// Net deltas for the tick, one per touched container
    pub fn flush(&mut self) -> Vec<StyleRuleDelta> {
        let mut deltas = Vec::new();
        for (&container, state) in self.containers.iter_mut() {
            if !state.dirty {
                continue;
            }
            let mut adds = Vec::new();
            collect_fresh(&state.shadow, &mut Vec::new(), &mut adds);

            let mut removed = std::mem::take(&mut state.removed);
            removed.sort();
            removed.reverse();
            let removes = removed
                .into_iter()
                .map(|pos| {
                    let (index, path) = split_pos(&pos);
                    RuleRemove { index, path }
                })
                .collect::<Vec<_>>();

            commit(&mut state.shadow, &mut Vec::new());
            state.dirty = false;

            if !adds.is_empty() || !removes.is_empty() {
                deltas.push(StyleRuleDelta {
                    container,
                    adds,
                    removes,
                });
            }
        }
        deltas
    }
}

fn build_shadow(rules: &[CssRule], mode: AddressingMode) -> Vec<Slot> {
    rules
        .iter()
        .map(|rule| {
            let children = match (rule, mode) {
                (CssRule::Group { rules, .. }, AddressingMode::Nested) => {
                    Some(build_shadow(rules, mode))
                }
                _ => None,
            };
            Slot {
                origin: SlotOrigin::Existing { pre_pos: Vec::new() },
                children,
            }
        })
        .collect()
}

/// Re-anchor every slot as pre-existing at its current position
fn commit(slots: &mut [Slot], prefix: &mut Vec<u32>) {
    for (i, slot) in slots.iter_mut().enumerate() {
        prefix.push(i as u32);
        slot.origin = SlotOrigin::Existing {
            pre_pos: prefix.clone(),
        };
        if let Some(children) = slot.children.as_mut() {
            commit(children, prefix);
        }
        prefix.pop();
    }
}

/// Surviving fresh slots in pre-order (ascending post-tick positions)
fn collect_fresh(slots: &[Slot], prefix: &mut Vec<u32>, out: &mut Vec<RuleAdd>) {
    for (i, slot) in slots.iter().enumerate() {
        if let SlotOrigin::Fresh { text } = &slot.origin {
            out.push(RuleAdd {
                index: i as u32,
                path: prefix.clone(),
                text: text.clone(),
            });
        }
        if let Some(children) = slot.children.as_ref() {
            prefix.push(i as u32);
            collect_fresh(children, prefix, out);
            prefix.pop();
        }
    }
}

fn slots_at_path<'a>(slots: &'a mut Vec<Slot>, path: &[u32]) -> Option<&'a mut Vec<Slot>> {
    let mut current = slots;
    for &component in path {
        current = current
            .get_mut(component as usize)?
            .children
            .as_mut()?;
    }
    Some(current)
}

fn split_pos(pos: &[u32]) -> (u32, Vec<u32>) {
    match pos.split_last() {
        Some((&index, path)) => (index, path.to_vec()),
        None => (0, Vec::new()),
    }
}
