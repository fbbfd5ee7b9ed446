// SPDX-License-Identifier: MIT OR Apache-2.0
//! Selection, marquee selection, dragging and stacking order.
//!
//! Selection is per graph and holds nodes and routers. Modifier flags follow
//! the usual editor conventions: `additive` toggles (ctrl), `range_add` adds
//! (shift), `subtractive` removes (alt); plain clicks replace the selection.

use crate::config::SelectionMode;
use crate::error::{GraphError, Result};
use crate::events::{GraphEvent, SelectionChange};
use crate::geometry::{Point, Rect};
use crate::history::Command;
use crate::id::{GraphId, SelectableId};
use crate::manager::{GraphManager, InteractionMode};
use indexmap::{IndexMap, IndexSet};

type ZValues = Vec<(SelectableId, i32)>;

/// Membership of one entity after a marquee update.
///
/// Entities the marquee misses keep their original membership when a
/// modifier is held and are dropped on a plain drag. Hit entities are
/// toggled (ctrl), added (shift or plain) or removed (alt).
pub fn marquee_membership(hit: bool, was_selected: bool, additive: bool, range_add: bool, subtractive: bool) -> bool {
    let plain = !additive && !range_add && !subtractive;
    if !hit {
        return was_selected && !plain;
    }
    if additive {
        !was_selected
    } else if range_add {
        true
    } else {
        !subtractive
    }
}

fn wrong_mode(expected: &'static str, active: &InteractionMode) -> GraphError {
    GraphError::WrongMode {
        expected,
        active: active.name(),
    }
}

impl GraphManager {
    /// Add or remove one entity, emitting a change event.
    ///
    /// Returns false if membership did not change.
    pub(crate) fn set_selected(&mut self, graph: GraphId, id: SelectableId, selected: bool, record: bool) -> Result<bool> {
        let g = self.registry.require_graph_mut(graph)?;
        let changed = if selected {
            g.selection.insert(id)
        } else {
            g.selection.shift_remove(&id)
        };
        if !changed {
            return Ok(false);
        }

        self.registry.set_selected_flag(id, selected);
        self.emit(GraphEvent::SelectionChanged {
            graph,
            changed: vec![id],
            change: if selected {
                SelectionChange::Added
            } else {
                SelectionChange::Removed
            },
        });
        if record {
            self.record(graph, Command::Selection { target: id, selected });
        }
        Ok(true)
    }

    /// Click-select an entity.
    ///
    /// Precedence is `additive`, then `range_add`, then `subtractive`, then
    /// a plain click. Newly selected entities move to the front. Returns
    /// true if anything changed.
    pub fn try_select(&mut self, target: SelectableId, additive: bool, range_add: bool, subtractive: bool) -> Result<bool> {
        let graph = self
            .registry
            .graph_of_selectable(target)
            .ok_or(GraphError::UnknownSelectable(target))?;

        self.with_transaction(graph, "Select", |manager| {
            let was_selected = manager.registry.require_graph(graph)?.selection.contains(&target);
            let mut changed = false;

            let select = if additive {
                !was_selected
            } else if range_add {
                true
            } else if subtractive {
                false
            } else {
                let others: Vec<SelectableId> = manager
                    .registry
                    .require_graph(graph)?
                    .selection
                    .iter()
                    .copied()
                    .filter(|id| *id != target)
                    .collect();
                for other in others {
                    changed |= manager.set_selected(graph, other, false, true)?;
                }
                true
            };

            if manager.set_selected(graph, target, select, true)? {
                changed = true;
                if select {
                    manager.move_to_front(target)?;
                }
            }
            Ok(changed)
        })
    }

    /// Select every node and router; returns how many were added
    pub fn select_all(&mut self, graph: GraphId) -> Result<usize> {
        let all: Vec<SelectableId> = self.registry.require_graph(graph)?.selectables().collect();
        self.with_transaction(graph, "Select all", |manager| {
            let mut added = 0;
            for id in all {
                if manager.set_selected(graph, id, true, true)? {
                    added += 1;
                }
            }
            Ok(added)
        })
    }

    /// Clear the selection; returns how many were removed
    pub fn deselect_all(&mut self, graph: GraphId) -> Result<usize> {
        let selected: Vec<SelectableId> = self.registry.require_graph(graph)?.selection.iter().copied().collect();
        self.with_transaction(graph, "Deselect all", |manager| {
            let mut removed = 0;
            for id in selected {
                if manager.set_selected(graph, id, false, true)? {
                    removed += 1;
                }
            }
            Ok(removed)
        })
    }

    /// Selected entities of a graph, in selection order
    pub fn selected(&self, graph: GraphId) -> Vec<SelectableId> {
        self.registry
            .graph(graph)
            .map(|g| g.selection.iter().copied().collect())
            .unwrap_or_default()
    }

    fn restore_selection(&mut self, graph: GraphId, snapshot: &IndexSet<SelectableId>) -> Result<()> {
        let all: Vec<SelectableId> = self.registry.require_graph(graph)?.selectables().collect();
        for id in all {
            self.set_selected(graph, id, snapshot.contains(&id), false)?;
        }
        Ok(())
    }

    // Marquee

    /// Start a marquee at `start`
    pub fn begin_drag_selection(&mut self, graph: GraphId, start: Point) -> Result<()> {
        self.ensure_idle("marquee selection")?;
        let original = self.registry.require_graph(graph)?.selection.clone();
        self.mode = InteractionMode::MarqueeSelecting { graph, start, original };
        Ok(())
    }

    /// Move the marquee corner to `end` and update membership.
    ///
    /// Membership is always derived from the selection at the start of the
    /// gesture, so shrinking the marquee gives entities back. Stacking order
    /// is left alone.
    pub fn update_drag_selection(&mut self, end: Point, additive: bool, range_add: bool, subtractive: bool) -> Result<()> {
        let InteractionMode::MarqueeSelecting { graph, start, original } = &self.mode else {
            return Err(wrong_mode("marquee selection", &self.mode));
        };
        let (graph, start, original) = (*graph, *start, original.clone());

        let marquee = Rect::from_corners(start, end);
        let policy = self.config().selection_mode;
        let candidates: Vec<SelectableId> = self.registry.require_graph(graph)?.selectables().collect();

        for id in candidates {
            let Some(bounds) = self.registry.bounds_of(id) else {
                continue;
            };
            let hit = match policy {
                SelectionMode::Overlap => marquee.intersects(&bounds),
                SelectionMode::Include => marquee.contains_rect(&bounds),
            };
            let keep = marquee_membership(hit, original.contains(&id), additive, range_add, subtractive);
            self.set_selected(graph, id, keep, false)?;
        }
        Ok(())
    }

    /// Finish the marquee.
    ///
    /// Cancelling restores the original selection. Otherwise the net change
    /// is recorded as one undoable step. Returns true if anything changed.
    pub fn end_drag_selection(&mut self, cancel: bool) -> Result<bool> {
        let (graph, original) = match std::mem::take(&mut self.mode) {
            InteractionMode::MarqueeSelecting { graph, original, .. } => (graph, original),
            other => {
                let error = wrong_mode("marquee selection", &other);
                self.mode = other;
                return Err(error);
            }
        };

        if cancel {
            self.restore_selection(graph, &original)?;
            return Ok(false);
        }

        let current = self.registry.require_graph(graph)?.selection.clone();
        let removed: Vec<SelectableId> = original.iter().copied().filter(|id| !current.contains(id)).collect();
        let added: Vec<SelectableId> = current.iter().copied().filter(|id| !original.contains(id)).collect();
        if removed.is_empty() && added.is_empty() {
            return Ok(false);
        }

        self.with_transaction(graph, "Marquee select", |manager| {
            for target in removed {
                manager.record(graph, Command::Selection { target, selected: false });
            }
            for target in added {
                manager.record(graph, Command::Selection { target, selected: true });
            }
            Ok(true)
        })
    }

    // Dragging

    /// Start moving the selection; returns how many entities are dragged
    pub fn begin_drag_selectable(&mut self, graph: GraphId, origin: Point) -> Result<usize> {
        self.ensure_idle("dragging")?;
        let start_positions: IndexMap<SelectableId, Point> = self
            .registry
            .require_graph(graph)?
            .selection
            .iter()
            .filter_map(|id| Some((*id, self.registry.position_of(*id)?)))
            .collect();
        let count = start_positions.len();
        self.mode = InteractionMode::DraggingSelectables {
            graph,
            origin,
            start_positions,
        };
        Ok(count)
    }

    /// Move every dragged entity by the pointer's offset from the origin
    pub fn drag_selectable(&mut self, pointer: Point) -> Result<()> {
        let InteractionMode::DraggingSelectables {
            origin, start_positions, ..
        } = &self.mode
        else {
            return Err(wrong_mode("dragging", &self.mode));
        };
        let offset = pointer - *origin;
        let moves: Vec<(SelectableId, Point)> = start_positions.iter().map(|(id, p)| (*id, *p + offset)).collect();

        for (id, position) in moves {
            if self.registry.contains_selectable(id) {
                self.registry.set_position(id, position)?;
            }
        }
        Ok(())
    }

    /// Finish moving.
    ///
    /// Cancelling puts everything back. Otherwise the moves are recorded as
    /// one undoable step. Returns true if anything moved.
    pub fn end_drag_selectable(&mut self, cancel: bool) -> Result<bool> {
        let (graph, start_positions) = match std::mem::take(&mut self.mode) {
            InteractionMode::DraggingSelectables {
                graph, start_positions, ..
            } => (graph, start_positions),
            other => {
                let error = wrong_mode("dragging", &other);
                self.mode = other;
                return Err(error);
            }
        };

        if cancel {
            self.restore_positions(&start_positions)?;
            return Ok(false);
        }

        let moved: Vec<(SelectableId, Point, Point)> = start_positions
            .iter()
            .filter_map(|(id, before)| {
                let after = self.registry.position_of(*id)?;
                (after != *before).then_some((*id, *before, after))
            })
            .collect();
        if moved.is_empty() {
            return Ok(false);
        }

        self.with_transaction(graph, "Move", |manager| {
            for (target, before, after) in moved {
                manager.record(graph, Command::Move { target, before, after });
            }
            Ok(true)
        })
    }

    fn restore_positions(&mut self, positions: &IndexMap<SelectableId, Point>) -> Result<()> {
        for (id, position) in positions {
            if self.registry.contains_selectable(*id) {
                self.registry.set_position(*id, *position)?;
            }
        }
        Ok(())
    }

    // Stacking order

    /// Put an entity above every other node and router of its graph.
    ///
    /// Z values are renumbered densely from zero, keeping relative order.
    /// Returns false if nothing changed.
    pub fn move_to_front(&mut self, target: SelectableId) -> Result<bool> {
        let graph = self
            .registry
            .graph_of_selectable(target)
            .ok_or(GraphError::UnknownSelectable(target))?;
        let Some((before, after)) = self.dense_z_order(graph, Some(target))? else {
            return Ok(false);
        };

        self.with_transaction(graph, "Bring to front", |manager| {
            for (id, z) in &after {
                manager.registry.set_z(*id, *z);
            }
            manager.record(graph, Command::ZOrder { before, after });
            Ok(true)
        })
    }

    /// Close the gaps a removal or a load leaves in a graph's z-order.
    ///
    /// Recorded as a `ZOrder` command when a transaction is open.
    pub(crate) fn compact_z_order(&mut self, graph: GraphId) -> Result<()> {
        let Some((before, after)) = self.dense_z_order(graph, None)? else {
            return Ok(());
        };
        for (id, z) in &after {
            self.registry.set_z(*id, *z);
        }
        if self.is_recording(graph) {
            self.record(graph, Command::ZOrder { before, after });
        }
        Ok(())
    }

    /// Current and dense z values of a graph, `raised` on top.
    ///
    /// `None` if the z-order is already dense in that order.
    fn dense_z_order(&self, graph: GraphId, raised: Option<SelectableId>) -> Result<Option<(ZValues, ZValues)>> {
        let before: ZValues = self
            .registry
            .require_graph(graph)?
            .selectables()
            .filter_map(|id| Some((id, self.registry.z_of(id)?)))
            .collect();

        let mut order = before.clone();
        order.sort_by_key(|(id, z)| (Some(*id) == raised, *z));
        let after: ZValues = order
            .iter()
            .enumerate()
            .map(|(rank, (id, _))| (*id, i32::try_from(rank).unwrap_or(i32::MAX)))
            .collect();

        if after.iter().all(|(id, z)| self.registry.z_of(*id) == Some(*z)) {
            return Ok(None);
        }
        Ok(Some((before, after)))
    }

    // Bulk edits

    /// Destroy every selected node and router as one undoable step.
    ///
    /// Entities already removed by an earlier cascade are skipped. Returns
    /// how many were destroyed.
    pub fn destroy_selected(&mut self, graph: GraphId) -> Result<usize> {
        let selection: Vec<SelectableId> = self.registry.require_graph(graph)?.selection.iter().copied().collect();
        if selection.is_empty() {
            return Ok(0);
        }
        let (nodes, routers): (Vec<SelectableId>, Vec<SelectableId>) = selection
            .into_iter()
            .partition(|id| matches!(id, SelectableId::Node(_)));

        self.with_transaction(graph, "Delete", |manager| {
            let mut destroyed = 0;
            for id in nodes.into_iter().chain(routers) {
                let gone = match id {
                    SelectableId::Node(node) => manager.destroy_node(node)?,
                    SelectableId::Router(router) => manager.destroy_router(router)?,
                };
                if gone {
                    destroyed += 1;
                }
            }
            tracing::debug!("Deleted {destroyed} selected entities");
            Ok(destroyed)
        })
    }

    // Panning

    /// Enter panning mode
    pub fn begin_panning(&mut self, graph: GraphId) -> Result<()> {
        self.ensure_idle("panning")?;
        self.registry.require_graph(graph)?;
        self.mode = InteractionMode::Panning { graph };
        Ok(())
    }

    /// Leave panning mode
    pub fn end_panning(&mut self) -> Result<()> {
        match self.mode {
            InteractionMode::Panning { .. } => {
                self.mode = InteractionMode::Idle;
                Ok(())
            }
            _ => Err(wrong_mode("panning", &self.mode)),
        }
    }

    /// Abort the active gesture, undoing its live effects
    pub fn cancel_interaction(&mut self) -> Result<()> {
        match std::mem::take(&mut self.mode) {
            InteractionMode::Idle | InteractionMode::Panning { .. } => Ok(()),
            InteractionMode::Connecting { connector, .. } => self.discard_connector(connector),
            InteractionMode::DraggingSelectables { start_positions, .. } => self.restore_positions(&start_positions),
            InteractionMode::MarqueeSelecting { graph, original, .. } => self.restore_selection(graph, &original),
        }
    }
}
