//! Change events - what one committed update scope did to the model.
//!
//! Mutations inside an update scope are recorded as net per-item flags:
//!
//! ```text
//! previous   + new       = net
//! (none)     + X         = X
//! Added      + Modified  = Added
//! Added      + Removed   = (nothing)
//! Modified   + Removed   = Removed
//! Removed    + Added     = Modified
//! ```
//!
//! On commit the flags are frozen into an immutable `ModelChangeEvent` that
//! every listener receives, in registration order.

use crate::model::Model;
use crate::track_model::Edge;
use crate::trackable::TrackableObject;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use trackmate_env::{EdgeId, ObjectId, TrackId};
use uuid::Uuid;

/// Per-item change flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeFlag {
    Added,
    Removed,
    Modified,
}

impl ChangeFlag {
    /// Net effect of `next` applied after `previous`.
    pub fn combine(previous: Option<ChangeFlag>, next: ChangeFlag) -> Option<ChangeFlag> {
        match (previous, next) {
            (None, flag) => Some(flag),
            (Some(ChangeFlag::Added), ChangeFlag::Removed) => None,
            (Some(ChangeFlag::Added), _) => Some(ChangeFlag::Added),
            (Some(ChangeFlag::Removed), ChangeFlag::Added) => Some(ChangeFlag::Modified),
            (Some(ChangeFlag::Removed), _) => Some(ChangeFlag::Removed),
            (Some(ChangeFlag::Modified), ChangeFlag::Removed) => Some(ChangeFlag::Removed),
            (Some(ChangeFlag::Modified), _) => Some(ChangeFlag::Modified),
        }
    }
}

/// What kind of commit produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelEventKind {
    /// Spots, edges or spot features changed
    ModelModified,

    /// Only track visibility changed
    TracksVisibilityChanged,

    /// The model was emptied
    ModelCleared,
}

/// An edge as it was when the change was recorded, with its flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeChange {
    pub edge: Edge,
    pub flag: ChangeFlag,
}

// ============================================================================
// EVENT
// ============================================================================

/// Immutable description of one committed update scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelChangeEvent {
    kind: ModelEventKind,

    spots: BTreeMap<ObjectId, ChangeFlag>,

    edges: BTreeMap<EdgeId, EdgeChange>,

    /// Live tracks touching any change (post-commit ids)
    tracks_updated: BTreeSet<TrackId>,

    /// Tracks that vanished in this commit
    tracks_removed: BTreeSet<TrackId>,

    visibility_changed: BTreeSet<TrackId>,
}

impl ModelChangeEvent {
    pub fn kind(&self) -> ModelEventKind {
        self.kind
    }

    /// Spots with any flag, in id order.
    pub fn spots(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.spots.keys().copied()
    }

    pub fn spot_flag(&self, spot: ObjectId) -> Option<ChangeFlag> {
        self.spots.get(&spot).copied()
    }

    /// Edges with any flag, in id order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.keys().copied()
    }

    pub fn edge_flag(&self, edge: EdgeId) -> Option<ChangeFlag> {
        self.edges.get(&edge).map(|c| c.flag)
    }

    /// The edge's endpoints and weight as of the change (available for
    /// removed edges too).
    pub fn edge(&self, edge: EdgeId) -> Option<&Edge> {
        self.edges.get(&edge).map(|c| &c.edge)
    }

    /// Spots that still exist and need their features recomputed.
    pub fn spots_to_update(&self) -> Vec<ObjectId> {
        self.spots
            .iter()
            .filter(|(_, flag)| **flag != ChangeFlag::Removed)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Edges that still exist and need their features recomputed.
    pub fn edges_to_update(&self) -> Vec<EdgeId> {
        self.edges
            .iter()
            .filter(|(_, change)| change.flag != ChangeFlag::Removed)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn spots_with_flag(&self, flag: ChangeFlag) -> Vec<ObjectId> {
        self.spots
            .iter()
            .filter(|(_, f)| **f == flag)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn edges_with_flag(&self, flag: ChangeFlag) -> Vec<EdgeId> {
        self.edges
            .iter()
            .filter(|(_, c)| c.flag == flag)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn tracks_updated(&self) -> &BTreeSet<TrackId> {
        &self.tracks_updated
    }

    pub fn tracks_removed(&self) -> &BTreeSet<TrackId> {
        &self.tracks_removed
    }

    pub fn visibility_changed(&self) -> &BTreeSet<TrackId> {
        &self.visibility_changed
    }

    pub fn spot_count(&self) -> usize {
        self.spots.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

// ============================================================================
// PENDING CHANGES (inside an open scope)
// ============================================================================

/// Net changes accumulated by an open update scope.
#[derive(Debug, Clone, Default)]
pub(crate) struct PendingChanges {
    spots: HashMap<ObjectId, ChangeFlag>,
    edges: HashMap<EdgeId, EdgeChange>,
    structure_changed: bool,
    visibility_changed: BTreeSet<TrackId>,
    cleared: bool,
}

impl PendingChanges {
    fn record_spot(&mut self, spot: ObjectId, flag: ChangeFlag) {
        match ChangeFlag::combine(self.spots.get(&spot).copied(), flag) {
            Some(net) => {
                self.spots.insert(spot, net);
            }
            None => {
                self.spots.remove(&spot);
            }
        }
    }

    fn record_edge(&mut self, edge: Edge, flag: ChangeFlag) {
        let previous = self.edges.get(&edge.id).map(|c| c.flag);
        match ChangeFlag::combine(previous, flag) {
            Some(net) => {
                self.edges.insert(edge.id, EdgeChange { edge, flag: net });
            }
            None => {
                self.edges.remove(&edge.id);
            }
        }
    }

    pub(crate) fn spot_added(&mut self, spot: ObjectId) {
        self.record_spot(spot, ChangeFlag::Added);
    }

    pub(crate) fn spot_removed(&mut self, spot: ObjectId) {
        self.record_spot(spot, ChangeFlag::Removed);
    }

    pub(crate) fn spot_modified(&mut self, spot: ObjectId) {
        self.record_spot(spot, ChangeFlag::Modified);
    }

    pub(crate) fn edge_added(&mut self, edge: Edge) {
        self.structure_changed = true;
        self.record_edge(edge, ChangeFlag::Added);
    }

    pub(crate) fn edge_removed(&mut self, edge: Edge) {
        self.structure_changed = true;
        self.record_edge(edge, ChangeFlag::Removed);
    }

    pub(crate) fn edge_modified(&mut self, edge: Edge) {
        self.record_edge(edge, ChangeFlag::Modified);
    }

    pub(crate) fn visibility_changed(&mut self, track: TrackId) {
        self.visibility_changed.insert(track);
    }

    pub(crate) fn cleared(&mut self) {
        self.cleared = true;
        self.structure_changed = true;
    }

    pub(crate) fn structure_changed(&self) -> bool {
        self.structure_changed
    }

    /// True when the net change set is empty. Edges added and removed again
    /// in the same scope leave the graph as it was, so `structure_changed`
    /// alone does not count.
    pub(crate) fn is_empty(&self) -> bool {
        self.spots.is_empty()
            && self.edges.is_empty()
            && self.visibility_changed.is_empty()
            && !self.cleared
    }

    /// Freezes the pending changes into an event.
    ///
    /// `incident` lists the current edges of a spot; edges touching a
    /// modified spot are flagged `Modified` unless they already carry a flag.
    /// `spot_track` and `edge_track` give the post-commit track of an item.
    pub(crate) fn into_event<I, S, E>(
        self,
        incident: I,
        spot_track: S,
        edge_track: E,
        tracks_removed: BTreeSet<TrackId>,
    ) -> ModelChangeEvent
    where
        I: Fn(ObjectId) -> Vec<Edge>,
        S: Fn(ObjectId) -> Option<TrackId>,
        E: Fn(EdgeId) -> Option<TrackId>,
    {
        let spots: BTreeMap<ObjectId, ChangeFlag> = self.spots.into_iter().collect();
        let mut edges: BTreeMap<EdgeId, EdgeChange> = self.edges.into_iter().collect();

        for (spot, flag) in &spots {
            if *flag != ChangeFlag::Modified {
                continue;
            }
            for edge in incident(*spot) {
                edges.entry(edge.id).or_insert(EdgeChange {
                    edge,
                    flag: ChangeFlag::Modified,
                });
            }
        }

        let mut tracks_updated = BTreeSet::new();
        for (spot, flag) in &spots {
            if *flag != ChangeFlag::Removed {
                tracks_updated.extend(spot_track(*spot));
            }
        }
        for (id, change) in &edges {
            if change.flag == ChangeFlag::Removed {
                // The surviving endpoints' tracks lost an edge
                tracks_updated.extend(spot_track(change.edge.source));
                tracks_updated.extend(spot_track(change.edge.target));
            } else {
                tracks_updated.extend(edge_track(*id));
            }
        }

        let kind = if self.cleared {
            ModelEventKind::ModelCleared
        } else if spots.is_empty() && edges.is_empty() {
            ModelEventKind::TracksVisibilityChanged
        } else {
            ModelEventKind::ModelModified
        };

        ModelChangeEvent {
            kind,
            spots,
            edges,
            tracks_updated,
            tracks_removed,
            visibility_changed: self.visibility_changed,
        }
    }
}

// ============================================================================
// LISTENERS
// ============================================================================

/// Handle returned when registering a listener or channel subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub Uuid);

impl ListenerId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Receives one call per committed update scope.
///
/// Called synchronously on the thread that closed the scope, after the
/// track partition has been rebuilt. The model is read-only during the
/// call; feature values can still be written through `model.feature_model()`.
pub trait ModelChangeListener<T: TrackableObject>: Send + Sync {
    fn model_changed(&mut self, event: &ModelChangeEvent, model: &Model<T>);
}

impl<T, F> ModelChangeListener<T> for F
where
    T: TrackableObject,
    F: FnMut(&ModelChangeEvent, &Model<T>) + Send + Sync,
{
    fn model_changed(&mut self, event: &ModelChangeEvent, model: &Model<T>) {
        self(event, model)
    }
}
