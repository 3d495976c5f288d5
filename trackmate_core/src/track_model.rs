//! The TRACK model - spot/edge graph and its partition into tracks.
//!
//! The graph is undirected and weighted; each edge remembers the endpoints
//! it was created with as `source` and `target`. A track is a connected
//! component with at least one edge.
//!
//! Track ids are stable across rebuilds:
//! - a component keeps the id of the old track that contributes most of its
//!   spots (ties go to the smaller id)
//! - when a track splits, the largest part keeps the id, the others get
//!   fresh ones
//! - ids of vanished tracks are never handed out again

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use trackmate_env::{EdgeId, ObjectId, TrackId};

/// A weighted link between two spots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: ObjectId,
    pub target: ObjectId,

    /// Linking cost
    pub weight: f64,
}

impl Edge {
    /// Returns true if `spot` is one of the endpoints.
    pub fn touches(&self, spot: ObjectId) -> bool {
        self.source == spot || self.target == spot
    }

    /// Returns the endpoint opposite to `spot`.
    pub fn opposite(&self, spot: ObjectId) -> Option<ObjectId> {
        if self.source == spot {
            Some(self.target)
        } else if self.target == spot {
            Some(self.source)
        } else {
            None
        }
    }
}

/// Errors raised by graph mutations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("Spot not in graph: {0}")]
    UnknownSpot(ObjectId),

    #[error("Edge not in graph: {0}")]
    UnknownEdge(EdgeId),

    #[error("Spots {0} and {1} are already linked")]
    EdgeExists(ObjectId, ObjectId),

    #[error("Cannot link spot {0} to itself")]
    SelfLoop(ObjectId),
}

/// Outcome of a partition rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackDiff {
    /// Tracks that did not exist before
    pub created: Vec<TrackId>,

    /// Tracks that no longer exist
    pub removed: Vec<TrackId>,

    /// Tracks that kept their id
    pub retained: Vec<TrackId>,
}

#[derive(Debug, Clone, Default)]
struct Track {
    spots: BTreeSet<ObjectId>,
    edges: BTreeSet<EdgeId>,
    visible: bool,
}

/// Undirected spot/edge graph plus its track partition.
///
/// Partition queries reflect the state as of the last `rebuild_tracks()`.
#[derive(Debug, Clone, Default)]
pub struct TrackModel {
    // === Graph ===

    /// Spot -> incident edges
    adjacency: HashMap<ObjectId, BTreeSet<EdgeId>>,

    edges: BTreeMap<EdgeId, Edge>,

    next_edge_id: u64,

    // === Partition ===

    tracks: BTreeMap<TrackId, Track>,

    spot_to_track: HashMap<ObjectId, TrackId>,

    edge_to_track: HashMap<EdgeId, TrackId>,

    next_track_id: u64,
}

impl TrackModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rolls the graph and partition back to `snapshot` while keeping the
    /// id counters, which only move forward.
    pub(crate) fn restore(&mut self, snapshot: TrackModel) {
        let next_edge_id = self.next_edge_id.max(snapshot.next_edge_id);
        let next_track_id = self.next_track_id.max(snapshot.next_track_id);
        *self = snapshot;
        self.next_edge_id = next_edge_id;
        self.next_track_id = next_track_id;
    }

    // ========================================================================
    // GRAPH
    // ========================================================================

    /// Adds a vertex. Returns false if it was already present.
    pub fn add_spot(&mut self, spot: ObjectId) -> bool {
        if self.adjacency.contains_key(&spot) {
            return false;
        }
        self.adjacency.insert(spot, BTreeSet::new());
        true
    }

    /// Removes a vertex and returns the edges that were attached to it.
    pub fn remove_spot(&mut self, spot: ObjectId) -> Result<Vec<Edge>, GraphError> {
        let incident = self
            .adjacency
            .remove(&spot)
            .ok_or(GraphError::UnknownSpot(spot))?;

        let mut removed = Vec::with_capacity(incident.len());
        for edge_id in incident {
            if let Some(edge) = self.edges.remove(&edge_id) {
                if let Some(other) = edge.opposite(spot) {
                    if let Some(set) = self.adjacency.get_mut(&other) {
                        set.remove(&edge_id);
                    }
                }
                removed.push(edge);
            }
        }
        Ok(removed)
    }

    pub fn contains_spot(&self, spot: ObjectId) -> bool {
        self.adjacency.contains_key(&spot)
    }

    /// Links two spots. At most one edge may join a given pair.
    pub fn add_edge(
        &mut self,
        source: ObjectId,
        target: ObjectId,
        weight: f64,
    ) -> Result<EdgeId, GraphError> {
        if source == target {
            return Err(GraphError::SelfLoop(source));
        }
        if !self.adjacency.contains_key(&source) {
            return Err(GraphError::UnknownSpot(source));
        }
        if !self.adjacency.contains_key(&target) {
            return Err(GraphError::UnknownSpot(target));
        }
        if self.edge_between(source, target).is_some() {
            return Err(GraphError::EdgeExists(source, target));
        }

        let id = EdgeId(self.next_edge_id);
        self.next_edge_id += 1;

        self.edges.insert(id, Edge { id, source, target, weight });
        if let Some(set) = self.adjacency.get_mut(&source) {
            set.insert(id);
        }
        if let Some(set) = self.adjacency.get_mut(&target) {
            set.insert(id);
        }
        Ok(id)
    }

    pub fn remove_edge(&mut self, edge: EdgeId) -> Result<Edge, GraphError> {
        let removed = self.edges.remove(&edge).ok_or(GraphError::UnknownEdge(edge))?;
        for endpoint in [removed.source, removed.target] {
            if let Some(set) = self.adjacency.get_mut(&endpoint) {
                set.remove(&edge);
            }
        }
        Ok(removed)
    }

    pub fn set_edge_weight(&mut self, edge: EdgeId, weight: f64) -> Result<(), GraphError> {
        let e = self.edges.get_mut(&edge).ok_or(GraphError::UnknownEdge(edge))?;
        e.weight = weight;
        Ok(())
    }

    pub fn edge(&self, edge: EdgeId) -> Option<&Edge> {
        self.edges.get(&edge)
    }

    pub fn edge_source(&self, edge: EdgeId) -> Option<ObjectId> {
        self.edges.get(&edge).map(|e| e.source)
    }

    pub fn edge_target(&self, edge: EdgeId) -> Option<ObjectId> {
        self.edges.get(&edge).map(|e| e.target)
    }

    /// Edge joining `a` and `b` in either direction.
    pub fn edge_between(&self, a: ObjectId, b: ObjectId) -> Option<EdgeId> {
        self.adjacency
            .get(&a)?
            .iter()
            .copied()
            .find(|id| self.edges.get(id).map_or(false, |e| e.touches(b)))
    }

    /// Edges incident to a spot, in id order.
    pub fn edges_of(&self, spot: ObjectId) -> Vec<EdgeId> {
        self.adjacency
            .get(&spot)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Every edge, in id order.
    pub fn edge_set(&self) -> Vec<EdgeId> {
        self.edges.keys().copied().collect()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    // ========================================================================
    // PARTITION
    // ========================================================================

    /// Recomputes the connected components and assigns track ids.
    pub fn rebuild_tracks(&mut self) -> TrackDiff {
        let components = self.connected_components();

        let mut claimed: HashSet<TrackId> = HashSet::new();
        let mut new_tracks: BTreeMap<TrackId, Track> = BTreeMap::new();
        let mut created = Vec::new();

        for (spots, edges) in components {
            // Old tracks overlapping this component, best candidate first
            let mut overlap: HashMap<TrackId, usize> = HashMap::new();
            for spot in &spots {
                if let Some(old) = self.spot_to_track.get(spot) {
                    *overlap.entry(*old).or_insert(0) += 1;
                }
            }
            let mut candidates: Vec<(TrackId, usize)> = overlap.into_iter().collect();
            candidates.sort_by_key(|&(id, count)| (Reverse(count), id));

            let reused = candidates
                .into_iter()
                .map(|(id, _)| id)
                .find(|id| !claimed.contains(id));

            let (track_id, visible) = match reused {
                Some(id) => (id, self.tracks.get(&id).map_or(true, |t| t.visible)),
                None => {
                    let id = TrackId(self.next_track_id);
                    self.next_track_id += 1;
                    created.push(id);
                    (id, true)
                }
            };

            claimed.insert(track_id);
            new_tracks.insert(track_id, Track { spots, edges, visible });
        }

        let removed: Vec<TrackId> = self
            .tracks
            .keys()
            .copied()
            .filter(|id| !new_tracks.contains_key(id))
            .collect();
        let retained: Vec<TrackId> = new_tracks
            .keys()
            .copied()
            .filter(|id| self.tracks.contains_key(id))
            .collect();

        self.spot_to_track.clear();
        self.edge_to_track.clear();
        for (id, track) in &new_tracks {
            for spot in &track.spots {
                self.spot_to_track.insert(*spot, *id);
            }
            for edge in &track.edges {
                self.edge_to_track.insert(*edge, *id);
            }
        }
        self.tracks = new_tracks;

        TrackDiff { created, removed, retained }
    }

    /// Components with at least one edge, largest first (ties: smallest spot id).
    fn connected_components(&self) -> Vec<(BTreeSet<ObjectId>, BTreeSet<EdgeId>)> {
        let mut roots: Vec<ObjectId> = self
            .adjacency
            .iter()
            .filter(|(_, edges)| !edges.is_empty())
            .map(|(spot, _)| *spot)
            .collect();
        roots.sort();

        let mut visited: HashSet<ObjectId> = HashSet::new();
        let mut components = Vec::new();

        for root in roots {
            if visited.contains(&root) {
                continue;
            }

            let mut spots = BTreeSet::new();
            let mut edges = BTreeSet::new();
            let mut stack = vec![root];
            visited.insert(root);

            while let Some(spot) = stack.pop() {
                spots.insert(spot);
                for edge_id in self.adjacency.get(&spot).into_iter().flatten() {
                    edges.insert(*edge_id);
                    if let Some(next) = self.edges.get(edge_id).and_then(|e| e.opposite(spot)) {
                        if visited.insert(next) {
                            stack.push(next);
                        }
                    }
                }
            }

            components.push((spots, edges));
        }

        components.sort_by(|a, b| {
            b.0.len()
                .cmp(&a.0.len())
                .then_with(|| a.0.iter().next().cmp(&b.0.iter().next()))
        });
        components
    }

    /// Track ids in ascending order, optionally only the visible ones.
    pub fn track_ids(&self, visible_only: bool) -> Vec<TrackId> {
        self.tracks
            .iter()
            .filter(|(_, t)| !visible_only || t.visible)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn n_tracks(&self, visible_only: bool) -> usize {
        self.tracks
            .values()
            .filter(|t| !visible_only || t.visible)
            .count()
    }

    pub fn contains_track(&self, track: TrackId) -> bool {
        self.tracks.contains_key(&track)
    }

    /// Edges of a track, in id order. Empty for unknown tracks.
    pub fn track_edges(&self, track: TrackId) -> Vec<EdgeId> {
        self.tracks
            .get(&track)
            .map(|t| t.edges.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Spots of a track, in id order. Empty for unknown tracks.
    pub fn track_spots(&self, track: TrackId) -> Vec<ObjectId> {
        self.tracks
            .get(&track)
            .map(|t| t.spots.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn track_id_of_edge(&self, edge: EdgeId) -> Option<TrackId> {
        self.edge_to_track.get(&edge).copied()
    }

    pub fn track_id_of_spot(&self, spot: ObjectId) -> Option<TrackId> {
        self.spot_to_track.get(&spot).copied()
    }

    /// Sets a track's visibility. Returns true if the flag changed.
    pub fn set_visibility(&mut self, track: TrackId, visible: bool) -> bool {
        match self.tracks.get_mut(&track) {
            Some(t) if t.visible != visible => {
                t.visible = visible;
                true
            }
            _ => false,
        }
    }

    /// Visibility of a track; unknown tracks are not visible.
    pub fn is_visible(&self, track: TrackId) -> bool {
        self.tracks.get(&track).map_or(false, |t| t.visible)
    }
}
