//! The Model - spots, the track graph and the feature store behind one
//! update/notify protocol.
//!
//! Every mutation happens inside an update scope. Scopes nest; closing the
//! outermost one rebuilds the track partition and sends a single
//! `ModelChangeEvent` describing the net changes to every subscriber.
//! Mutations made outside an explicit scope open and close an implicit one.

use crate::events::{ListenerId, ModelChangeEvent, ModelChangeListener, PendingChanges};
use crate::feature_model::{FeatureError, FeatureModel};
use crate::spot_collection::SpotCollection;
use crate::track_model::{Edge, GraphError, TrackModel};
use crate::trackable::TrackableObject;
use crossbeam::channel::{self, Receiver, Sender};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use trackmate_env::{CounterIdAllocator, EdgeId, IdAllocator, ObjectId, TrackId};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for a Model
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Spatial unit label (default: "pixel")
    pub space_units: String,

    /// Time unit label (default: "frame")
    pub time_units: String,

    /// Run analyzers over their entity lists with rayon (default: true)
    pub parallel_analyzers: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            space_units: "pixel".to_string(),
            time_units: "frame".to_string(),
            parallel_analyzers: true,
        }
    }
}

impl ModelConfig {
    pub fn with_units(mut self, space_units: &str, time_units: &str) -> Self {
        self.space_units = space_units.to_string();
        self.time_units = time_units.to_string();
        self
    }

    pub fn with_parallel_analyzers(mut self, parallel: bool) -> Self {
        self.parallel_analyzers = parallel;
        self
    }
}

// ============================================================================
// SUBSCRIBERS
// ============================================================================

/// Receiving end of a channel subscription.
pub type EventReceiver = Receiver<Arc<ModelChangeEvent>>;

enum Subscriber<T: TrackableObject> {
    Listener(Box<dyn ModelChangeListener<T>>),
    Channel(Sender<Arc<ModelChangeEvent>>),
}

struct Subscription<T: TrackableObject> {
    id: ListenerId,
    subscriber: Subscriber<T>,
}

// ============================================================================
// MODEL
// ============================================================================

/// Spots, edges, tracks and their features.
pub struct Model<T: TrackableObject> {
    config: ModelConfig,

    allocator: Arc<dyn IdAllocator>,

    spots: SpotCollection<T>,

    tracks: TrackModel,

    features: Arc<FeatureModel>,

    /// Depth of nested update scopes
    update_level: usize,

    pending: PendingChanges,

    /// In registration order
    subscriptions: Vec<Subscription<T>>,
}

impl<T: TrackableObject> Default for Model<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TrackableObject> Model<T> {
    /// Creates an empty model with its own id counter.
    pub fn new() -> Self {
        Self::with_config(ModelConfig::default())
    }

    pub fn with_config(config: ModelConfig) -> Self {
        Self::with_allocator(config, CounterIdAllocator::shared())
    }

    /// Creates an empty model drawing ids from a shared allocator.
    pub fn with_allocator(config: ModelConfig, allocator: Arc<dyn IdAllocator>) -> Self {
        Self {
            config,
            allocator,
            spots: SpotCollection::new(),
            tracks: TrackModel::new(),
            features: Arc::new(FeatureModel::new()),
            update_level: 0,
            pending: PendingChanges::default(),
            subscriptions: Vec::new(),
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Allocator to build spots for this model with.
    pub fn allocator(&self) -> &dyn IdAllocator {
        self.allocator.as_ref()
    }

    pub fn shared_allocator(&self) -> Arc<dyn IdAllocator> {
        Arc::clone(&self.allocator)
    }

    pub fn spots(&self) -> &SpotCollection<T> {
        &self.spots
    }

    pub fn spot(&self, id: ObjectId) -> Option<&T> {
        self.spots.get(id)
    }

    pub fn track_model(&self) -> &TrackModel {
        &self.tracks
    }

    pub fn feature_model(&self) -> &Arc<FeatureModel> {
        &self.features
    }

    pub fn edge(&self, edge: EdgeId) -> Option<&Edge> {
        self.tracks.edge(edge)
    }

    /// Returns true while an update scope is open.
    pub fn is_updating(&self) -> bool {
        self.update_level > 0
    }

    pub fn update_level(&self) -> usize {
        self.update_level
    }

    // ========================================================================
    // UPDATE SCOPES
    // ========================================================================

    /// Opens (or nests) an update scope.
    pub fn begin_update(&mut self) {
        self.update_level += 1;
    }

    /// Closes an update scope. Closing the outermost one commits the
    /// pending changes and notifies subscribers.
    pub fn end_update(&mut self) -> Result<(), ModelError> {
        if self.update_level == 0 {
            return Err(ModelError::NoOpenUpdate);
        }
        self.update_level -= 1;
        if self.update_level == 0 {
            self.flush();
        }
        Ok(())
    }

    /// Runs `f` inside an update scope.
    ///
    /// If `f` fails, spots, graph and pending changes are restored to their
    /// state at entry and nothing is dispatched for the aborted work. Feature
    /// values written by `f` are kept, and the edge ids it consumed are not
    /// handed out again. Scopes `f` leaves open are closed.
    pub fn update<R, E, F>(&mut self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut Self) -> Result<R, E>,
        E: From<ModelError>,
    {
        let spots = self.spots.clone();
        let tracks = self.tracks.clone();
        let pending = self.pending.clone();
        let level = self.update_level;

        self.begin_update();
        match f(self) {
            Ok(value) => {
                self.update_level = level + 1;
                self.end_update()?;
                Ok(value)
            }
            Err(e) => {
                debug!("Update aborted, rolling back to level {}", level);
                self.spots = spots;
                self.tracks.restore(tracks);
                self.pending = pending;
                self.update_level = level;
                Err(e)
            }
        }
    }

    /// Runs a single mutation in its own, possibly nested, scope.
    fn in_scope<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, ModelError>,
    ) -> Result<R, ModelError> {
        self.begin_update();
        let result = f(self);
        self.end_update()?;
        result
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Adds a spot. Fails if a spot with the same id is already present.
    ///
    /// The allocator floor is raised past the spot's id, so spots built
    /// elsewhere (deserialized, or from another allocator) never collide
    /// with later fresh ids.
    pub fn add_spot(&mut self, spot: T) -> Result<ObjectId, ModelError> {
        self.in_scope(|model| {
            let id = spot.id();
            if model.spots.contains(id) {
                return Err(ModelError::DuplicateSpot(id));
            }
            model.allocator.bump(id);
            model.spots.insert(spot);
            model.tracks.add_spot(id);
            model.pending.spot_added(id);
            Ok(id)
        })
    }

    /// Removes a spot and every edge touching it.
    pub fn remove_spot(&mut self, id: ObjectId) -> Result<T, ModelError> {
        self.in_scope(|model| {
            if !model.spots.contains(id) {
                return Err(ModelError::UnknownSpot(id));
            }
            for edge in model.tracks.remove_spot(id)? {
                model.pending.edge_removed(edge);
            }
            let spot = model.spots.remove(id).ok_or(ModelError::UnknownSpot(id))?;
            model.pending.spot_removed(id);
            Ok(spot)
        })
    }

    /// Mutable access to a spot. Call `update_features` afterwards so that
    /// the change is indexed and notified.
    pub fn spot_mut(&mut self, id: ObjectId) -> Option<&mut T> {
        self.spots.get_mut(id)
    }

    /// Flags a spot as modified and moves it to the frame it now reports.
    pub fn update_features(&mut self, id: ObjectId) -> Result<(), ModelError> {
        self.in_scope(|model| {
            if !model.spots.contains(id) {
                return Err(ModelError::UnknownSpot(id));
            }
            model.spots.reindex(id);
            model.pending.spot_modified(id);
            Ok(())
        })
    }

    /// Links two spots.
    pub fn add_edge(
        &mut self,
        source: ObjectId,
        target: ObjectId,
        weight: f64,
    ) -> Result<EdgeId, ModelError> {
        self.in_scope(|model| {
            let id = model.tracks.add_edge(source, target, weight)?;
            if let Some(edge) = model.tracks.edge(id) {
                model.pending.edge_added(*edge);
            }
            Ok(id)
        })
    }

    pub fn remove_edge(&mut self, edge: EdgeId) -> Result<Edge, ModelError> {
        self.in_scope(|model| {
            let removed = model.tracks.remove_edge(edge)?;
            model.pending.edge_removed(removed);
            Ok(removed)
        })
    }

    pub fn set_edge_weight(&mut self, edge: EdgeId, weight: f64) -> Result<(), ModelError> {
        self.in_scope(|model| {
            model.tracks.set_edge_weight(edge, weight)?;
            if let Some(edge) = model.tracks.edge(edge) {
                model.pending.edge_modified(*edge);
            }
            Ok(())
        })
    }

    /// Shows or hides a track. Returns true if the visibility changed.
    pub fn set_track_visibility(&mut self, track: TrackId, visible: bool) -> Result<bool, ModelError> {
        self.in_scope(|model| {
            if !model.tracks.contains_track(track) {
                return Err(ModelError::UnknownTrack(track));
            }
            let changed = model.tracks.set_visibility(track, visible);
            if changed {
                model.pending.visibility_changed(track);
            }
            Ok(changed)
        })
    }

    /// Removes every spot and edge. Track ids are not reused afterwards.
    pub fn clear(&mut self) -> Result<(), ModelError> {
        self.in_scope(|model| {
            for id in model.spots.clear() {
                for edge in model.tracks.remove_spot(id)? {
                    model.pending.edge_removed(edge);
                }
                model.pending.spot_removed(id);
            }
            model.pending.cleared();
            Ok(())
        })
    }

    // ========================================================================
    // COMMIT & DISPATCH
    // ========================================================================

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending);

        let tracks_removed: BTreeSet<TrackId> = if pending.structure_changed() {
            self.tracks.rebuild_tracks().removed.into_iter().collect()
        } else {
            BTreeSet::new()
        };

        let tracks = &self.tracks;
        let event = pending.into_event(
            |spot| {
                tracks
                    .edges_of(spot)
                    .into_iter()
                    .filter_map(|e| tracks.edge(e).copied())
                    .collect()
            },
            |spot| tracks.track_id_of_spot(spot),
            |edge| tracks.track_id_of_edge(edge),
            tracks_removed,
        );

        debug!(
            "Committing {:?}: {} spots, {} edges, {} tracks updated, {} tracks removed",
            event.kind(),
            event.spot_count(),
            event.edge_count(),
            event.tracks_updated().len(),
            event.tracks_removed().len()
        );

        self.dispatch(Arc::new(event));
    }

    fn dispatch(&mut self, event: Arc<ModelChangeEvent>) {
        let mut subscriptions = std::mem::take(&mut self.subscriptions);
        let model = &*self;

        subscriptions.retain_mut(|sub| match &mut sub.subscriber {
            Subscriber::Listener(listener) => {
                trace!("Notifying listener {:?}", sub.id);
                listener.model_changed(&event, model);
                true
            }
            Subscriber::Channel(tx) => {
                if tx.send(Arc::clone(&event)).is_ok() {
                    trace!("Sent event to subscriber {:?}", sub.id);
                    true
                } else {
                    warn!("Dropping disconnected subscriber {:?}", sub.id);
                    false
                }
            }
        });

        self.subscriptions = subscriptions;
    }

    // ========================================================================
    // SUBSCRIPTIONS
    // ========================================================================

    /// Registers a listener, called after every commit in registration order.
    pub fn add_listener<L>(&mut self, listener: L) -> ListenerId
    where
        L: ModelChangeListener<T> + 'static,
    {
        let id = ListenerId::new();
        self.subscriptions.push(Subscription {
            id,
            subscriber: Subscriber::Listener(Box::new(listener)),
        });
        id
    }

    /// Subscribes a channel receiving every committed event. The
    /// subscription is dropped once the receiver is.
    pub fn subscribe(&mut self) -> (ListenerId, EventReceiver) {
        let (tx, rx) = channel::unbounded();
        let id = ListenerId::new();
        self.subscriptions.push(Subscription {
            id,
            subscriber: Subscriber::Channel(tx),
        });
        (id, rx)
    }

    /// Returns true if a subscription was removed.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|sub| sub.id != id);
        self.subscriptions.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.subscriptions.len()
    }

    // ========================================================================
    // FEATURE QUERIES
    // ========================================================================

    /// Track feature values of the visible (or all) tracks.
    pub fn track_feature_values(
        &self,
        feature: &str,
        visible_only: bool,
    ) -> Result<Vec<Option<f64>>, FeatureError> {
        self.features.track_feature_values(&self.tracks, feature, visible_only)
    }

    /// Edge feature values of the edges of the visible (or all) tracks.
    pub fn edge_feature_values(
        &self,
        feature: &str,
        visible_only: bool,
    ) -> Result<Vec<Option<f64>>, FeatureError> {
        self.features.edge_feature_values(&self.tracks, feature, visible_only)
    }
}

impl<T: TrackableObject> fmt::Debug for Model<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("config", &self.config)
            .field("spots", &self.spots.len())
            .field("edges", &self.tracks.edge_count())
            .field("tracks", &self.tracks.n_tracks(false))
            .field("update_level", &self.update_level)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl<T: TrackableObject> fmt::Display for Model<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Model with {} spots in {} frames, {} edges, {} tracks ({} visible)",
            self.spots.len(),
            self.spots.frames().len(),
            self.tracks.edge_count(),
            self.tracks.n_tracks(false),
            self.tracks.n_tracks(true)
        )?;
        writeln!(f, "Physical units: {}, {}", self.config.space_units, self.config.time_units)?;
        write!(f, "{}", self.features)
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Errors raised by model mutations and update scopes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Spot {0} is already in the model")]
    DuplicateSpot(ObjectId),

    #[error("Spot not in model: {0}")]
    UnknownSpot(ObjectId),

    #[error("Edge not in model: {0}")]
    UnknownEdge(EdgeId),

    #[error("Track not in model: {0}")]
    UnknownTrack(TrackId),

    #[error("Spots {0} and {1} are already linked")]
    EdgeExists(ObjectId, ObjectId),

    #[error("Cannot link spot {0} to itself")]
    SelfLoop(ObjectId),

    #[error("end_update called without an open update")]
    NoOpenUpdate,

    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),
}

impl From<GraphError> for ModelError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::UnknownSpot(id) => ModelError::UnknownSpot(id),
            GraphError::UnknownEdge(id) => ModelError::UnknownEdge(id),
            GraphError::EdgeExists(a, b) => ModelError::EdgeExists(a, b),
            GraphError::SelfLoop(id) => ModelError::SelfLoop(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ChangeFlag, ModelEventKind};
    use crate::features::POSITION_X;
    use crate::trackable::Spot;
    use parking_lot::Mutex;

    type Events = Arc<Mutex<Vec<ModelChangeEvent>>>;

    fn recording(model: &mut Model<Spot>) -> Events {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        model.add_listener(move |event: &ModelChangeEvent, _: &Model<Spot>| {
            sink.lock().push(event.clone());
        });
        events
    }

    fn spot(model: &Model<Spot>, x: f64, frame: i32) -> Spot {
        Spot::new(model.allocator(), x, 0.0, 0.0, 1.0, 0.0).at_frame(frame)
    }

    /// a - b - c chain across three frames.
    fn chain(model: &mut Model<Spot>) -> (ObjectId, ObjectId, ObjectId) {
        model.begin_update();
        let a = spot(model, 0.0, 0);
        let a = model.add_spot(a).unwrap();
        let b = spot(model, 1.0, 1);
        let b = model.add_spot(b).unwrap();
        let c = spot(model, 2.0, 2);
        let c = model.add_spot(c).unwrap();
        model.add_edge(a, b, 1.0).unwrap();
        model.add_edge(b, c, 1.0).unwrap();
        model.end_update().unwrap();
        (a, b, c)
    }

    #[test]
    fn test_implicit_scope_per_mutation() {
        let mut model = Model::new();
        let events = recording(&mut model);

        let a = spot(&model, 0.0, 0);
        model.add_spot(a).unwrap();
        let b = spot(&model, 1.0, 0);
        model.add_spot(b).unwrap();

        assert_eq!(events.lock().len(), 2);
        assert!(!model.is_updating());
    }

    #[test]
    fn test_nested_scopes_dispatch_once() {
        let mut model = Model::new();
        let events = recording(&mut model);

        model.begin_update();
        model.begin_update();
        let a = spot(&model, 0.0, 0);
        model.add_spot(a).unwrap();
        model.end_update().unwrap();
        assert!(events.lock().is_empty());
        model.end_update().unwrap();

        assert_eq!(events.lock().len(), 1);
        assert_eq!(model.end_update(), Err(ModelError::NoOpenUpdate));
    }

    #[test]
    fn test_empty_scope_dispatches_nothing() {
        let mut model: Model<Spot> = Model::new();
        let events = recording(&mut model);

        model.begin_update();
        model.end_update().unwrap();
        assert!(events.lock().is_empty());
    }

    #[test]
    fn test_event_sees_post_commit_tracks() {
        let mut model = Model::new();
        let events = recording(&mut model);
        let (a, _, c) = chain(&mut model);

        let events = events.lock();
        let event = &events[0];
        assert_eq!(event.kind(), ModelEventKind::ModelModified);
        assert_eq!(event.spots_with_flag(ChangeFlag::Added).len(), 3);
        assert_eq!(event.edges_to_update().len(), 2);

        let track = model.track_model().track_id_of_spot(a).unwrap();
        assert_eq!(model.track_model().track_id_of_spot(c), Some(track));
        assert_eq!(event.tracks_updated().iter().copied().collect::<Vec<_>>(), vec![track]);
    }

    #[test]
    fn test_modified_spot_flags_incident_edges() {
        let mut model = Model::new();
        let (a, b, _) = chain(&mut model);
        let events = recording(&mut model);

        model.spot_mut(b).unwrap().put_feature(POSITION_X, 10.0);
        model.update_features(b).unwrap();

        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].spot_flag(b), Some(ChangeFlag::Modified));
        assert_eq!(events[0].spot_flag(a), None);
        assert_eq!(events[0].edges_to_update().len(), 2);
    }

    #[test]
    fn test_remove_spot_removes_edges() {
        let mut model = Model::new();
        let (a, b, c) = chain(&mut model);
        let track = model.track_model().track_id_of_spot(a).unwrap();
        let events = recording(&mut model);

        let removed = model.remove_spot(b).unwrap();
        assert_eq!(removed.id(), b);
        assert_eq!(model.track_model().edge_count(), 0);

        let events = events.lock();
        assert_eq!(events[0].edges_with_flag(ChangeFlag::Removed).len(), 2);
        assert!(events[0].edges_to_update().is_empty());
        assert!(events[0].tracks_removed().contains(&track));
        assert!(model.spot(a).is_some() && model.spot(c).is_some());
    }

    #[test]
    fn test_add_then_remove_in_scope_is_silent() {
        let mut model = Model::new();
        let events = recording(&mut model);

        model.begin_update();
        let a = spot(&model, 0.0, 0);
        let a = model.add_spot(a).unwrap();
        model.remove_spot(a).unwrap();
        model.end_update().unwrap();

        assert!(events.lock().is_empty());
    }

    #[test]
    fn test_linked_then_removed_in_scope_is_silent() {
        let mut model = Model::new();
        let events = recording(&mut model);

        model.begin_update();
        let a = spot(&model, 0.0, 0);
        let a = model.add_spot(a).unwrap();
        let b = spot(&model, 1.0, 1);
        let b = model.add_spot(b).unwrap();
        model.add_edge(a, b, 1.0).unwrap();
        model.remove_spot(a).unwrap();
        model.remove_spot(b).unwrap();
        model.end_update().unwrap();

        assert!(events.lock().is_empty());
        assert_eq!(model.track_model().n_tracks(false), 0);
    }

    #[test]
    fn test_loaded_spot_raises_allocator_floor() {
        let source: Model<Spot> = Model::new();
        let saved = serde_json::to_string(&spot(&source, 3.0, 0)).unwrap();

        let mut model: Model<Spot> = Model::new();
        let loaded: Spot = serde_json::from_str(&saved).unwrap();
        let loaded = model.add_spot(loaded).unwrap();
        assert_eq!(loaded, ObjectId(0));

        let fresh = spot(&model, 4.0, 1);
        assert!(fresh.id() > loaded);
        let fresh = model.add_spot(fresh).unwrap();
        assert_ne!(fresh, loaded);
        assert_eq!(model.spots().len(), 2);
    }

    #[test]
    fn test_rollback_does_not_reuse_edge_ids() {
        let mut model = Model::new();
        let (a, _, c) = chain(&mut model);

        let result: Result<(), ModelError> = model.update(|m| {
            let aborted = m.add_edge(a, c, 2.0)?;
            m.feature_model().put_edge_feature(aborted, "VELOCITY", 5.0);
            Err(ModelError::UnknownEdge(aborted))
        });
        let Err(ModelError::UnknownEdge(aborted)) = result else {
            panic!("update should have failed");
        };

        let edge = model.add_edge(a, c, 2.0).unwrap();
        assert_ne!(edge, aborted);
        assert_eq!(model.feature_model().get_edge_feature(edge, "VELOCITY"), None);
    }

    #[test]
    fn test_update_rolls_back_on_error() {
        let mut model = Model::new();
        let (a, _, c) = chain(&mut model);
        let events = recording(&mut model);

        let result: Result<(), ModelError> = model.update(|m| {
            m.add_edge(a, c, 2.0)?;
            let dup = m.spot(a).cloned().ok_or(ModelError::UnknownSpot(a))?;
            m.add_spot(dup)?;
            Ok(())
        });

        assert_eq!(result, Err(ModelError::DuplicateSpot(a)));
        assert_eq!(model.track_model().edge_count(), 2);
        assert!(model.track_model().edge_between(a, c).is_none());
        assert!(events.lock().is_empty());
        assert!(!model.is_updating());
    }

    #[test]
    fn test_update_commits_on_success() {
        let mut model = Model::new();
        let (a, _, c) = chain(&mut model);
        let events = recording(&mut model);

        let edge = model
            .update(|m| -> Result<EdgeId, ModelError> {
                m.begin_update();
                m.add_edge(a, c, 2.0)
            })
            .unwrap();

        assert_eq!(model.edge(edge).map(|e| e.weight), Some(2.0));
        assert_eq!(events.lock().len(), 1);
        assert_eq!(model.update_level(), 0);
    }

    #[test]
    fn test_listeners_in_registration_order() {
        let mut model = Model::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in 0..3 {
            let order = Arc::clone(&order);
            model.add_listener(move |_: &ModelChangeEvent, _: &Model<Spot>| {
                order.lock().push(tag);
            });
        }

        let a = spot(&model, 0.0, 0);
        model.add_spot(a).unwrap();
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_remove_listener() {
        let mut model = Model::new();
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let id = model.add_listener(move |event: &ModelChangeEvent, _: &Model<Spot>| {
            sink.lock().push(event.clone());
        });

        assert!(model.remove_listener(id));
        assert!(!model.remove_listener(id));

        let a = spot(&model, 0.0, 0);
        model.add_spot(a).unwrap();
        assert!(events.lock().is_empty());
    }

    #[test]
    fn test_channel_subscription_and_pruning() {
        let mut model = Model::new();
        let (_, rx) = model.subscribe();
        let (_, dropped) = model.subscribe();
        drop(dropped);
        assert_eq!(model.listener_count(), 2);

        let a = spot(&model, 0.0, 0);
        let a = model.add_spot(a).unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(event.spot_flag(a), Some(ChangeFlag::Added));
        assert_eq!(model.listener_count(), 1);
    }

    #[test]
    fn test_visibility_event() {
        let mut model = Model::new();
        let (a, _, _) = chain(&mut model);
        let track = model.track_model().track_id_of_spot(a).unwrap();
        let events = recording(&mut model);

        assert_eq!(model.set_track_visibility(track, false), Ok(true));
        assert_eq!(model.set_track_visibility(track, false), Ok(false));
        assert_eq!(
            model.set_track_visibility(TrackId(999), true),
            Err(ModelError::UnknownTrack(TrackId(999)))
        );

        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), ModelEventKind::TracksVisibilityChanged);
        assert_eq!(model.track_model().n_tracks(true), 0);
    }

    #[test]
    fn test_graph_errors_surface() {
        let mut model = Model::new();
        let (a, b, _) = chain(&mut model);

        assert_eq!(model.add_edge(a, b, 1.0), Err(ModelError::EdgeExists(a, b)));
        assert_eq!(model.add_edge(a, a, 1.0), Err(ModelError::SelfLoop(a)));
        assert_eq!(
            model.remove_edge(EdgeId(77)),
            Err(ModelError::UnknownEdge(EdgeId(77)))
        );
        assert!(!model.is_updating());
    }

    #[test]
    fn test_clear() {
        let mut model = Model::new();
        let (a, _, _) = chain(&mut model);
        let track = model.track_model().track_id_of_spot(a).unwrap();
        let events = recording(&mut model);

        model.clear().unwrap();

        assert!(model.spots().is_empty());
        assert_eq!(model.track_model().n_tracks(false), 0);
        let events = events.lock();
        assert_eq!(events[0].kind(), ModelEventKind::ModelCleared);
        assert!(events[0].tracks_removed().contains(&track));
    }

    #[test]
    fn test_update_features_reindexes_frame() {
        let mut model = Model::new();
        let a = spot(&model, 0.0, 0);
        let a = model.add_spot(a).unwrap();

        model.spot_mut(a).unwrap().put_feature(crate::features::FRAME, 4.0);
        model.update_features(a).unwrap();

        assert_eq!(model.spots().frames(), vec![4]);
        assert_eq!(
            model.update_features(ObjectId(999)),
            Err(ModelError::UnknownSpot(ObjectId(999)))
        );
    }

    #[test]
    fn test_model_is_send_sync() {
        fn assert_send_sync<S: Send + Sync>() {}
        assert_send_sync::<Model<Spot>>();
    }
}
