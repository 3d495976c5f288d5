//! Keeps edge and track features in sync with the model.
//!
//! The updater is a `ModelChangeListener`: after each committed update it
//! recomputes only what the change can have affected.
//!
//! | analyzer      | local                    | global                            |
//! |---------------|--------------------------|-----------------------------------|
//! | edge          | `edges_to_update()`      | every edge of the affected tracks |
//! | track         | `tracks_updated()`       | every track                       |

use crate::edge_analyzers::{
    EdgeAnalyzer, EdgeTargetAnalyzer, EdgeTimeLocationAnalyzer, EdgeVelocityAnalyzer,
};
use crate::events::{ModelChangeEvent, ModelChangeListener, ModelEventKind};
use crate::feature_model::{FeatureError, FeatureModel};
use crate::features::FeatureKind;
use crate::model::Model;
use crate::track_analyzers::{
    TrackAnalyzer, TrackBranchingAnalyzer, TrackDurationAnalyzer, TrackIndexAnalyzer,
    TrackSpeedStatisticsAnalyzer,
};
use crate::trackable::TrackableObject;
use std::collections::BTreeSet;
use tracing::{debug, warn};
use trackmate_env::{EdgeId, TrackId};

/// Runs edge and track analyzers on the parts of the model that changed.
pub struct ModelFeatureUpdater<T: TrackableObject> {
    edge_analyzers: Vec<Box<dyn EdgeAnalyzer<T>>>,
    track_analyzers: Vec<Box<dyn TrackAnalyzer<T>>>,
}

impl<T: TrackableObject> ModelFeatureUpdater<T> {
    /// Creates an updater and declares every analyzer's features in
    /// `features`.
    pub fn new(
        features: &FeatureModel,
        edge_analyzers: Vec<Box<dyn EdgeAnalyzer<T>>>,
        track_analyzers: Vec<Box<dyn TrackAnalyzer<T>>>,
    ) -> Result<Self, FeatureError> {
        for analyzer in &edge_analyzers {
            features.declare_from(FeatureKind::Edge, &analyzer.declarations())?;
        }
        for analyzer in &track_analyzers {
            features.declare_from(FeatureKind::Track, &analyzer.declarations())?;
        }
        Ok(Self {
            edge_analyzers,
            track_analyzers,
        })
    }

    /// Updater running every provided analyzer.
    pub fn with_default_analyzers(features: &FeatureModel) -> Result<Self, FeatureError> {
        Self::new(
            features,
            vec![
                Box::new(EdgeVelocityAnalyzer),
                Box::new(EdgeTimeLocationAnalyzer),
                Box::new(EdgeTargetAnalyzer),
            ],
            vec![
                Box::new(TrackIndexAnalyzer),
                Box::new(TrackBranchingAnalyzer),
                Box::new(TrackDurationAnalyzer),
                Box::new(TrackSpeedStatisticsAnalyzer),
            ],
        )
    }

    pub fn edge_analyzer_keys(&self) -> Vec<&str> {
        self.edge_analyzers.iter().map(|a| a.key()).collect()
    }

    pub fn track_analyzer_keys(&self) -> Vec<&str> {
        self.track_analyzers.iter().map(|a| a.key()).collect()
    }

    /// Computes every feature of every edge and track.
    pub fn compute_all(&self, model: &Model<T>) -> Result<(), FeatureError> {
        let edges = model.track_model().edge_set();
        let tracks = model.track_model().track_ids(false);
        debug!(
            "Computing all features: {} edges, {} tracks",
            edges.len(),
            tracks.len()
        );

        for analyzer in &self.edge_analyzers {
            analyzer.process(&edges, model)?;
        }
        for analyzer in &self.track_analyzers {
            analyzer.process(&tracks, model)?;
        }
        Ok(())
    }

    /// Recomputes the features affected by one committed change.
    pub fn compute_for_event(
        &self,
        event: &ModelChangeEvent,
        model: &Model<T>,
    ) -> Result<(), FeatureError> {
        if event.kind() != ModelEventKind::ModelModified {
            return Ok(());
        }

        let tracks = model.track_model();
        let local_edges = event.edges_to_update();

        // Tracks touched by a live changed edge, or reported by the event
        let mut affected: BTreeSet<TrackId> = local_edges
            .iter()
            .filter_map(|&edge| tracks.track_id_of_edge(edge))
            .collect();
        affected.extend(
            event
                .tracks_updated()
                .iter()
                .copied()
                .filter(|&t| tracks.contains_track(t)),
        );
        let affected: Vec<TrackId> = affected.into_iter().collect();

        let global_edges: Vec<EdgeId> = affected
            .iter()
            .flat_map(|&track| tracks.track_edges(track))
            .collect();

        for analyzer in &self.edge_analyzers {
            if analyzer.is_local() {
                analyzer.process(&local_edges, model)?;
            } else {
                analyzer.process(&global_edges, model)?;
            }
        }

        let all_tracks = tracks.track_ids(false);
        for analyzer in &self.track_analyzers {
            if analyzer.is_local() {
                analyzer.process(&affected, model)?;
            } else {
                analyzer.process(&all_tracks, model)?;
            }
        }
        Ok(())
    }
}

impl<T: TrackableObject> ModelChangeListener<T> for ModelFeatureUpdater<T> {
    fn model_changed(&mut self, event: &ModelChangeEvent, model: &Model<T>) {
        if let Err(e) = self.compute_for_event(event, model) {
            warn!("Feature update failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trackable::Spot;
    use trackmate_env::ObjectId;

    fn chain(model: &mut Model<Spot>, n: usize, y: f64) -> Vec<ObjectId> {
        model.begin_update();
        let mut ids = Vec::new();
        for j in 0..n {
            let spot = Spot::new(model.allocator(), j as f64, y, 0.0, 1.0, 0.0)
                .at_frame(j as i32)
                .at_time(j as f64);
            ids.push(model.add_spot(spot).unwrap());
            if j > 0 {
                model.add_edge(ids[j - 1], ids[j], 1.0).unwrap();
            }
        }
        model.end_update().unwrap();
        ids
    }

    #[test]
    fn test_declares_on_construction() {
        let model: Model<Spot> = Model::new();
        let updater =
            ModelFeatureUpdater::<Spot>::with_default_analyzers(model.feature_model()).unwrap();

        let fm = model.feature_model();
        assert!(fm.is_declared(FeatureKind::Edge, "VELOCITY"));
        assert!(fm.is_declared(FeatureKind::Edge, "EDGE_COST"));
        assert!(fm.is_declared(FeatureKind::Track, "TRACK_MEAN_SPEED"));
        assert_eq!(updater.edge_analyzer_keys().len(), 3);
        assert_eq!(updater.track_analyzer_keys().len(), 4);
    }

    #[test]
    fn test_compute_all() {
        let mut model = Model::new();
        chain(&mut model, 4, 0.0);
        chain(&mut model, 3, 5.0);

        let updater = ModelFeatureUpdater::with_default_analyzers(model.feature_model()).unwrap();
        updater.compute_all(&model).unwrap();

        let spots = model.track_feature_values("NUMBER_SPOTS", false).unwrap();
        assert_eq!(spots, vec![Some(4.0), Some(3.0)]);

        let velocities = model.edge_feature_values("VELOCITY", false).unwrap();
        assert_eq!(velocities.len(), 5);
        assert!(velocities.iter().all(|v| *v == Some(1.0)));
    }

    #[test]
    fn test_listener_keeps_features_current() {
        let mut model = Model::new();
        let updater = ModelFeatureUpdater::with_default_analyzers(model.feature_model()).unwrap();
        model.add_listener(updater);

        let ids = chain(&mut model, 3, 0.0);
        let track = model.track_model().track_id_of_spot(ids[0]).unwrap();
        let fm = model.feature_model();
        assert_eq!(fm.get_track_feature(track, "TRACK_DURATION"), Some(2.0));

        let extra = Spot::new(model.allocator(), 3.0, 0.0, 0.0, 1.0, 0.0)
            .at_frame(3)
            .at_time(3.0);
        let extra = model.add_spot(extra).unwrap();
        model.add_edge(ids[2], extra, 1.0).unwrap();

        let fm = model.feature_model();
        assert_eq!(fm.get_track_feature(track, "TRACK_DURATION"), Some(3.0));
        assert_eq!(fm.get_track_feature(track, "NUMBER_SPOTS"), Some(4.0));
    }

    #[test]
    fn test_visibility_event_does_not_recompute() {
        let mut model = Model::new();
        let ids = chain(&mut model, 3, 0.0);
        let track = model.track_model().track_id_of_spot(ids[0]).unwrap();

        let updater = ModelFeatureUpdater::with_default_analyzers(model.feature_model()).unwrap();
        model.add_listener(updater);
        model.set_track_visibility(track, false).unwrap();

        assert_eq!(model.feature_model().get_track_feature(track, "NUMBER_SPOTS"), None);
    }
}
