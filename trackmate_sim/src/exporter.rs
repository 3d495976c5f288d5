//! JSON exporter for feature tables.
//!
//! Dumps every spot, edge and track of a model with all its feature values.
//! Declared edge/track features without a value are written as `null`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use trackmate_core::{Model, Spot, TrackableObject};

/// One spot row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotRow {
    pub id: u64,
    pub name: String,
    pub frame: i32,
    pub features: BTreeMap<String, f64>,
}

/// One edge row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRow {
    pub id: u64,
    pub source: u64,
    pub target: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_id: Option<u64>,
    pub features: BTreeMap<String, Option<f64>>,
}

/// One track row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRow {
    pub track_id: u64,
    pub visible: bool,
    pub n_spots: usize,
    pub n_edges: usize,
    pub features: BTreeMap<String, Option<f64>>,
}

/// Complete feature export of one scenario run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    pub space_units: String,
    pub time_units: String,

    pub spots: Vec<SpotRow>,
    pub edges: Vec<EdgeRow>,
    pub tracks: Vec<TrackRow>,

    /// Change events received during the run
    pub events: usize,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl FeatureExport {
    /// Snapshots a model's feature tables.
    pub fn from_model(model: &Model<Spot>, scenario: &str, seed: u64) -> Self {
        let fm = model.feature_model();
        let tracks = model.track_model();
        let edge_features = fm.edge_features();
        let track_features = fm.track_features();

        let spots = model
            .spots()
            .iter()
            .map(|spot| SpotRow {
                id: spot.id().0,
                name: spot.name().to_string(),
                frame: spot.frame(),
                features: spot
                    .features()
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            })
            .collect();

        let edges = tracks
            .edge_set()
            .into_iter()
            .filter_map(|id| tracks.edge(id))
            .map(|edge| EdgeRow {
                id: edge.id.0,
                source: edge.source.0,
                target: edge.target.0,
                track_id: tracks.track_id_of_edge(edge.id).map(|t| t.0),
                features: edge_features
                    .iter()
                    .map(|f| (f.to_string(), fm.get_edge_feature(edge.id, f)))
                    .collect(),
            })
            .collect();

        let track_rows = tracks
            .track_ids(false)
            .into_iter()
            .map(|track| TrackRow {
                track_id: track.0,
                visible: tracks.is_visible(track),
                n_spots: tracks.track_spots(track).len(),
                n_edges: tracks.track_edges(track).len(),
                features: track_features
                    .iter()
                    .map(|f| (f.to_string(), fm.get_track_feature(track, f)))
                    .collect(),
            })
            .collect();

        Self {
            scenario: scenario.to_string(),
            seed,
            space_units: model.config().space_units.clone(),
            time_units: model.config().time_units.clone(),
            spots,
            edges,
            tracks: track_rows,
            events: 0,
            passed: false,
            failure_reason: None,
        }
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, events: usize, passed: bool, failure_reason: Option<String>) {
        self.events = events;
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackmate_core::ModelFeatureUpdater;

    #[test]
    fn test_export_includes_missing_values_as_null() {
        let mut model: Model<Spot> = Model::new();
        let updater = ModelFeatureUpdater::with_default_analyzers(model.feature_model()).unwrap();

        model.begin_update();
        let a = Spot::new(model.allocator(), 0.0, 0.0, 0.0, 1.0, 0.0).at_time(0.0);
        let b = Spot::new(model.allocator(), 1.0, 0.0, 0.0, 1.0, 0.0).at_frame(1).at_time(1.0);
        let a = model.add_spot(a).unwrap();
        let b = model.add_spot(b).unwrap();
        model.add_edge(a, b, 1.0).unwrap();
        model.end_update().unwrap();

        // Declared but not computed yet
        let export = FeatureExport::from_model(&model, "unit", 7);
        assert_eq!(export.spots.len(), 2);
        assert_eq!(export.edges[0].features.get("VELOCITY"), Some(&None));

        updater.compute_all(&model).unwrap();
        let export = FeatureExport::from_model(&model, "unit", 7);
        assert_eq!(export.edges[0].features.get("VELOCITY"), Some(&Some(1.0)));
        assert_eq!(export.tracks[0].features.get("NUMBER_SPOTS"), Some(&Some(2.0)));

        let json = serde_json::to_string(&export).unwrap();
        assert!(json.contains("\"scenario\":\"unit\""));
        assert!(json.contains("\"POSITION_X\""));
    }
}
