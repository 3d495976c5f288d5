//! Edge velocity analyzer on straight chains, full run and incremental update.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use trackmate_core::features::{FeatureDeclarations, POSITION_FEATURES, POSITION_T, POSITION_X};
use trackmate_core::{
    EdgeAnalyzer, EdgeId, EdgeVelocityAnalyzer, FeatureError, Model, ModelFeatureUpdater, ObjectId,
    Spot, TrackableObject,
};

const N_TRACKS: usize = 10;

/// Spots per chain minus one
const DEPTH: usize = 9;

struct Fixture {
    model: Model<Spot>,
    edge_d: HashMap<EdgeId, f64>,
    edge_v: HashMap<EdgeId, f64>,

    /// Middle spot of the first chain
    aspot: ObjectId,
}

/// N_TRACKS chains of DEPTH + 1 spots, time step 2. Chain `i` moves along
/// axis `i % 3`, one unit per frame.
fn setup() -> Fixture {
    let mut model = Model::new();
    let mut edge_d = HashMap::new();
    let mut edge_v = HashMap::new();
    let mut aspot = None;

    model.begin_update();
    for i in 0..N_TRACKS {
        let axis = &POSITION_FEATURES[i % 3];
        let mut previous: Option<ObjectId> = None;

        for j in 0..=DEPTH {
            let mut spot = Spot::new(model.allocator(), 0.0, 0.0, 0.0, 1.0, -1.0).at_frame(j as i32);
            spot.put_feature(axis.clone(), (i + j) as f64);
            spot.put_feature(POSITION_T, (2 * j) as f64);
            let id = model.add_spot(spot).unwrap();

            if let Some(prev) = previous {
                let edge = model.add_edge(prev, id, j as f64).unwrap();
                let d = model.spot(id).unwrap().feature(axis).unwrap()
                    - model.spot(prev).unwrap().feature(axis).unwrap();
                edge_d.insert(edge, d);
                edge_v.insert(edge, d / 2.0);
            }
            previous = Some(id);

            if i == 0 && j == DEPTH / 2 {
                aspot = Some(id);
            }
        }
    }
    model.end_update().unwrap();

    Fixture {
        model,
        edge_d,
        edge_v,
        aspot: aspot.unwrap(),
    }
}

/// Velocity analyzer recording the edges it was asked to process.
struct RecordingAnalyzer {
    local: bool,
    seen: Arc<Mutex<Option<Vec<EdgeId>>>>,
}

impl EdgeAnalyzer<Spot> for RecordingAnalyzer {
    fn key(&self) -> &str {
        "Recording velocity"
    }

    fn declarations(&self) -> FeatureDeclarations {
        <EdgeVelocityAnalyzer as EdgeAnalyzer<Spot>>::declarations(&EdgeVelocityAnalyzer)
    }

    fn is_local(&self) -> bool {
        self.local
    }

    fn process(&self, edges: &[EdgeId], model: &Model<Spot>) -> Result<(), FeatureError> {
        *self.seen.lock() = Some(edges.to_vec());
        EdgeVelocityAnalyzer.process(edges, model)
    }
}

fn move_aspot_and_record(local: bool) -> (Fixture, Vec<EdgeId>) {
    let mut fixture = setup();
    let seen = Arc::new(Mutex::new(None));
    let analyzer = RecordingAnalyzer {
        local,
        seen: Arc::clone(&seen),
    };

    // Initial calculation
    let edges = fixture.model.track_model().edge_set();
    analyzer.process(&edges, &fixture.model).unwrap();
    *seen.lock() = None;

    let updater =
        ModelFeatureUpdater::new(fixture.model.feature_model(), vec![Box::new(analyzer)], Vec::new())
            .unwrap();
    fixture.model.add_listener(updater);

    // Move one spot
    let aspot = fixture.aspot;
    fixture.model.begin_update();
    fixture
        .model
        .spot_mut(aspot)
        .unwrap()
        .put_feature(POSITION_X, -1000.0);
    fixture.model.update_features(aspot).unwrap();
    fixture.model.end_update().unwrap();

    let processed = seen.lock().take().expect("analyzer was not run");
    (fixture, processed)
}

#[test]
fn test_process() {
    let fixture = setup();
    let model = &fixture.model;
    let edges = model.track_model().edge_set();
    assert_eq!(edges.len(), N_TRACKS * DEPTH);

    EdgeVelocityAnalyzer.process(&edges, model).unwrap();

    let fm = model.feature_model();
    for edge in edges {
        let v = fm.get_edge_feature(edge, &EdgeVelocityAnalyzer::VELOCITY).unwrap();
        let d = fm.get_edge_feature(edge, &EdgeVelocityAnalyzer::DISPLACEMENT).unwrap();
        assert_eq!(v.to_bits(), fixture.edge_v[&edge].to_bits());
        assert_eq!(d.to_bits(), fixture.edge_d[&edge].to_bits());
    }
}

#[test]
fn test_model_changed_local() {
    let (fixture, processed) = move_aspot_and_record(true);

    // Only the two edges touching the moved spot
    assert_eq!(processed.len(), 2);
    let tracks = fixture.model.track_model();
    for edge in &processed {
        assert!(tracks.edge(*edge).unwrap().touches(fixture.aspot));
    }

    // And their values follow the new position
    let fm = fixture.model.feature_model();
    for edge in processed {
        let d = fm.get_edge_feature(edge, "DISPLACEMENT").unwrap();
        assert!(d > 1000.0);
        assert_eq!(fm.get_edge_feature(edge, "VELOCITY"), Some(d / 2.0));
    }
}

#[test]
fn test_model_changed_global() {
    let (fixture, processed) = move_aspot_and_record(false);

    // Every edge of the moved spot's track
    let tracks = fixture.model.track_model();
    let track = tracks.track_id_of_spot(fixture.aspot).unwrap();
    assert_eq!(processed.len(), DEPTH);
    assert_eq!(processed, tracks.track_edges(track));
}

#[test]
fn test_untouched_tracks_keep_values() {
    let (fixture, processed) = move_aspot_and_record(true);
    let fm = fixture.model.feature_model();

    for edge in fixture.model.track_model().edge_set() {
        if processed.contains(&edge) {
            continue;
        }
        let v = fm.get_edge_feature(edge, "VELOCITY").unwrap();
        assert_eq!(v.to_bits(), fixture.edge_v[&edge].to_bits());
    }
}
