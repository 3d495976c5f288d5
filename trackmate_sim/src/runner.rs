//! Scenario runner - builds synthetic datasets and checks model invariants.
//!
//! Every run, whatever the scenario, ends with the same checks:
//! - every track has at least one edge and owns the endpoints of its edges
//! - every live edge and track carries every declared feature
//! - in incremental mode, the features maintained through change events are
//!   bitwise equal to a full recomputation

use crate::exporter::FeatureExport;
use crate::scenarios::ScenarioId;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use trackmate_core::features::{POSITION_FEATURES, POSITION_T, POSITION_X};
use trackmate_core::{
    EventReceiver, FeatureError, Model, ModelChangeEvent, ModelConfig, ModelError,
    ModelFeatureUpdater, ObjectId, Spot, TrackableObject,
};

// ============================================================================
// ERRORS
// ============================================================================

/// Errors that stop a scenario run.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised on purpose to roll back an update scope
    #[error("Update aborted")]
    Aborted,
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// How features are kept up to date during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerMode {
    /// A `ModelFeatureUpdater` listener recomputes after every commit
    Incremental,

    /// Features are computed once, at the end of the run
    Batch,
}

impl std::fmt::Display for AnalyzerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalyzerMode::Incremental => write!(f, "incremental"),
            AnalyzerMode::Batch => write!(f, "batch"),
        }
    }
}

impl std::str::FromStr for AnalyzerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "incremental" | "events" => Ok(AnalyzerMode::Incremental),
            "batch" | "all" => Ok(AnalyzerMode::Batch),
            _ => Err(format!("Unknown analyzer mode: {}", s)),
        }
    }
}

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,

    /// Final feature tables (absent if the run errored)
    pub export: Option<FeatureExport>,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default)]
pub struct ScenarioMetrics {
    /// Change events received
    pub events: usize,

    /// Update scopes rolled back
    pub rollbacks: usize,

    pub final_spots: usize,
    pub final_edges: usize,
    pub final_tracks: usize,
}

/// Runs tracking scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Number of tracks built by the scenarios
    n_tracks: usize,

    /// Frames per track minus one
    depth: usize,

    /// Physical time between frames
    time_step: f64,

    mode: AnalyzerMode,

    parallel: bool,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            n_tracks: 10,
            depth: 9,
            time_step: 2.0,
            mode: AnalyzerMode::Incremental,
            parallel: true,
        }
    }

    /// Sets the number of tracks.
    pub fn with_tracks(mut self, n_tracks: usize) -> Self {
        self.n_tracks = n_tracks;
        self
    }

    /// Sets the track depth (spots per track minus one).
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Sets the time between frames.
    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    pub fn with_analyzer_mode(mut self, mode: AnalyzerMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enables or disables rayon inside the analyzers.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!(
            "Starting scenario: {} (seed={}, mode={})",
            scenario.name(),
            self.seed,
            self.mode
        );

        match self.try_run(scenario) {
            Ok(result) => result,
            Err(e) => {
                warn!("Scenario {} errored: {}", scenario.name(), e);
                ScenarioResult {
                    scenario,
                    seed: self.seed,
                    passed: false,
                    failure_reason: Some(e.to_string()),
                    metrics: ScenarioMetrics::default(),
                    export: None,
                }
            }
        }
    }

    fn try_run(&self, scenario: ScenarioId) -> Result<ScenarioResult, SimError> {
        self.validate()?;
        let mut session = Session::new(self)?;

        let outcome = match scenario {
            ScenarioId::Chains => self.run_chains(&mut session)?,
            ScenarioId::RandomWalk => self.run_random_walk(&mut session)?,
            ScenarioId::MergeSplit => self.run_merge_split(&mut session)?,
            ScenarioId::Churn => self.run_churn(&mut session)?,
        };
        let outcome = outcome.and(session.finish()?);

        let metrics = ScenarioMetrics {
            events: session.events,
            rollbacks: session.rollbacks,
            final_spots: session.model.spots().len(),
            final_edges: session.model.track_model().edge_count(),
            final_tracks: session.model.track_model().n_tracks(false),
        };

        let passed = outcome.is_ok();
        let failure_reason = outcome.err();
        let mut export = FeatureExport::from_model(&session.model, scenario.name(), self.seed);
        export.finalize(metrics.events, passed, failure_reason.clone());

        info!(
            "Scenario {} finished: {} spots, {} edges, {} tracks, {} events, {} rollbacks",
            scenario.name(),
            metrics.final_spots,
            metrics.final_edges,
            metrics.final_tracks,
            metrics.events,
            metrics.rollbacks
        );

        Ok(ScenarioResult {
            scenario,
            seed: self.seed,
            passed,
            failure_reason,
            metrics,
            export: Some(export),
        })
    }

    fn validate(&self) -> Result<(), SimError> {
        if self.n_tracks < 2 {
            return Err(SimError::Config("at least 2 tracks are required".to_string()));
        }
        if self.depth < 3 {
            return Err(SimError::Config("depth must be at least 3".to_string()));
        }
        if self.time_step.is_nan() || self.time_step <= 0.0 {
            return Err(SimError::Config(format!(
                "time step must be positive, got {}",
                self.time_step
            )));
        }
        Ok(())
    }

    /// Adds one spot per `(frame, position)` pair, linked in order.
    fn add_linked(
        &self,
        model: &mut Model<Spot>,
        positions: &[(i32, [f64; 3])],
    ) -> Result<Vec<ObjectId>, SimError> {
        let mut ids = Vec::with_capacity(positions.len());
        model.begin_update();
        for (frame, [x, y, z]) in positions {
            let spot = Spot::new(model.allocator(), *x, *y, *z, 1.0, -1.0)
                .at_frame(*frame)
                .at_time(self.time_step * *frame as f64);
            let id = model.add_spot(spot)?;
            if let Some(&previous) = ids.last() {
                model.add_edge(previous, id, *frame as f64)?;
            }
            ids.push(id);
        }
        model.end_update()?;
        Ok(ids)
    }

    // ========================================================================
    // SCENARIOS
    // ========================================================================

    /// SIM-001: Chains - velocity reference values and local recomputation.
    fn run_chains(&self, session: &mut Session) -> Result<Result<(), String>, SimError> {
        info!("SIM-001: Chains - {} tracks x {} spots", self.n_tracks, self.depth + 1);

        let mut chains = Vec::with_capacity(self.n_tracks);
        session.model.begin_update();
        for i in 0..self.n_tracks {
            let axis = POSITION_FEATURES[i % 3].clone();
            let mut previous: Option<ObjectId> = None;
            let mut chain = Vec::with_capacity(self.depth + 1);

            for j in 0..=self.depth {
                let mut spot = Spot::new(session.model.allocator(), 0.0, 0.0, 0.0, 1.0, -1.0)
                    .at_frame(j as i32);
                spot.put_feature(axis.clone(), (i + j) as f64);
                spot.put_feature(POSITION_T, self.time_step * j as f64);
                let id = session.model.add_spot(spot)?;
                if let Some(prev) = previous {
                    session.model.add_edge(prev, id, j as f64)?;
                }
                previous = Some(id);
                chain.push(id);
            }
            chains.push(chain);
        }
        session.model.end_update()?;
        session.drain();

        // Move the middle spot of the first chain
        let aspot = chains[0][self.depth / 2];
        session.model.begin_update();
        if let Some(spot) = session.model.spot_mut(aspot) {
            spot.put_feature(POSITION_X, -1000.0);
        }
        session.model.update_features(aspot)?;
        session.model.end_update()?;

        let events = session.drain();
        let Some(event) = events.last() else {
            return Ok(Err("moving a spot produced no event".to_string()));
        };
        if event.edges_to_update().len() != 2 {
            return Ok(Err(format!(
                "moving a spot flagged {} edges, expected 2",
                event.edges_to_update().len()
            )));
        }

        session.compute_if_batch()?;

        let model = &session.model;
        let fm = model.feature_model();
        let expected_v = 1.0 / self.time_step;
        for edge in model.track_model().edge_set() {
            let touches = model.edge(edge).map_or(false, |e| e.touches(aspot));
            let d = fm.get_edge_feature(edge, "DISPLACEMENT");
            let v = fm.get_edge_feature(edge, "VELOCITY");

            if touches {
                if !d.map_or(false, |d| d > 1000.0) {
                    return Ok(Err(format!("edge {} was not recomputed after the move", edge)));
                }
            } else if d != Some(1.0) || v.map(f64::to_bits) != Some(expected_v.to_bits()) {
                return Ok(Err(format!(
                    "edge {}: displacement {:?}, velocity {:?}, expected 1 and {}",
                    edge, d, v, expected_v
                )));
            }
        }
        Ok(Ok(()))
    }

    /// SIM-002: RandomWalk - gaps and spot counts against the generator.
    fn run_random_walk(&self, session: &mut Session) -> Result<Result<(), String>, SimError> {
        info!("SIM-002: RandomWalk - {} walkers", self.n_tracks);

        let step = Normal::new(0.0, 1.5).map_err(|e| SimError::Config(e.to_string()))?;
        let mut expected: Vec<(ObjectId, usize, usize, i32)> = Vec::new();

        for _ in 0..self.n_tracks {
            let mut position = [
                session.rng.gen_range(0.0..100.0),
                session.rng.gen_range(0.0..100.0),
                0.0,
            ];
            let mut positions = Vec::new();
            let mut gaps = 0;
            let mut longest_gap = 0;
            let mut skipped = 0;

            for frame in 0..=self.depth as i32 {
                position[0] += step.sample(&mut session.rng);
                position[1] += step.sample(&mut session.rng);

                // First and last frames are always detected
                let detected = frame == 0
                    || frame == self.depth as i32
                    || session.rng.gen_bool(0.8);
                if !detected {
                    skipped += 1;
                    continue;
                }
                if skipped > 0 {
                    gaps += 1;
                    longest_gap = longest_gap.max(skipped);
                    skipped = 0;
                }
                positions.push((frame, position));
            }

            let ids = self.add_linked(&mut session.model, &positions)?;
            expected.push((ids[0], ids.len(), gaps, longest_gap));
        }

        // Unlinked detections never form tracks
        session.model.begin_update();
        for frame in 0..=self.depth as i32 {
            let spot = Spot::new(session.model.allocator(), -50.0, -50.0, 0.0, 1.0, 0.0)
                .at_frame(frame)
                .at_time(self.time_step * frame as f64);
            session.model.add_spot(spot)?;
        }
        session.model.end_update()?;

        session.compute_if_batch()?;

        let model = &session.model;
        let fm = model.feature_model();
        if model.track_model().n_tracks(false) != self.n_tracks {
            return Ok(Err(format!(
                "{} tracks, expected {}",
                model.track_model().n_tracks(false),
                self.n_tracks
            )));
        }
        for (first, n_spots, gaps, longest) in expected {
            let Some(track) = model.track_model().track_id_of_spot(first) else {
                return Ok(Err(format!("spot {} is not in a track", first)));
            };
            let got = (
                fm.get_track_feature(track, "NUMBER_SPOTS"),
                fm.get_track_feature(track, "NUMBER_GAPS"),
                fm.get_track_feature(track, "LONGEST_GAP"),
            );
            let want = (Some(n_spots as f64), Some(gaps as f64), Some(longest as f64));
            if got != want {
                return Ok(Err(format!("{}: got {:?}, expected {:?}", track, got, want)));
            }
        }
        Ok(Ok(()))
    }

    /// SIM-003: MergeSplit - track ids across merges, splits and hiding.
    fn run_merge_split(&self, session: &mut Session) -> Result<Result<(), String>, SimError> {
        info!("SIM-003: MergeSplit");

        let mid = self.depth / 2;
        let long: Vec<(i32, [f64; 3])> = (0..=self.depth as i32)
            .map(|f| (f, [f as f64, 0.0, 0.0]))
            .collect();
        let short: Vec<(i32, [f64; 3])> = ((mid + 1) as i32..=self.depth as i32)
            .map(|f| (f, [f as f64, 10.0, 0.0]))
            .collect();

        let a = self.add_linked(&mut session.model, &long)?;
        let b = self.add_linked(&mut session.model, &short)?;
        session.drain();

        let tracks = session.model.track_model();
        let (Some(track_a), Some(track_b)) =
            (tracks.track_id_of_spot(a[0]), tracks.track_id_of_spot(b[0]))
        else {
            return Ok(Err("chains did not form tracks".to_string()));
        };

        // Merge: the longer track keeps its id
        let bridge = session.model.add_edge(a[mid], b[0], 1.0)?;
        let events = session.drain();
        let tracks = session.model.track_model();
        if tracks.track_id_of_spot(b[0]) != Some(track_a) {
            return Ok(Err(format!("merged track is not {}", track_a)));
        }
        if !events.iter().any(|e| e.tracks_removed().contains(&track_b)) {
            return Ok(Err(format!("{} was not reported removed", track_b)));
        }

        session.compute_if_batch()?;
        let splits = session
            .model
            .feature_model()
            .get_track_feature(track_a, "NUMBER_SPLITS");
        if splits != Some(1.0) {
            return Ok(Err(format!("merged track has {:?} splits, expected 1", splits)));
        }

        // Split again: the short part gets a fresh id
        session.model.remove_edge(bridge)?;
        let tracks = session.model.track_model();
        let Some(fresh) = tracks.track_id_of_spot(b[0]) else {
            return Ok(Err("split part is not a track".to_string()));
        };
        if tracks.track_id_of_spot(a[0]) != Some(track_a) || fresh <= track_b {
            return Ok(Err(format!(
                "after split: long part {:?}, short part {}",
                tracks.track_id_of_spot(a[0]),
                fresh
            )));
        }

        // Build the remaining tracks and hide the fresh one
        for i in 2..self.n_tracks {
            let chain: Vec<(i32, [f64; 3])> = (0..=self.depth as i32)
                .map(|f| (f, [f as f64, 20.0 * i as f64, 0.0]))
                .collect();
            self.add_linked(&mut session.model, &chain)?;
        }
        session.model.set_track_visibility(fresh, false)?;
        session.compute_if_batch()?;

        let visible = session.model.track_feature_values("NUMBER_SPOTS", true)?;
        let all = session.model.track_feature_values("NUMBER_SPOTS", false)?;
        if visible.len() + 1 != all.len() {
            return Ok(Err(format!(
                "{} visible of {} tracks after hiding one",
                visible.len(),
                all.len()
            )));
        }
        Ok(Ok(()))
    }

    /// SIM-004: Churn - random edits, a quarter of them rolled back.
    fn run_churn(&self, session: &mut Session) -> Result<Result<(), String>, SimError> {
        info!("SIM-004: Churn");

        for i in 0..self.n_tracks {
            let chain: Vec<(i32, [f64; 3])> = (0..=self.depth as i32)
                .map(|f| (f, [f as f64, 5.0 * i as f64, 0.0]))
                .collect();
            self.add_linked(&mut session.model, &chain)?;
        }
        session.drain();

        let n_ops = self.n_tracks * self.depth;
        for op in 0..n_ops {
            let abort = session.rng.gen_bool(0.25);
            let spots_before = session.model.spots().len();
            let edges_before = session.model.track_model().edge_count();

            let Session { model, rng, .. } = session;
            let result = model.update(|m| -> Result<(), SimError> {
                random_edit(m, rng, self.time_step)?;
                if abort {
                    return Err(SimError::Aborted);
                }
                Ok(())
            });

            match result {
                Ok(()) => {}
                Err(SimError::Aborted) => {
                    session.rollbacks += 1;
                    let events = session.drain();
                    if !events.is_empty()
                        || session.model.spots().len() != spots_before
                        || session.model.track_model().edge_count() != edges_before
                    {
                        return Ok(Err(format!("op {}: rollback leaked changes", op)));
                    }
                }
                Err(e) => return Err(e),
            }
            session.drain();
        }
        debug!("Churn: {} ops, {} rolled back", n_ops, session.rollbacks);

        Ok(Ok(()))
    }
}

/// One random edit: move, remove or extend a spot, or cut or reweight an edge.
fn random_edit(m: &mut Model<Spot>, rng: &mut ChaCha8Rng, time_step: f64) -> Result<(), SimError> {
    let spots: Vec<ObjectId> = m.spots().iter().map(|s| s.id()).collect();
    let edges = m.track_model().edge_set();
    if spots.is_empty() {
        return Ok(());
    }
    let spot = spots[rng.gen_range(0..spots.len())];

    match rng.gen_range(0..5) {
        0 => {
            let dx = rng.gen_range(-2.0..2.0);
            if let Some(s) = m.spot_mut(spot) {
                let x = s.position()[0];
                s.put_feature(POSITION_X, x + dx);
            }
            m.update_features(spot)?;
        }
        1 => {
            m.remove_spot(spot)?;
        }
        2 => {
            let Some(frame) = m.spot(spot).map(|s| s.frame() + 1) else {
                return Ok(());
            };
            let new = Spot::new(m.allocator(), rng.gen_range(0.0..50.0), 0.0, 0.0, 1.0, 0.0)
                .at_frame(frame)
                .at_time(time_step * frame as f64);
            let new = m.add_spot(new)?;
            m.add_edge(spot, new, 1.0)?;
        }
        3 if !edges.is_empty() => {
            m.remove_edge(edges[rng.gen_range(0..edges.len())])?;
        }
        _ if !edges.is_empty() => {
            m.set_edge_weight(edges[rng.gen_range(0..edges.len())], rng.gen_range(0.0..10.0))?;
        }
        _ => {}
    }
    Ok(())
}

// ============================================================================
// SESSION
// ============================================================================

/// A model under test plus its event subscription.
struct Session {
    model: Model<Spot>,

    /// Kept aside in batch mode, listening in incremental mode
    batch_updater: Option<ModelFeatureUpdater<Spot>>,

    rx: EventReceiver,

    rng: ChaCha8Rng,

    mode: AnalyzerMode,

    events: usize,

    rollbacks: usize,
}

impl Session {
    fn new(runner: &ScenarioRunner) -> Result<Self, SimError> {
        let config = ModelConfig::default()
            .with_units("µm", "s")
            .with_parallel_analyzers(runner.parallel);
        let mut model = Model::with_config(config);
        let updater = ModelFeatureUpdater::with_default_analyzers(model.feature_model())?;

        let batch_updater = match runner.mode {
            AnalyzerMode::Incremental => {
                model.add_listener(updater);
                None
            }
            AnalyzerMode::Batch => Some(updater),
        };
        let (_, rx) = model.subscribe();

        Ok(Self {
            model,
            batch_updater,
            rx,
            rng: ChaCha8Rng::seed_from_u64(runner.seed),
            mode: runner.mode,
            events: 0,
            rollbacks: 0,
        })
    }

    /// Takes the events received since the last call.
    fn drain(&mut self) -> Vec<Arc<ModelChangeEvent>> {
        let events: Vec<_> = self.rx.try_iter().collect();
        self.events += events.len();
        events
    }

    fn compute_if_batch(&self) -> Result<(), SimError> {
        if let Some(updater) = &self.batch_updater {
            updater.compute_all(&self.model)?;
        }
        Ok(())
    }

    /// Final invariant checks.
    fn finish(&mut self) -> Result<Result<(), String>, SimError> {
        self.drain();
        self.compute_if_batch()?;

        let model = &self.model;
        let tracks = model.track_model();
        for track in tracks.track_ids(false) {
            let spots = tracks.track_spots(track);
            let edges = tracks.track_edges(track);
            if edges.is_empty() {
                return Ok(Err(format!("{} has no edge", track)));
            }
            for edge in edges {
                let Some(e) = tracks.edge(edge) else {
                    return Ok(Err(format!("{} lists missing edge {}", track, edge)));
                };
                if !spots.contains(&e.source) || !spots.contains(&e.target) {
                    return Ok(Err(format!("{} does not own the endpoints of {}", track, edge)));
                }
            }
        }

        let incremental = snapshot(model);
        for ((kind, id, feature), value) in &incremental {
            if value.is_none() {
                return Ok(Err(format!("{} {} misses {}", kind, id, feature)));
            }
        }

        if self.mode == AnalyzerMode::Incremental {
            let full = ModelFeatureUpdater::with_default_analyzers(model.feature_model())?;
            full.compute_all(model)?;
            let recomputed = snapshot(model);
            for (key, value) in &recomputed {
                if incremental.get(key) != Some(value) {
                    return Ok(Err(format!(
                        "{} {} {}: incremental {:?}, recomputed {:?}",
                        key.0,
                        key.1,
                        key.2,
                        incremental.get(key).map(|v| v.map(f64::from_bits)),
                        value.map(f64::from_bits)
                    )));
                }
            }
        }
        Ok(Ok(()))
    }
}

/// Bit patterns of every declared edge/track feature of every live edge and
/// track.
fn snapshot(model: &Model<Spot>) -> BTreeMap<(&'static str, u64, String), Option<u64>> {
    let fm = model.feature_model();
    let tracks = model.track_model();
    let mut values = BTreeMap::new();

    for feature in fm.edge_features() {
        for edge in tracks.edge_set() {
            let v = fm.get_edge_feature(edge, &feature).map(f64::to_bits);
            values.insert(("edge", edge.0, feature.to_string()), v);
        }
    }
    for feature in fm.track_features() {
        for track in tracks.track_ids(false) {
            let v = fm.get_track_feature(track, &feature).map(f64::to_bits);
            values.insert(("track", track.0, feature.to_string()), v);
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_scenarios_pass_incremental() {
        let runner = ScenarioRunner::new(42).with_tracks(4).with_depth(6);
        for scenario in ScenarioId::all() {
            let result = runner.run(scenario);
            assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
            assert!(result.metrics.events > 0);
        }
    }

    #[test]
    fn test_all_scenarios_pass_batch_sequential() {
        let runner = ScenarioRunner::new(7)
            .with_tracks(3)
            .with_depth(5)
            .with_analyzer_mode(AnalyzerMode::Batch)
            .with_parallel(false);
        for scenario in ScenarioId::all() {
            let result = runner.run(scenario);
            assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
        }
    }

    #[test]
    fn test_churn_rolls_back() {
        let runner = ScenarioRunner::new(3).with_tracks(5).with_depth(8);
        let result = runner.run(ScenarioId::Churn);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.metrics.rollbacks > 0);
    }

    #[test]
    fn test_same_seed_same_export() {
        let runner = ScenarioRunner::new(11).with_tracks(3).with_depth(4);
        let a = runner.run(ScenarioId::RandomWalk).export.unwrap();
        let b = runner.run(ScenarioId::RandomWalk).export.unwrap();

        let a: Vec<_> = a.spots.iter().map(|s| s.features.clone()).collect();
        let b: Vec<_> = b.spots.iter().map(|s| s.features.clone()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_config() {
        let result = ScenarioRunner::new(1).with_depth(1).run(ScenarioId::Chains);
        assert!(!result.passed);
        assert!(result.failure_reason.unwrap().contains("depth"));
        assert!(result.export.is_none());
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("batch".parse::<AnalyzerMode>(), Ok(AnalyzerMode::Batch));
        assert_eq!("Incremental".parse::<AnalyzerMode>(), Ok(AnalyzerMode::Incremental));
        assert!("lazy".parse::<AnalyzerMode>().is_err());
    }
}
