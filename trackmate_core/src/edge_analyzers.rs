//! Edge analyzers - per-edge features computed from the two endpoints.
//!
//! An analyzer is *local* when the value it writes for an edge depends only
//! on that edge and its endpoints. Local analyzers are re-run on changed
//! edges only; global ones on every edge of the affected tracks.

use crate::feature_model::FeatureError;
use crate::features::{Dimension, FeatureDeclarations, FeatureKey, POSITION_T};
use crate::model::Model;
use crate::track_model::Edge;
use crate::trackable::TrackableObject;
use rayon::prelude::*;
use trackmate_env::EdgeId;

/// Computes edge features and stores them in the model's feature model.
pub trait EdgeAnalyzer<T: TrackableObject>: Send + Sync {
    /// Unique analyzer key.
    fn key(&self) -> &str;

    /// The features this analyzer writes.
    fn declarations(&self) -> FeatureDeclarations;

    fn is_local(&self) -> bool;

    /// Computes and stores the features of `edges`.
    fn process(&self, edges: &[EdgeId], model: &Model<T>) -> Result<(), FeatureError>;
}

/// Runs `f` on every item, with rayon when `parallel` is set. Stops at the
/// first error.
pub(crate) fn for_each<I, F>(items: &[I], parallel: bool, f: F) -> Result<(), FeatureError>
where
    I: Sync,
    F: Fn(&I) -> Result<(), FeatureError> + Send + Sync,
{
    if parallel {
        items.par_iter().try_for_each(f)
    } else {
        items.iter().try_for_each(f)
    }
}

/// Resolves an edge and both endpoints, then calls `f`.
fn for_each_edge<T, F>(edges: &[EdgeId], model: &Model<T>, f: F) -> Result<(), FeatureError>
where
    T: TrackableObject,
    F: Fn(&Edge, &T, &T) + Send + Sync,
{
    for_each(edges, model.config().parallel_analyzers, |&id| {
        let edge = model.edge(id).ok_or(FeatureError::UnknownEdge(id))?;
        let source = model
            .spot(edge.source)
            .ok_or(FeatureError::UnknownSpot(edge.source))?;
        let target = model
            .spot(edge.target)
            .ok_or(FeatureError::UnknownSpot(edge.target))?;
        f(edge, source, target);
        Ok(())
    })
}

/// Euclidean distance and speed between two objects.
///
/// Speed is distance over the absolute `POSITION_T` difference; a missing
/// time counts as 0.
pub(crate) fn displacement_and_speed<T: TrackableObject>(source: &T, target: &T) -> (f64, f64) {
    let d = source.square_distance_to(target).sqrt();
    let dt = target.diff_to(source, &POSITION_T).unwrap_or(0.0).abs();
    (d, d / dt)
}

// ============================================================================
// VELOCITY
// ============================================================================

/// Displacement and velocity along an edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeVelocityAnalyzer;

impl EdgeVelocityAnalyzer {
    pub const KEY: &'static str = "Edge velocity";
    pub const VELOCITY: FeatureKey = FeatureKey::from_static("VELOCITY");
    pub const DISPLACEMENT: FeatureKey = FeatureKey::from_static("DISPLACEMENT");

    pub fn new() -> Self {
        Self
    }
}

impl<T: TrackableObject> EdgeAnalyzer<T> for EdgeVelocityAnalyzer {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn declarations(&self) -> FeatureDeclarations {
        FeatureDeclarations::new()
            .with(Self::VELOCITY, "Velocity", "V", Dimension::Velocity, false)
            .with(Self::DISPLACEMENT, "Displacement", "D", Dimension::Length, false)
    }

    fn is_local(&self) -> bool {
        true
    }

    fn process(&self, edges: &[EdgeId], model: &Model<T>) -> Result<(), FeatureError> {
        let features = model.feature_model();
        for_each_edge(edges, model, |edge, source, target| {
            let (d, v) = displacement_and_speed(source, target);
            features.put_edge_feature(edge.id, Self::VELOCITY, v);
            features.put_edge_feature(edge.id, Self::DISPLACEMENT, d);
        })
    }
}

// ============================================================================
// TIME & LOCATION
// ============================================================================

/// Time and position of the edge midpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeTimeLocationAnalyzer;

impl EdgeTimeLocationAnalyzer {
    pub const KEY: &'static str = "Edge mean location";
    pub const TIME: FeatureKey = FeatureKey::from_static("EDGE_TIME");
    pub const X_LOCATION: FeatureKey = FeatureKey::from_static("EDGE_X_LOCATION");
    pub const Y_LOCATION: FeatureKey = FeatureKey::from_static("EDGE_Y_LOCATION");
    pub const Z_LOCATION: FeatureKey = FeatureKey::from_static("EDGE_Z_LOCATION");

    pub fn new() -> Self {
        Self
    }
}

impl<T: TrackableObject> EdgeAnalyzer<T> for EdgeTimeLocationAnalyzer {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn declarations(&self) -> FeatureDeclarations {
        FeatureDeclarations::new()
            .with(Self::TIME, "Time (mean)", "T", Dimension::Time, false)
            .with(Self::X_LOCATION, "X Location (mean)", "X", Dimension::Position, false)
            .with(Self::Y_LOCATION, "Y Location (mean)", "Y", Dimension::Position, false)
            .with(Self::Z_LOCATION, "Z Location (mean)", "Z", Dimension::Position, false)
    }

    fn is_local(&self) -> bool {
        true
    }

    fn process(&self, edges: &[EdgeId], model: &Model<T>) -> Result<(), FeatureError> {
        let features = model.feature_model();
        let axes = [Self::X_LOCATION, Self::Y_LOCATION, Self::Z_LOCATION];

        for_each_edge(edges, model, |edge, source, target| {
            let t0 = source.feature(&POSITION_T).unwrap_or(0.0);
            let t1 = target.feature(&POSITION_T).unwrap_or(0.0);
            features.put_edge_feature(edge.id, Self::TIME, 0.5 * (t0 + t1));

            for (axis, (a, b)) in axes
                .iter()
                .zip(source.position().iter().zip(target.position()))
            {
                features.put_edge_feature(edge.id, axis.clone(), 0.5 * (a + b));
            }
        })
    }
}

// ============================================================================
// ENDPOINTS
// ============================================================================

/// Endpoint ids and linking cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeTargetAnalyzer;

impl EdgeTargetAnalyzer {
    pub const KEY: &'static str = "Edge target";
    pub const SPOT_SOURCE_ID: FeatureKey = FeatureKey::from_static("SPOT_SOURCE_ID");
    pub const SPOT_TARGET_ID: FeatureKey = FeatureKey::from_static("SPOT_TARGET_ID");
    pub const EDGE_COST: FeatureKey = FeatureKey::from_static("EDGE_COST");

    pub fn new() -> Self {
        Self
    }
}

impl<T: TrackableObject> EdgeAnalyzer<T> for EdgeTargetAnalyzer {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn declarations(&self) -> FeatureDeclarations {
        FeatureDeclarations::new()
            .with(Self::SPOT_SOURCE_ID, "Source spot ID", "Source ID", Dimension::None, true)
            .with(Self::SPOT_TARGET_ID, "Target spot ID", "Target ID", Dimension::None, true)
            .with(Self::EDGE_COST, "Link cost", "Cost", Dimension::None, false)
    }

    fn is_local(&self) -> bool {
        true
    }

    fn process(&self, edges: &[EdgeId], model: &Model<T>) -> Result<(), FeatureError> {
        let features = model.feature_model();
        for_each_edge(edges, model, |edge, source, target| {
            features.put_edge_feature(edge.id, Self::SPOT_SOURCE_ID, source.id().0 as f64);
            features.put_edge_feature(edge.id, Self::SPOT_TARGET_ID, target.id().0 as f64);
            features.put_edge_feature(edge.id, Self::EDGE_COST, edge.weight);
        })
    }
}
