//! Trackable objects - identity, position, frame and per-object features.
//!
//! The identity contract:
//! - `id` is fixed at construction
//! - equality and hashing use `id` only
//! - ordering is by `id`
//!
//! Ids come from a caller-supplied `IdAllocator`. Supplying an explicit id
//! (e.g. when reloading a saved session) raises the allocator floor so that
//! later automatic ids never collide with it.

use crate::features::{
    FeatureKey, FRAME, POSITION_T, POSITION_X, POSITION_Y, POSITION_Z, QUALITY, RADIUS,
};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use trackmate_env::{IdAllocator, ObjectId};

/// Any entity that can be linked into tracks.
pub trait TrackableObject: Clone + Eq + Ord + Hash + fmt::Debug + Send + Sync + 'static {
    /// Immutable identity.
    fn id(&self) -> ObjectId;

    /// Time index (frame) this object was detected in.
    fn frame(&self) -> i32;

    fn name(&self) -> &str;

    fn set_name(&mut self, name: String);

    /// Spatial coordinates, one value per axis.
    fn position(&self) -> &[f64];

    /// Returns the value of a feature, or `None` if it was never set.
    fn feature(&self, feature: &str) -> Option<f64>;

    /// Stores a feature value on the object.
    fn put_feature(&mut self, feature: FeatureKey, value: f64);

    /// Squared Euclidean distance between the two positions.
    fn square_distance_to(&self, other: &Self) -> f64 {
        self.position()
            .iter()
            .zip(other.position())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    /// Difference `self[feature] - other[feature]`, if both are set.
    fn diff_to(&self, other: &Self, feature: &str) -> Option<f64> {
        Some(self.feature(feature)? - other.feature(feature)?)
    }
}

// ============================================================================
// SPOT
// ============================================================================

/// A detected object at one frame.
///
/// The base features (`POSITION_*`, `FRAME`, `RADIUS`, `QUALITY`) are backed
/// by dedicated fields and can be read and written through the generic
/// feature accessors like any analyzer-computed feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spot {
    id: ObjectId,

    /// User-supplied name (defaults to `ID<id>`)
    name: String,

    frame: i32,

    /// Position [x, y, z]
    position: Vector3<f64>,

    /// Features other than the position and the frame
    features: HashMap<FeatureKey, f64>,
}

impl Spot {
    /// Creates a spot with a fresh id from `alloc`.
    pub fn new(alloc: &dyn IdAllocator, x: f64, y: f64, z: f64, radius: f64, quality: f64) -> Self {
        Self::build(alloc.claim(None), None, x, y, z, radius, quality)
    }

    /// Creates a spot with an explicit id, raising the allocator floor past it.
    pub fn with_id(
        alloc: &dyn IdAllocator,
        id: ObjectId,
        x: f64,
        y: f64,
        z: f64,
        radius: f64,
        quality: f64,
    ) -> Self {
        Self::build(alloc.claim(Some(id)), None, x, y, z, radius, quality)
    }

    fn build(
        id: ObjectId,
        name: Option<String>,
        x: f64,
        y: f64,
        z: f64,
        radius: f64,
        quality: f64,
    ) -> Self {
        let mut features = HashMap::new();
        features.insert(RADIUS, radius);
        features.insert(QUALITY, quality);
        features.insert(POSITION_T, 0.0);

        Self {
            id,
            name: name.unwrap_or_else(|| format!("ID{}", id.0)),
            frame: 0,
            position: Vector3::new(x, y, z),
            features,
        }
    }

    /// Sets the frame.
    pub fn at_frame(mut self, frame: i32) -> Self {
        self.frame = frame;
        self
    }

    /// Sets the physical time (`POSITION_T`).
    pub fn at_time(mut self, t: f64) -> Self {
        self.features.insert(POSITION_T, t);
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Position as a vector.
    pub fn position_vector(&self) -> Vector3<f64> {
        self.position
    }

    pub fn radius(&self) -> f64 {
        self.features.get(&RADIUS).copied().unwrap_or(0.0)
    }

    pub fn quality(&self) -> f64 {
        self.features.get(&QUALITY).copied().unwrap_or(0.0)
    }

    /// All feature values, base features included.
    pub fn features(&self) -> HashMap<FeatureKey, f64> {
        let mut all = self.features.clone();
        all.insert(POSITION_X, self.position.x);
        all.insert(POSITION_Y, self.position.y);
        all.insert(POSITION_Z, self.position.z);
        all.insert(FRAME, self.frame as f64);
        all
    }
}

impl TrackableObject for Spot {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn frame(&self) -> i32 {
        self.frame
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn position(&self) -> &[f64] {
        self.position.as_slice()
    }

    fn feature(&self, feature: &str) -> Option<f64> {
        match feature {
            "POSITION_X" => Some(self.position.x),
            "POSITION_Y" => Some(self.position.y),
            "POSITION_Z" => Some(self.position.z),
            "FRAME" => Some(self.frame as f64),
            _ => self.features.get(feature).copied(),
        }
    }

    fn put_feature(&mut self, feature: FeatureKey, value: f64) {
        match feature.as_str() {
            "POSITION_X" => self.position.x = value,
            "POSITION_Y" => self.position.y = value,
            "POSITION_Z" => self.position.z = value,
            "FRAME" => self.frame = value as i32,
            _ => {
                self.features.insert(feature, value);
            }
        }
    }
}

impl PartialEq for Spot {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Spot {}

impl Hash for Spot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Spot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Spot {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for Spot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "ID{}", self.id.0)
        } else {
            f.write_str(&self.name)
        }
    }
}
