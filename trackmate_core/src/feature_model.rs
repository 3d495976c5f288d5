//! The FEATURE model - declarations and values of spot, edge and track features.
//!
//! Three parallel registries (spot, edge, track) map each declared feature
//! to its display name, short name, dimension and integer flag. A feature
//! must be declared before its metadata can be queried, and a declaration
//! is all-or-nothing: every input is validated before anything is written.
//!
//! Edge and track values are stored here as a two-level map
//! `entity -> (feature -> value)`. Spot values live on the spots themselves.
//!
//! # Concurrency
//!
//! The outer value maps are `DashMap`s: creating the per-entity map is an
//! atomic compute-if-absent, and once it exists writes to different
//! entities only take shared shard locks. Registries sit behind a `RwLock`
//! each so analyzers can declare features through a shared reference.

use crate::features::{
    Dimension, FeatureDeclarations, FeatureKey, FeatureKind, BASE_SPOT_FEATURES,
};
use crate::track_model::TrackModel;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use trackmate_env::{EdgeId, TrackId};

// ============================================================================
// ERRORS
// ============================================================================

/// The metadata field a declaration is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    Name,
    ShortName,
    Dimension,
    IsInt,
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataField::Name => f.write_str("a name"),
            MetadataField::ShortName => f.write_str("a short name"),
            MetadataField::Dimension => f.write_str("a dimension"),
            MetadataField::IsInt => f.write_str("the isInt flag"),
        }
    }
}

/// Errors raised by feature declaration, lookup and computation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeatureError {
    #[error("{kind} feature {feature} misses {field}")]
    MissingMetadata {
        kind: FeatureKind,
        feature: FeatureKey,
        field: MetadataField,
    },

    #[error("Unknown {kind} feature: {feature}")]
    UnknownFeature { kind: FeatureKind, feature: String },

    #[error("Unknown edge: {0}")]
    UnknownEdge(EdgeId),

    #[error("Unknown track: {0}")]
    UnknownTrack(TrackId),

    #[error("Unknown spot: {0}")]
    UnknownSpot(trackmate_env::ObjectId),
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Declarations for one entity kind.
///
/// Invariant: `names`, `short_names`, `dimensions` and `is_int` always have
/// exactly the keys listed in `features`.
#[derive(Debug, Clone, Default)]
struct FeatureRegistry {
    features: Vec<FeatureKey>,
    names: HashMap<FeatureKey, String>,
    short_names: HashMap<FeatureKey, String>,
    dimensions: HashMap<FeatureKey, Dimension>,
    is_int: HashMap<FeatureKey, bool>,
}

impl FeatureRegistry {
    fn declare(
        &mut self,
        kind: FeatureKind,
        features: &[FeatureKey],
        names: &HashMap<FeatureKey, String>,
        short_names: &HashMap<FeatureKey, String>,
        dimensions: &HashMap<FeatureKey, Dimension>,
        is_int: &HashMap<FeatureKey, bool>,
    ) -> Result<(), FeatureError> {
        // Validate everything before touching the registry
        for feature in features {
            let missing = if !names.contains_key(feature) {
                Some(MetadataField::Name)
            } else if !short_names.contains_key(feature) {
                Some(MetadataField::ShortName)
            } else if !dimensions.contains_key(feature) {
                Some(MetadataField::Dimension)
            } else if !is_int.contains_key(feature) {
                Some(MetadataField::IsInt)
            } else {
                None
            };

            if let Some(field) = missing {
                return Err(FeatureError::MissingMetadata {
                    kind,
                    feature: feature.clone(),
                    field,
                });
            }
        }

        for feature in features {
            self.insert(
                feature.clone(),
                names[feature].clone(),
                short_names[feature].clone(),
                dimensions[feature],
                is_int[feature],
            );
        }

        Ok(())
    }

    /// Stores one complete declaration, overwriting earlier metadata.
    fn insert(
        &mut self,
        feature: FeatureKey,
        name: String,
        short_name: String,
        dimension: Dimension,
        is_int: bool,
    ) {
        if !self.names.contains_key(&feature) {
            self.features.push(feature.clone());
        }
        self.names.insert(feature.clone(), name);
        self.short_names.insert(feature.clone(), short_name);
        self.dimensions.insert(feature.clone(), dimension);
        self.is_int.insert(feature, is_int);
    }

    fn contains(&self, feature: &str) -> bool {
        self.names.contains_key(feature)
    }

    fn write_declarations(&self, out: &mut String) {
        for feature in &self.features {
            out.push_str(&format!(
                "   - {}: {}, '{}' ({})",
                feature, self.names[feature], self.short_names[feature], self.dimensions[feature]
            ));
            if self.is_int[feature] {
                out.push_str(" - integer valued.\n");
            } else {
                out.push_str(" - double valued.\n");
            }
        }
    }
}

// ============================================================================
// FEATURE MODEL
// ============================================================================

/// Feature declarations and edge/track feature values of one model.
#[derive(Debug)]
pub struct FeatureModel {
    spot_registry: RwLock<FeatureRegistry>,
    edge_registry: RwLock<FeatureRegistry>,
    track_registry: RwLock<FeatureRegistry>,

    /// edge -> (feature -> value)
    edge_values: DashMap<EdgeId, DashMap<FeatureKey, f64>>,

    /// track -> (feature -> value)
    track_values: DashMap<TrackId, DashMap<FeatureKey, f64>>,
}

impl Default for FeatureModel {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureModel {
    /// Creates a feature model with the base spot features declared and no
    /// edge or track features.
    pub fn new() -> Self {
        let mut spot_registry = FeatureRegistry::default();
        for (feature, name, short_name, dimension, is_int) in BASE_SPOT_FEATURES {
            spot_registry.insert(feature, name.to_string(), short_name.to_string(), dimension, is_int);
        }

        Self {
            spot_registry: RwLock::new(spot_registry),
            edge_registry: RwLock::new(FeatureRegistry::default()),
            track_registry: RwLock::new(FeatureRegistry::default()),
            edge_values: DashMap::new(),
            track_values: DashMap::new(),
        }
    }

    fn registry(&self, kind: FeatureKind) -> &RwLock<FeatureRegistry> {
        match kind {
            FeatureKind::Spot => &self.spot_registry,
            FeatureKind::Edge => &self.edge_registry,
            FeatureKind::Track => &self.track_registry,
        }
    }

    // ========================================================================
    // DECLARATIONS
    // ========================================================================

    /// Declares features of the given kind.
    ///
    /// Fails with `MissingMetadata` if any feature is absent from any of the
    /// four maps; in that case nothing is declared.
    pub fn declare_features(
        &self,
        kind: FeatureKind,
        features: &[FeatureKey],
        names: &HashMap<FeatureKey, String>,
        short_names: &HashMap<FeatureKey, String>,
        dimensions: &HashMap<FeatureKey, Dimension>,
        is_int: &HashMap<FeatureKey, bool>,
    ) -> Result<(), FeatureError> {
        self.registry(kind)
            .write()
            .declare(kind, features, names, short_names, dimensions, is_int)
    }

    pub fn declare_spot_features(
        &self,
        features: &[FeatureKey],
        names: &HashMap<FeatureKey, String>,
        short_names: &HashMap<FeatureKey, String>,
        dimensions: &HashMap<FeatureKey, Dimension>,
        is_int: &HashMap<FeatureKey, bool>,
    ) -> Result<(), FeatureError> {
        self.declare_features(FeatureKind::Spot, features, names, short_names, dimensions, is_int)
    }

    pub fn declare_edge_features(
        &self,
        features: &[FeatureKey],
        names: &HashMap<FeatureKey, String>,
        short_names: &HashMap<FeatureKey, String>,
        dimensions: &HashMap<FeatureKey, Dimension>,
        is_int: &HashMap<FeatureKey, bool>,
    ) -> Result<(), FeatureError> {
        self.declare_features(FeatureKind::Edge, features, names, short_names, dimensions, is_int)
    }

    pub fn declare_track_features(
        &self,
        features: &[FeatureKey],
        names: &HashMap<FeatureKey, String>,
        short_names: &HashMap<FeatureKey, String>,
        dimensions: &HashMap<FeatureKey, Dimension>,
        is_int: &HashMap<FeatureKey, bool>,
    ) -> Result<(), FeatureError> {
        self.declare_features(FeatureKind::Track, features, names, short_names, dimensions, is_int)
    }

    /// Declares every feature of a bundle.
    pub fn declare_from(
        &self,
        kind: FeatureKind,
        decl: &FeatureDeclarations,
    ) -> Result<(), FeatureError> {
        self.declare_features(
            kind,
            &decl.features,
            &decl.names,
            &decl.short_names,
            &decl.dimensions,
            &decl.is_int,
        )
    }

    /// Returns true if `feature` is declared for `kind`.
    pub fn is_declared(&self, kind: FeatureKind, feature: &str) -> bool {
        self.registry(kind).read().contains(feature)
    }

    fn unknown(kind: FeatureKind, feature: &str) -> FeatureError {
        FeatureError::UnknownFeature {
            kind,
            feature: feature.to_string(),
        }
    }

    /// Display name of a declared feature.
    pub fn feature_name(&self, kind: FeatureKind, feature: &str) -> Result<String, FeatureError> {
        self.registry(kind)
            .read()
            .names
            .get(feature)
            .cloned()
            .ok_or_else(|| Self::unknown(kind, feature))
    }

    /// Short name of a declared feature.
    pub fn feature_short_name(&self, kind: FeatureKind, feature: &str) -> Result<String, FeatureError> {
        self.registry(kind)
            .read()
            .short_names
            .get(feature)
            .cloned()
            .ok_or_else(|| Self::unknown(kind, feature))
    }

    /// Dimension of a declared feature.
    pub fn feature_dimension(&self, kind: FeatureKind, feature: &str) -> Result<Dimension, FeatureError> {
        self.registry(kind)
            .read()
            .dimensions
            .get(feature)
            .copied()
            .ok_or_else(|| Self::unknown(kind, feature))
    }

    /// Integer flag of a declared feature.
    pub fn feature_is_int(&self, kind: FeatureKind, feature: &str) -> Result<bool, FeatureError> {
        self.registry(kind)
            .read()
            .is_int
            .get(feature)
            .copied()
            .ok_or_else(|| Self::unknown(kind, feature))
    }

    /// Declared features of `kind`, in declaration order.
    pub fn features(&self, kind: FeatureKind) -> Vec<FeatureKey> {
        self.registry(kind).read().features.clone()
    }

    pub fn feature_names(&self, kind: FeatureKind) -> HashMap<FeatureKey, String> {
        self.registry(kind).read().names.clone()
    }

    pub fn feature_short_names(&self, kind: FeatureKind) -> HashMap<FeatureKey, String> {
        self.registry(kind).read().short_names.clone()
    }

    pub fn feature_dimensions(&self, kind: FeatureKind) -> HashMap<FeatureKey, Dimension> {
        self.registry(kind).read().dimensions.clone()
    }

    pub fn feature_is_int_map(&self, kind: FeatureKind) -> HashMap<FeatureKey, bool> {
        self.registry(kind).read().is_int.clone()
    }

    pub fn spot_features(&self) -> Vec<FeatureKey> {
        self.features(FeatureKind::Spot)
    }

    pub fn spot_feature_names(&self) -> HashMap<FeatureKey, String> {
        self.feature_names(FeatureKind::Spot)
    }

    pub fn spot_feature_short_names(&self) -> HashMap<FeatureKey, String> {
        self.feature_short_names(FeatureKind::Spot)
    }

    pub fn spot_feature_dimensions(&self) -> HashMap<FeatureKey, Dimension> {
        self.feature_dimensions(FeatureKind::Spot)
    }

    pub fn spot_feature_is_int(&self) -> HashMap<FeatureKey, bool> {
        self.feature_is_int_map(FeatureKind::Spot)
    }

    pub fn edge_features(&self) -> Vec<FeatureKey> {
        self.features(FeatureKind::Edge)
    }

    pub fn edge_feature_names(&self) -> HashMap<FeatureKey, String> {
        self.feature_names(FeatureKind::Edge)
    }

    pub fn edge_feature_short_names(&self) -> HashMap<FeatureKey, String> {
        self.feature_short_names(FeatureKind::Edge)
    }

    pub fn edge_feature_dimensions(&self) -> HashMap<FeatureKey, Dimension> {
        self.feature_dimensions(FeatureKind::Edge)
    }

    pub fn edge_feature_is_int(&self) -> HashMap<FeatureKey, bool> {
        self.feature_is_int_map(FeatureKind::Edge)
    }

    pub fn track_features(&self) -> Vec<FeatureKey> {
        self.features(FeatureKind::Track)
    }

    pub fn track_feature_names(&self) -> HashMap<FeatureKey, String> {
        self.feature_names(FeatureKind::Track)
    }

    pub fn track_feature_short_names(&self) -> HashMap<FeatureKey, String> {
        self.feature_short_names(FeatureKind::Track)
    }

    pub fn track_feature_dimensions(&self) -> HashMap<FeatureKey, Dimension> {
        self.feature_dimensions(FeatureKind::Track)
    }

    pub fn track_feature_is_int(&self) -> HashMap<FeatureKey, bool> {
        self.feature_is_int_map(FeatureKind::Track)
    }

    // ========================================================================
    // EDGE VALUES
    // ========================================================================

    /// Stores an edge feature value.
    ///
    /// No check is made that the edge exists or that the feature is declared.
    pub fn put_edge_feature(&self, edge: EdgeId, feature: impl Into<FeatureKey>, value: f64) {
        let feature = feature.into();
        if let Some(map) = self.edge_values.get(&edge) {
            map.insert(feature, value);
            return;
        }
        self.edge_values.entry(edge).or_default().insert(feature, value);
    }

    /// Returns an edge feature value, `None` if it was never written.
    pub fn get_edge_feature(&self, edge: EdgeId, feature: &str) -> Option<f64> {
        self.edge_values
            .get(&edge)
            .and_then(|map| map.get(feature).map(|v| *v))
    }

    /// Snapshot of all feature values of one edge.
    pub fn edge_features_of(&self, edge: EdgeId) -> HashMap<FeatureKey, f64> {
        self.edge_values
            .get(&edge)
            .map(|map| map.iter().map(|e| (e.key().clone(), *e.value())).collect())
            .unwrap_or_default()
    }

    /// Values of an edge feature for every edge of the visible (or all)
    /// tracks, track by track in partition order.
    ///
    /// Fails with `UnknownFeature` before iterating if the feature is not
    /// declared.
    pub fn edge_feature_values(
        &self,
        tracks: &TrackModel,
        feature: &str,
        visible_only: bool,
    ) -> Result<Vec<Option<f64>>, FeatureError> {
        if !self.is_declared(FeatureKind::Edge, feature) {
            return Err(Self::unknown(FeatureKind::Edge, feature));
        }

        let mut values = Vec::new();
        for track_id in tracks.track_ids(visible_only) {
            for edge in tracks.track_edges(track_id) {
                values.push(self.get_edge_feature(edge, feature));
            }
        }
        Ok(values)
    }

    // ========================================================================
    // TRACK VALUES
    // ========================================================================

    /// Stores a track feature value.
    ///
    /// No check is made that the track exists or that the feature is declared.
    pub fn put_track_feature(&self, track: TrackId, feature: impl Into<FeatureKey>, value: f64) {
        let feature = feature.into();
        if let Some(map) = self.track_values.get(&track) {
            map.insert(feature, value);
            return;
        }
        self.track_values.entry(track).or_default().insert(feature, value);
    }

    /// Returns a track feature value.
    ///
    /// A track that never received any feature yields `None`, like a track
    /// missing only this one.
    pub fn get_track_feature(&self, track: TrackId, feature: &str) -> Option<f64> {
        self.track_values
            .get(&track)
            .and_then(|map| map.get(feature).map(|v| *v))
    }

    /// Snapshot of all feature values of one track.
    pub fn track_features_of(&self, track: TrackId) -> HashMap<FeatureKey, f64> {
        self.track_values
            .get(&track)
            .map(|map| map.iter().map(|e| (e.key().clone(), *e.value())).collect())
            .unwrap_or_default()
    }

    /// Snapshot of every stored track value.
    pub fn all_track_feature_values(&self) -> HashMap<TrackId, HashMap<FeatureKey, f64>> {
        self.track_values
            .iter()
            .map(|entry| {
                let values = entry
                    .value()
                    .iter()
                    .map(|e| (e.key().clone(), *e.value()))
                    .collect();
                (*entry.key(), values)
            })
            .collect()
    }

    /// Values of a track feature, one slot per visible (or every) track.
    ///
    /// Fails with `UnknownFeature` before iterating if the feature is not
    /// declared.
    pub fn track_feature_values(
        &self,
        tracks: &TrackModel,
        feature: &str,
        visible_only: bool,
    ) -> Result<Vec<Option<f64>>, FeatureError> {
        if !self.is_declared(FeatureKind::Track, feature) {
            return Err(Self::unknown(FeatureKind::Track, feature));
        }

        Ok(tracks
            .track_ids(visible_only)
            .into_iter()
            .map(|track_id| self.get_track_feature(track_id, feature))
            .collect())
    }

    /// For every declared track feature, one slot per track (all tracks, in
    /// partition order). Tracks without a value hold `None`; slots are never
    /// skipped or zero-filled.
    pub fn track_feature_values_by_feature(
        &self,
        tracks: &TrackModel,
    ) -> HashMap<FeatureKey, Vec<Option<f64>>> {
        let track_ids = tracks.track_ids(false);
        self.track_features()
            .into_iter()
            .map(|feature| {
                let values = track_ids
                    .iter()
                    .map(|&track_id| self.get_track_feature(track_id, &feature))
                    .collect();
                (feature, values)
            })
            .collect()
    }

    // ========================================================================
    // REPORTING
    // ========================================================================

    /// Full dump of declarations and stored values.
    pub fn echo(&self) -> String {
        let mut out = String::new();

        out.push_str("Spot features:\n - Declared:\n");
        self.spot_registry.read().write_declarations(&mut out);
        out.push('\n');

        out.push_str("Edge features:\n - Declared:\n");
        self.edge_registry.read().write_declarations(&mut out);
        out.push('\n');
        out.push_str(" - Values:\n");
        write_values(&mut out, &self.edge_values);

        out.push_str("Track features:\n - Declared:\n");
        self.track_registry.read().write_declarations(&mut out);
        out.push('\n');
        out.push_str(" - Values:\n");
        write_values(&mut out, &self.track_values);

        out
    }
}

fn write_values<K>(out: &mut String, values: &DashMap<K, DashMap<FeatureKey, f64>>)
where
    K: Ord + Copy + fmt::Display + std::hash::Hash + Eq,
{
    let mut keys: Vec<K> = values.iter().map(|e| *e.key()).collect();
    keys.sort();

    for key in keys {
        let Some(map) = values.get(&key) else { continue };
        out.push_str(&format!("   - {}:\n", key));

        let mut entries: Vec<(FeatureKey, f64)> =
            map.iter().map(|e| (e.key().clone(), *e.value())).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (feature, value) in entries {
            out.push_str(&format!("     - {} = {}\n", feature, value));
        }
    }
}

impl fmt::Display for FeatureModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();

        out.push_str("Spot features declared:\n");
        self.spot_registry.read().write_declarations(&mut out);
        out.push('\n');

        out.push_str("Edge features declared:\n");
        self.edge_registry.read().write_declarations(&mut out);
        out.push('\n');

        out.push_str("Track features declared:\n");
        self.track_registry.read().write_declarations(&mut out);
        out.push('\n');

        f.write_str(&out)
    }
}
