//! Feature keys, physical dimensions and declaration bundles.
//!
//! Features are plugin-contributed and only known at runtime, so they are
//! identified by a typed string key rather than a compile-time type. The
//! base spot features every model starts with are defined here.

use serde::{Deserialize, Serialize};
use std::borrow::{Borrow, Cow};
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;

// ============================================================================
// FEATURE KEY
// ============================================================================

/// Name of a feature, e.g. `"VELOCITY"`.
///
/// Hashes and compares like the underlying string, so maps keyed by
/// `FeatureKey` can be queried with a plain `&str`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureKey(Cow<'static, str>);

impl FeatureKey {
    /// Creates a key from a static string without allocating.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Creates a key from any string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for FeatureKey {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for FeatureKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FeatureKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FeatureKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for FeatureKey {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// DIMENSION
// ============================================================================

/// Physical dimension of a feature, used to derive its display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    None,
    Quality,
    Intensity,
    IntensitySquared,
    Position,
    Velocity,
    Length,
    Area,
    Time,
    Angle,
    Rate,
    AngleRate,
    String,
}

impl Dimension {
    /// Returns the unit label for this dimension.
    ///
    /// ```
    /// use trackmate_core::Dimension;
    ///
    /// assert_eq!(Dimension::Velocity.units("µm", "s"), "µm/s");
    /// assert_eq!(Dimension::Area.units("µm", "s"), "µm^2");
    /// ```
    pub fn units(&self, space_units: &str, time_units: &str) -> String {
        match self {
            Dimension::None | Dimension::String => String::new(),
            Dimension::Quality => "Quality".to_string(),
            Dimension::Intensity => "Counts".to_string(),
            Dimension::IntensitySquared => "Counts^2".to_string(),
            Dimension::Position | Dimension::Length => space_units.to_string(),
            Dimension::Area => format!("{}^2", space_units),
            Dimension::Velocity => format!("{}/{}", space_units, time_units),
            Dimension::Time => time_units.to_string(),
            Dimension::Angle => "Radians".to_string(),
            Dimension::Rate => format!("/{}", time_units),
            Dimension::AngleRate => format!("Rad/{}", time_units),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::None => "NONE",
            Dimension::Quality => "QUALITY",
            Dimension::Intensity => "INTENSITY",
            Dimension::IntensitySquared => "INTENSITY_SQUARED",
            Dimension::Position => "POSITION",
            Dimension::Velocity => "VELOCITY",
            Dimension::Length => "LENGTH",
            Dimension::Area => "AREA",
            Dimension::Time => "TIME",
            Dimension::Angle => "ANGLE",
            Dimension::Rate => "RATE",
            Dimension::AngleRate => "ANGLE_RATE",
            Dimension::String => "STRING",
        };
        f.write_str(name)
    }
}

// ============================================================================
// FEATURE KIND
// ============================================================================

/// The entity a feature is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    Spot,
    Edge,
    Track,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKind::Spot => f.write_str("spot"),
            FeatureKind::Edge => f.write_str("edge"),
            FeatureKind::Track => f.write_str("track"),
        }
    }
}

// ============================================================================
// DECLARATION BUNDLE
// ============================================================================

/// A set of features together with their four metadata mappings.
///
/// Analyzers build one of these to describe what they compute. The maps are
/// public so that incomplete declarations can be expressed (and rejected by
/// the feature model).
#[derive(Debug, Clone, Default)]
pub struct FeatureDeclarations {
    /// Feature keys, in declaration order
    pub features: Vec<FeatureKey>,

    /// Display names
    pub names: HashMap<FeatureKey, String>,

    /// Short names (column headers)
    pub short_names: HashMap<FeatureKey, String>,

    /// Physical dimensions
    pub dimensions: HashMap<FeatureKey, Dimension>,

    /// `true` for integer-valued features
    pub is_int: HashMap<FeatureKey, bool>,
}

impl FeatureDeclarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fully described feature.
    pub fn with(
        mut self,
        feature: FeatureKey,
        name: &str,
        short_name: &str,
        dimension: Dimension,
        is_int: bool,
    ) -> Self {
        self.push(feature, name, short_name, dimension, is_int);
        self
    }

    /// Adds a fully described feature in place.
    pub fn push(
        &mut self,
        feature: FeatureKey,
        name: &str,
        short_name: &str,
        dimension: Dimension,
        is_int: bool,
    ) {
        if !self.features.contains(&feature) {
            self.features.push(feature.clone());
        }
        self.names.insert(feature.clone(), name.to_string());
        self.short_names.insert(feature.clone(), short_name.to_string());
        self.dimensions.insert(feature.clone(), dimension);
        self.is_int.insert(feature, is_int);
    }

    /// Appends every feature of `other`, keeping its metadata.
    pub fn extend(&mut self, other: &FeatureDeclarations) {
        for feature in &other.features {
            if !self.features.contains(feature) {
                self.features.push(feature.clone());
            }
        }
        self.names.extend(other.names.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.short_names.extend(other.short_names.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.dimensions.extend(other.dimensions.iter().map(|(k, v)| (k.clone(), *v)));
        self.is_int.extend(other.is_int.iter().map(|(k, v)| (k.clone(), *v)));
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f.as_str() == feature)
    }
}

// ============================================================================
// BASE SPOT FEATURES
// ============================================================================

/// Detection quality.
pub const QUALITY: FeatureKey = FeatureKey::from_static("QUALITY");
pub const POSITION_X: FeatureKey = FeatureKey::from_static("POSITION_X");
pub const POSITION_Y: FeatureKey = FeatureKey::from_static("POSITION_Y");
pub const POSITION_Z: FeatureKey = FeatureKey::from_static("POSITION_Z");
/// Physical time of the spot (frame index times frame interval).
pub const POSITION_T: FeatureKey = FeatureKey::from_static("POSITION_T");
pub const FRAME: FeatureKey = FeatureKey::from_static("FRAME");
pub const RADIUS: FeatureKey = FeatureKey::from_static("RADIUS");

/// The spatial position features, indexed by axis.
pub const POSITION_FEATURES: [FeatureKey; 3] = [POSITION_X, POSITION_Y, POSITION_Z];

/// Name, short name, dimension and integer flag of every base spot feature.
pub const BASE_SPOT_FEATURES: [(FeatureKey, &str, &str, Dimension, bool); 7] = [
    (QUALITY, "Quality", "Quality", Dimension::Quality, false),
    (POSITION_X, "X", "X", Dimension::Position, false),
    (POSITION_Y, "Y", "Y", Dimension::Position, false),
    (POSITION_Z, "Z", "Z", Dimension::Position, false),
    (POSITION_T, "T", "T", Dimension::Time, false),
    (FRAME, "Frame", "Frame", Dimension::None, true),
    (RADIUS, "Radius", "R", Dimension::Length, false),
];

/// Declarations of the features every spot carries.
pub fn base_spot_declarations() -> FeatureDeclarations {
    let mut declarations = FeatureDeclarations::new();
    for (feature, name, short_name, dimension, is_int) in BASE_SPOT_FEATURES {
        declarations.push(feature, name, short_name, dimension, is_int);
    }
    declarations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_key_borrows_as_str() {
        let mut map = HashMap::new();
        map.insert(POSITION_X, 1.0);
        map.insert(FeatureKey::new("CUSTOM"), 2.0);

        assert_eq!(map.get("POSITION_X"), Some(&1.0));
        assert_eq!(map.get("CUSTOM"), Some(&2.0));
        assert_eq!(FeatureKey::from("POSITION_X"), POSITION_X);
    }

    #[test]
    fn test_dimension_units() {
        assert_eq!(Dimension::Position.units("pixel", "frame"), "pixel");
        assert_eq!(Dimension::Velocity.units("pixel", "frame"), "pixel/frame");
        assert_eq!(Dimension::Rate.units("µm", "s"), "/s");
        assert_eq!(Dimension::None.units("µm", "s"), "");
        assert_eq!(Dimension::AngleRate.units("µm", "min"), "Rad/min");
    }

    #[test]
    fn test_base_spot_declarations_complete() {
        let decl = base_spot_declarations();
        assert_eq!(decl.len(), 7);
        for feature in &decl.features {
            assert!(decl.names.contains_key(feature));
            assert!(decl.short_names.contains_key(feature));
            assert!(decl.dimensions.contains_key(feature));
            assert!(decl.is_int.contains_key(feature));
        }
        assert_eq!(decl.is_int[&FRAME], true);
        assert_eq!(decl.short_names[&RADIUS], "R");
    }

    #[test]
    fn test_push_does_not_duplicate() {
        let mut decl = FeatureDeclarations::new();
        decl.push(FeatureKey::new("A"), "A", "A", Dimension::None, false);
        decl.push(FeatureKey::new("A"), "Alpha", "a", Dimension::Angle, false);

        assert_eq!(decl.len(), 1);
        assert_eq!(decl.names["A"], "Alpha");
        assert_eq!(decl.dimensions["A"], Dimension::Angle);
    }
}
