//! Track analyzers - per-track features computed from a track's spots and
//! edges.

use crate::edge_analyzers::{displacement_and_speed, for_each};
use crate::feature_model::FeatureError;
use crate::features::{Dimension, FeatureDeclarations, FeatureKey, POSITION_T};
use crate::model::Model;
use crate::trackable::TrackableObject;
use std::collections::HashMap;
use trackmate_env::TrackId;

/// Computes track features and stores them in the model's feature model.
pub trait TrackAnalyzer<T: TrackableObject>: Send + Sync {
    /// Unique analyzer key.
    fn key(&self) -> &str;

    /// The features this analyzer writes.
    fn declarations(&self) -> FeatureDeclarations;

    /// True if a track's values depend on that track alone.
    fn is_local(&self) -> bool;

    /// Computes and stores the features of `tracks`.
    fn process(&self, tracks: &[TrackId], model: &Model<T>) -> Result<(), FeatureError>;
}

/// Spots of a track, resolved against the model, in id order.
fn track_spots<'a, T: TrackableObject>(
    model: &'a Model<T>,
    track: TrackId,
) -> Result<Vec<&'a T>, FeatureError> {
    if !model.track_model().contains_track(track) {
        return Err(FeatureError::UnknownTrack(track));
    }
    model
        .track_model()
        .track_spots(track)
        .into_iter()
        .map(|id| model.spot(id).ok_or(FeatureError::UnknownSpot(id)))
        .collect()
}

/// Endpoints of every edge of a track.
fn track_links<'a, T: TrackableObject>(
    model: &'a Model<T>,
    track: TrackId,
) -> Result<Vec<(&'a T, &'a T)>, FeatureError> {
    if !model.track_model().contains_track(track) {
        return Err(FeatureError::UnknownTrack(track));
    }
    model
        .track_model()
        .track_edges(track)
        .into_iter()
        .map(|id| {
            let edge = model.edge(id).ok_or(FeatureError::UnknownEdge(id))?;
            let source = model
                .spot(edge.source)
                .ok_or(FeatureError::UnknownSpot(edge.source))?;
            let target = model
                .spot(edge.target)
                .ok_or(FeatureError::UnknownSpot(edge.target))?;
            Ok((source, target))
        })
        .collect()
}

// ============================================================================
// INDEX
// ============================================================================

/// Track id and rank among all tracks.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackIndexAnalyzer;

impl TrackIndexAnalyzer {
    pub const KEY: &'static str = "Track index";
    pub const TRACK_INDEX: FeatureKey = FeatureKey::from_static("TRACK_INDEX");
    pub const TRACK_ID: FeatureKey = FeatureKey::from_static("TRACK_ID");
}

impl<T: TrackableObject> TrackAnalyzer<T> for TrackIndexAnalyzer {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn declarations(&self) -> FeatureDeclarations {
        FeatureDeclarations::new()
            .with(Self::TRACK_INDEX, "Track index", "Index", Dimension::None, true)
            .with(Self::TRACK_ID, "Track ID", "ID", Dimension::None, true)
    }

    fn is_local(&self) -> bool {
        false
    }

    fn process(&self, tracks: &[TrackId], model: &Model<T>) -> Result<(), FeatureError> {
        let all = model.track_model().track_ids(false);
        let features = model.feature_model();

        for &track in tracks {
            let index = all
                .binary_search(&track)
                .map_err(|_| FeatureError::UnknownTrack(track))?;
            features.put_track_feature(track, Self::TRACK_INDEX, index as f64);
            features.put_track_feature(track, Self::TRACK_ID, track.0 as f64);
        }
        Ok(())
    }
}

// ============================================================================
// BRANCHING
// ============================================================================

/// Spot count, gaps, splits and merges.
///
/// Edges are oriented from the earlier to the later frame. A gap is an
/// edge skipping at least one frame; a split is a spot with more than one
/// successor, a merge one with more than one predecessor.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackBranchingAnalyzer;

impl TrackBranchingAnalyzer {
    pub const KEY: &'static str = "Branching analyzer";
    pub const NUMBER_SPOTS: FeatureKey = FeatureKey::from_static("NUMBER_SPOTS");
    pub const NUMBER_GAPS: FeatureKey = FeatureKey::from_static("NUMBER_GAPS");
    pub const NUMBER_SPLITS: FeatureKey = FeatureKey::from_static("NUMBER_SPLITS");
    pub const NUMBER_MERGES: FeatureKey = FeatureKey::from_static("NUMBER_MERGES");
    pub const LONGEST_GAP: FeatureKey = FeatureKey::from_static("LONGEST_GAP");
}

impl<T: TrackableObject> TrackAnalyzer<T> for TrackBranchingAnalyzer {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn declarations(&self) -> FeatureDeclarations {
        FeatureDeclarations::new()
            .with(Self::NUMBER_SPOTS, "Number of spots in track", "N spots", Dimension::None, true)
            .with(Self::NUMBER_GAPS, "Number of gaps", "N gaps", Dimension::None, true)
            .with(Self::NUMBER_SPLITS, "Number of split events", "N splits", Dimension::None, true)
            .with(Self::NUMBER_MERGES, "Number of merge events", "N merges", Dimension::None, true)
            .with(Self::LONGEST_GAP, "Longest gap", "Longest gap", Dimension::None, true)
    }

    fn is_local(&self) -> bool {
        true
    }

    fn process(&self, tracks: &[TrackId], model: &Model<T>) -> Result<(), FeatureError> {
        let features = model.feature_model();

        for_each(tracks, model.config().parallel_analyzers, |&track| {
            let spots = track_spots(model, track)?;
            let links = track_links(model, track)?;

            let mut successors = HashMap::new();
            let mut predecessors = HashMap::new();
            let mut gaps = 0usize;
            let mut longest_gap = 0i32;

            for (a, b) in links {
                let (early, late) = if a.frame() <= b.frame() { (a, b) } else { (b, a) };
                *successors.entry(early.id()).or_insert(0usize) += 1;
                *predecessors.entry(late.id()).or_insert(0usize) += 1;

                let skipped = late.frame() - early.frame() - 1;
                if skipped > 0 {
                    gaps += 1;
                    longest_gap = longest_gap.max(skipped);
                }
            }

            let splits = successors.values().filter(|&&n| n > 1).count();
            let merges = predecessors.values().filter(|&&n| n > 1).count();

            features.put_track_feature(track, Self::NUMBER_SPOTS, spots.len() as f64);
            features.put_track_feature(track, Self::NUMBER_GAPS, gaps as f64);
            features.put_track_feature(track, Self::NUMBER_SPLITS, splits as f64);
            features.put_track_feature(track, Self::NUMBER_MERGES, merges as f64);
            features.put_track_feature(track, Self::LONGEST_GAP, longest_gap as f64);
            Ok(())
        })
    }
}

// ============================================================================
// DURATION
// ============================================================================

/// Start, stop, duration and net displacement of a track.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackDurationAnalyzer;

impl TrackDurationAnalyzer {
    pub const KEY: &'static str = "Track duration";
    pub const TRACK_DURATION: FeatureKey = FeatureKey::from_static("TRACK_DURATION");
    pub const TRACK_START: FeatureKey = FeatureKey::from_static("TRACK_START");
    pub const TRACK_STOP: FeatureKey = FeatureKey::from_static("TRACK_STOP");
    pub const TRACK_DISPLACEMENT: FeatureKey = FeatureKey::from_static("TRACK_DISPLACEMENT");
}

impl<T: TrackableObject> TrackAnalyzer<T> for TrackDurationAnalyzer {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn declarations(&self) -> FeatureDeclarations {
        FeatureDeclarations::new()
            .with(Self::TRACK_DURATION, "Duration of track", "Duration", Dimension::Time, false)
            .with(Self::TRACK_START, "Track start", "T start", Dimension::Time, false)
            .with(Self::TRACK_STOP, "Track stop", "T stop", Dimension::Time, false)
            .with(Self::TRACK_DISPLACEMENT, "Track displacement", "Displacement", Dimension::Length, false)
    }

    fn is_local(&self) -> bool {
        true
    }

    fn process(&self, tracks: &[TrackId], model: &Model<T>) -> Result<(), FeatureError> {
        let features = model.feature_model();

        for_each(tracks, model.config().parallel_analyzers, |&track| {
            let spots = track_spots(model, track)?;
            let time = |s: &T| s.feature(&POSITION_T).unwrap_or(0.0);

            // Ties keep the lowest id
            let first = spots
                .iter()
                .copied()
                .reduce(|best, s| if time(s) < time(best) { s } else { best });
            let last = spots
                .iter()
                .copied()
                .reduce(|best, s| if time(s) > time(best) { s } else { best });

            let (Some(first), Some(last)) = (first, last) else {
                return Ok(());
            };

            let start = time(first);
            let stop = time(last);
            features.put_track_feature(track, Self::TRACK_START, start);
            features.put_track_feature(track, Self::TRACK_STOP, stop);
            features.put_track_feature(track, Self::TRACK_DURATION, stop - start);
            features.put_track_feature(
                track,
                Self::TRACK_DISPLACEMENT,
                first.square_distance_to(last).sqrt(),
            );
            Ok(())
        })
    }
}

// ============================================================================
// SPEED STATISTICS
// ============================================================================

/// Statistics of the edge speeds of a track.
///
/// The standard deviation is the sample one (n - 1); it is 0 for a
/// single-edge track.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackSpeedStatisticsAnalyzer;

impl TrackSpeedStatisticsAnalyzer {
    pub const KEY: &'static str = "Track speed";
    pub const TRACK_MEAN_SPEED: FeatureKey = FeatureKey::from_static("TRACK_MEAN_SPEED");
    pub const TRACK_MAX_SPEED: FeatureKey = FeatureKey::from_static("TRACK_MAX_SPEED");
    pub const TRACK_MIN_SPEED: FeatureKey = FeatureKey::from_static("TRACK_MIN_SPEED");
    pub const TRACK_MEDIAN_SPEED: FeatureKey = FeatureKey::from_static("TRACK_MEDIAN_SPEED");
    pub const TRACK_STD_SPEED: FeatureKey = FeatureKey::from_static("TRACK_STD_SPEED");
}

/// (mean, max, min, median, std) of a non-empty sample.
fn speed_statistics(mut speeds: Vec<f64>) -> Option<(f64, f64, f64, f64, f64)> {
    if speeds.is_empty() {
        return None;
    }
    speeds.sort_by(|a, b| a.total_cmp(b));

    let n = speeds.len();
    let mean = speeds.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 1 {
        speeds[n / 2]
    } else {
        0.5 * (speeds[n / 2 - 1] + speeds[n / 2])
    };
    let std = if n > 1 {
        let ss: f64 = speeds.iter().map(|v| (v - mean) * (v - mean)).sum();
        (ss / (n - 1) as f64).sqrt()
    } else {
        0.0
    };

    Some((mean, speeds[n - 1], speeds[0], median, std))
}

impl<T: TrackableObject> TrackAnalyzer<T> for TrackSpeedStatisticsAnalyzer {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn declarations(&self) -> FeatureDeclarations {
        FeatureDeclarations::new()
            .with(Self::TRACK_MEAN_SPEED, "Mean velocity", "Mean V", Dimension::Velocity, false)
            .with(Self::TRACK_MAX_SPEED, "Maximal velocity", "Max V", Dimension::Velocity, false)
            .with(Self::TRACK_MIN_SPEED, "Minimal velocity", "Min V", Dimension::Velocity, false)
            .with(Self::TRACK_MEDIAN_SPEED, "Median velocity", "Median V", Dimension::Velocity, false)
            .with(Self::TRACK_STD_SPEED, "Velocity standard deviation", "V std", Dimension::Velocity, false)
    }

    fn is_local(&self) -> bool {
        true
    }

    fn process(&self, tracks: &[TrackId], model: &Model<T>) -> Result<(), FeatureError> {
        let features = model.feature_model();

        for_each(tracks, model.config().parallel_analyzers, |&track| {
            let speeds = track_links(model, track)?
                .into_iter()
                .map(|(a, b)| displacement_and_speed(a, b).1)
                .collect();

            if let Some((mean, max, min, median, std)) = speed_statistics(speeds) {
                features.put_track_feature(track, Self::TRACK_MEAN_SPEED, mean);
                features.put_track_feature(track, Self::TRACK_MAX_SPEED, max);
                features.put_track_feature(track, Self::TRACK_MIN_SPEED, min);
                features.put_track_feature(track, Self::TRACK_MEDIAN_SPEED, median);
                features.put_track_feature(track, Self::TRACK_STD_SPEED, std);
            }
            Ok(())
        })
    }
}
