//! Spots of a model, indexed by id and by frame.

use crate::trackable::TrackableObject;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use trackmate_env::ObjectId;

/// Owning store of the model's trackable objects.
#[derive(Debug, Clone)]
pub struct SpotCollection<T: TrackableObject> {
    by_id: HashMap<ObjectId, T>,

    /// frame -> spot ids in that frame
    by_frame: BTreeMap<i32, BTreeSet<ObjectId>>,
}

impl<T: TrackableObject> Default for SpotCollection<T> {
    fn default() -> Self {
        Self {
            by_id: HashMap::new(),
            by_frame: BTreeMap::new(),
        }
    }
}

impl<T: TrackableObject> SpotCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a spot. Returns false (and drops nothing) if the id is taken.
    pub(crate) fn insert(&mut self, spot: T) -> bool {
        let id = spot.id();
        if self.by_id.contains_key(&id) {
            return false;
        }
        self.by_frame.entry(spot.frame()).or_default().insert(id);
        self.by_id.insert(id, spot);
        true
    }

    pub(crate) fn remove(&mut self, id: ObjectId) -> Option<T> {
        let spot = self.by_id.remove(&id)?;
        self.unindex(spot.frame(), id);
        Some(spot)
    }

    pub(crate) fn get_mut(&mut self, id: ObjectId) -> Option<&mut T> {
        self.by_id.get_mut(&id)
    }

    /// Moves a spot to the frame it now reports, if it changed.
    pub(crate) fn reindex(&mut self, id: ObjectId) {
        let Some(frame) = self.by_id.get(&id).map(|s| s.frame()) else {
            return;
        };
        let stale: Vec<i32> = self
            .by_frame
            .iter()
            .filter(|(f, ids)| **f != frame && ids.contains(&id))
            .map(|(f, _)| *f)
            .collect();
        if stale.is_empty() {
            return;
        }
        for old in stale {
            self.unindex(old, id);
        }
        self.by_frame.entry(frame).or_default().insert(id);
    }

    fn unindex(&mut self, frame: i32, id: ObjectId) {
        if let Some(ids) = self.by_frame.get_mut(&frame) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_frame.remove(&frame);
            }
        }
    }

    pub(crate) fn clear(&mut self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.by_id.keys().copied().collect();
        ids.sort();
        self.by_id.clear();
        self.by_frame.clear();
        ids
    }

    pub fn get(&self, id: ObjectId) -> Option<&T> {
        self.by_id.get(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Frames holding at least one spot, ascending.
    pub fn frames(&self) -> Vec<i32> {
        self.by_frame.keys().copied().collect()
    }

    /// Spots of one frame, in id order.
    pub fn in_frame(&self, frame: i32) -> Vec<&T> {
        self.by_frame
            .get(&frame)
            .into_iter()
            .flatten()
            .filter_map(|id| self.by_id.get(id))
            .collect()
    }

    /// Every spot, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let mut spots: Vec<&T> = self.by_id.values().collect();
        spots.sort();
        spots.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FRAME;
    use crate::trackable::Spot;
    use trackmate_env::CounterIdAllocator;

    #[test]
    fn test_insert_and_frames() {
        let alloc = CounterIdAllocator::new();
        let mut spots = SpotCollection::new();

        for frame in [2, 0, 2, 1] {
            assert!(spots.insert(Spot::new(&alloc, 0.0, 0.0, 0.0, 1.0, 0.0).at_frame(frame)));
        }

        assert_eq!(spots.len(), 4);
        assert_eq!(spots.frames(), vec![0, 1, 2]);
        assert_eq!(spots.in_frame(2).len(), 2);
        assert!(spots.in_frame(7).is_empty());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let alloc = CounterIdAllocator::new();
        let mut spots = SpotCollection::new();
        let spot = Spot::new(&alloc, 0.0, 0.0, 0.0, 1.0, 0.0);

        assert!(spots.insert(spot.clone()));
        assert!(!spots.insert(spot));
        assert_eq!(spots.len(), 1);
    }

    #[test]
    fn test_reindex_after_frame_change() {
        let alloc = CounterIdAllocator::new();
        let mut spots = SpotCollection::new();
        let spot = Spot::new(&alloc, 0.0, 0.0, 0.0, 1.0, 0.0).at_frame(1);
        let id = spot.id();
        spots.insert(spot);

        spots.get_mut(id).unwrap().put_feature(FRAME, 5.0);
        spots.reindex(id);

        assert_eq!(spots.frames(), vec![5]);
        assert_eq!(spots.in_frame(5)[0].id(), id);
    }

    #[test]
    fn test_remove_and_clear() {
        let alloc = CounterIdAllocator::new();
        let mut spots = SpotCollection::new();
        let a = Spot::new(&alloc, 0.0, 0.0, 0.0, 1.0, 0.0);
        let b = Spot::new(&alloc, 0.0, 0.0, 0.0, 1.0, 0.0).at_frame(3);
        let (ida, idb) = (a.id(), b.id());
        spots.insert(a);
        spots.insert(b);

        assert_eq!(spots.remove(ida).map(|s| s.id()), Some(ida));
        assert_eq!(spots.frames(), vec![3]);
        assert_eq!(spots.clear(), vec![idb]);
        assert!(spots.is_empty());
    }
}
