//! Property tests for the track partition maintained by the model.

use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};
use trackmate_core::{Model, ObjectId, Spot, TrackId};

const N_SPOTS: usize = 12;

fn model_with_links(links: &[(usize, usize)]) -> (Model<Spot>, Vec<ObjectId>) {
    let mut model = Model::new();
    model.begin_update();
    let ids: Vec<ObjectId> = (0..N_SPOTS)
        .map(|k| {
            let spot = Spot::new(model.allocator(), k as f64, 0.0, 0.0, 1.0, 0.0).at_frame(k as i32);
            model.add_spot(spot).unwrap()
        })
        .collect();
    for &(a, b) in links {
        // Self loops and duplicates are rejected, which is fine here
        let _ = model.add_edge(ids[a], ids[b], 1.0);
    }
    model.end_update().unwrap();
    (model, ids)
}

fn links() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0..N_SPOTS, 0..N_SPOTS), 0..20)
}

proptest! {
    #[test]
    fn prop_partition_covers_every_edge(links in links()) {
        let (model, _) = model_with_links(&links);
        let tracks = model.track_model();

        let mut seen_edges = BTreeSet::new();
        let mut seen_spots = HashSet::new();
        for track in tracks.track_ids(false) {
            let spots: BTreeSet<ObjectId> = tracks.track_spots(track).into_iter().collect();
            for edge in tracks.track_edges(track) {
                let e = tracks.edge(edge).unwrap();
                prop_assert!(spots.contains(&e.source) && spots.contains(&e.target));
                prop_assert_eq!(tracks.track_id_of_edge(edge), Some(track));
                prop_assert!(seen_edges.insert(edge));
            }
            for spot in spots {
                prop_assert_eq!(tracks.track_id_of_spot(spot), Some(track));
                prop_assert!(seen_spots.insert(spot));
            }
        }
        prop_assert_eq!(seen_edges.len(), tracks.edge_count());
    }

    #[test]
    fn prop_tracks_have_edges(links in links()) {
        let (model, ids) = model_with_links(&links);
        let tracks = model.track_model();

        for track in tracks.track_ids(false) {
            prop_assert!(!tracks.track_edges(track).is_empty());
        }
        for id in ids {
            let linked = !tracks.edges_of(id).is_empty();
            prop_assert_eq!(tracks.track_id_of_spot(id).is_some(), linked);
        }
    }

    #[test]
    fn prop_unrelated_commit_keeps_ids(links in links()) {
        let (mut model, _) = model_with_links(&links);
        let before: Vec<TrackId> = model.track_model().track_ids(false);

        // A new, disconnected pair
        let a = Spot::new(model.allocator(), 0.0, 9.0, 0.0, 1.0, 0.0);
        let b = Spot::new(model.allocator(), 1.0, 9.0, 0.0, 1.0, 0.0).at_frame(1);
        let a = model.add_spot(a).unwrap();
        let b = model.add_spot(b).unwrap();
        model.add_edge(a, b, 1.0).unwrap();

        let after: Vec<TrackId> = model.track_model().track_ids(false);
        prop_assert_eq!(after.len(), before.len() + 1);
        for track in before {
            prop_assert!(after.contains(&track));
        }
    }
}
