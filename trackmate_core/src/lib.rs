//! TrackMate Core - Feature & Event Model for Object Tracking
//!
//! This library holds the model layer of a time-lapse tracker:
//! 1. **Identity**: trackable objects with stable, collision-free ids
//! 2. **Graph**: spots linked by edges into tracks with stable track ids
//! 3. **Features**: declared per-spot, per-edge and per-track numeric values
//! 4. **Events**: batched update scopes collapsed into one change notification
//!
//! # Example
//!
//! ```
//! use trackmate_core::{Model, ModelFeatureUpdater, Spot};
//!
//! let mut model: Model<Spot> = Model::new();
//! let updater = ModelFeatureUpdater::with_default_analyzers(model.feature_model()).unwrap();
//! model.add_listener(updater);
//!
//! model.begin_update();
//! let a = Spot::new(model.allocator(), 0.0, 0.0, 0.0, 1.0, 0.0).at_time(0.0);
//! let b = Spot::new(model.allocator(), 3.0, 4.0, 0.0, 1.0, 0.0).at_frame(1).at_time(2.0);
//! let a = model.add_spot(a).unwrap();
//! let b = model.add_spot(b).unwrap();
//! let edge = model.add_edge(a, b, 1.0).unwrap();
//! model.end_update().unwrap();
//!
//! assert_eq!(model.feature_model().get_edge_feature(edge, "VELOCITY"), Some(2.5));
//! ```

pub mod edge_analyzers;
pub mod events;
pub mod feature_model;
pub mod feature_updater;
pub mod features;
pub mod model;
pub mod spot_collection;
pub mod track_analyzers;
pub mod track_model;
pub mod trackable;

// Re-export key types for convenience
pub use edge_analyzers::{EdgeAnalyzer, EdgeTargetAnalyzer, EdgeTimeLocationAnalyzer, EdgeVelocityAnalyzer};
pub use events::{ChangeFlag, EdgeChange, ListenerId, ModelChangeEvent, ModelChangeListener, ModelEventKind};
pub use feature_model::{FeatureError, FeatureModel, MetadataField};
pub use feature_updater::ModelFeatureUpdater;
pub use features::{Dimension, FeatureDeclarations, FeatureKey, FeatureKind};
pub use model::{EventReceiver, Model, ModelConfig, ModelError};
pub use spot_collection::SpotCollection;
pub use track_analyzers::{
    TrackAnalyzer, TrackBranchingAnalyzer, TrackDurationAnalyzer, TrackIndexAnalyzer,
    TrackSpeedStatisticsAnalyzer,
};
pub use track_model::{Edge, GraphError, TrackDiff, TrackModel};
pub use trackable::{Spot, TrackableObject};
pub use trackmate_env::{CounterIdAllocator, EdgeId, IdAllocator, ObjectId, TrackId};
