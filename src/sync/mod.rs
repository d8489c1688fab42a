pub mod engine;
pub mod reconciler;
pub mod resolver;
pub mod saga;
pub mod steps;

pub use engine::SyncEngine;
pub use reconciler::ConflictReconciler;
pub use resolver::{
    ClassificationLookup, Lookup, RecordLookup, Resolvable, Resolver, TermLookup,
};
pub use saga::{CompensationFailure, Saga, SagaFailure, SagaStep};
pub use steps::AttributeSyncContext;
