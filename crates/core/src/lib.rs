//! Domain model and pure logic for the Nunzio workout assistant.
//!
//! Nothing in this crate touches the network or the database; the db and
//! agent crates build on the types and algorithms defined here.

pub mod catalog;
pub mod commentary;
pub mod config;
pub mod domain;
pub mod errors;
pub mod sets;
pub mod stats;

pub use chrono;

pub use domain::exercise::{Exercise, ExerciseId};
pub use domain::intent::{
    Classification, ClassificationSource, ExtractedSet, ExtractedWorkout, ExtractionHints,
    IntentKind,
};
pub use domain::interaction::InteractionLogEntry;
pub use domain::principle::{PrincipleId, TrainingPrinciple};
pub use domain::workout::{
    CloneOverrides, ClonedSession, DeleteTarget, ExerciseHistory, Load, LoggedSet, NewSet,
    SessionDetail, SessionId, SetId, UserId, WeightUnit, WorkoutSession, WorkoutSet,
    WorkoutTotals,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
