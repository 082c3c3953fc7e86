mod coordinator;
mod state;

pub use coordinator::{AutoSaveCoordinator, Persist, DEFAULT_AUTOSAVE_DELAY};
pub use state::{SaveEffect, SaveEvent, SaveMachine, SavePhase, SaveSnapshot};
