//! Pipeline orchestration
//!
//! Holds the catalog, the current classifier and the status shown to the
//! operator, and sequences load → extract → train → predict over them.

mod orchestrator;
mod state;


pub use orchestrator::{OrchestratorConfig, PipelineOrchestrator};
pub use state::{
    LoadOutcome, PipelineSnapshot, PipelineState, PipelineStatus, MSG_LOADING, MSG_NO_RECORDS,
    MSG_TRAINED, MSG_TRAINING,
};
