//! Hotkey-driven scan pipeline.

pub mod orchestrator;
pub mod state;

pub use orchestrator::{
    BUSY_NOTICE, Collaborators, Orchestrator, OrchestratorHandle, PipelineSettings, RESET_NOTICE,
};
pub use state::{HotkeyEvent, PipelineState};
