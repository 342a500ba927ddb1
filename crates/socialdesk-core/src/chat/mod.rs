//! Chat turn orchestration.
//!
//! - `topic`: short conversation labels from the first prompt
//! - `prompt`: system prompt, history, and attachment mapping for the model
//! - `tools`: the `web_search` tool the model may call
//! - `pipeline`: the per-request streaming state machine

pub mod pipeline;
pub mod prompt;
pub mod tools;
pub mod topic;

pub use pipeline::{ChatPipeline, ChatTurn, PipelineSettings, TurnOutcome, TurnState};
