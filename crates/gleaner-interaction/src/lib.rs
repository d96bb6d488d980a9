//! Model-facing side of Gleaner: the invocation gateway, prompts and the
//! five pipeline steps.

pub mod claude_api_client;
pub mod contract;
pub mod gateway;
pub mod json_extract;
pub mod prompts;
pub mod retry;
pub mod steps;
pub mod testing;

pub use claude_api_client::ClaudeApiClient;
pub use gateway::{ModelGateway, Prompt};
pub use json_extract::extract_json;
pub use prompts::PromptLibrary;
pub use steps::{PipelineStep, PipelineSteps, StepContext};
