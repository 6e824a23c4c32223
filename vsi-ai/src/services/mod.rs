//! Service modules for hazard classification
//!
//! Pipeline, leaf-first:
//! chunker → inference client → dual-pass assessor → consensus fusion →
//! rule engine → batch aggregator

pub mod azure_openai;
pub mod batch_aggregator;
pub mod chunker;
pub mod consensus_fusion;
pub mod dual_pass_assessor;
pub mod inference_client;
pub mod json_extractor;
pub mod prompts;
pub mod rule_engine;
pub mod upload_store;

pub use azure_openai::{AzureOpenAiProvider, AzureOpenAiSettings};
pub use batch_aggregator::BatchAggregator;
pub use dual_pass_assessor::{ChunkAssessment, DualPassAssessor};
pub use inference_client::{InferenceClient, InferenceError, InferenceProvider, InferenceRequest};
pub use prompts::SystemPrompt;
pub use rule_engine::Classification;
pub use upload_store::UploadStore;
