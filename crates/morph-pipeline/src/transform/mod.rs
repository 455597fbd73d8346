//! Code transformation service seam
//!
//! The pipeline only knows the [`TransformationClient`] trait. The production
//! implementation talks to Gemini; tests plug in scripted clients.

mod gemini;

pub use gemini::{
    build_prompt, parse_transform_result, response_schema, GeminiClient, DEFAULT_MODEL,
    DEFAULT_THINKING_BUDGET, DEFAULT_TRANSFORM_TIMEOUT, GEMINI_API_URL,
};

use async_trait::async_trait;
use morph_common::types::{MigrationConfig, TransformResult};

use crate::error::TransformError;

/// Rewrites one legacy source file for a target stack
#[async_trait]
pub trait TransformationClient: Send + Sync {
    /// Transform `source_code`, the content of `file_name`, per `config`.
    ///
    /// Must reject blank input with [`TransformError::EmptySource`] before
    /// doing any remote work.
    async fn transform(
        &self,
        source_code: &str,
        config: &MigrationConfig,
        file_name: &str,
    ) -> Result<TransformResult, TransformError>;
}

/// Reject input that is empty or whitespace only
pub fn validate_source(source_code: &str) -> Result<(), TransformError> {
    if source_code.trim().is_empty() {
        return Err(TransformError::EmptySource);
    }
    Ok(())
}
