use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationParams {
    pub model_id: String,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model_id: "default".to_string(),
            temperature: 1.0,
            top_p: 0.95,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum GenerationError {
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("generation failed: {0}")]
    Failed(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Remote-generation collaborator. Takes an encoded note buffer for a time
/// window plus sampling parameters, returns a raw encoded buffer.
/// Implementations that receive an archive unpack it before returning.
pub trait GenerationPort: Send + Sync {
    fn generate(
        &self,
        encoded_window: &[u8],
        params: &GenerationParams,
    ) -> Result<Vec<u8>, GenerationError>;
}
