use crate::types::{Note, Tick};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What a decoded score file yields. `total_ticks` is at least a few
/// measures even for tiny or empty inputs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoreData {
    pub notes: Vec<Note>,
    pub ppqn: u16,
    pub total_ticks: Tick,
    pub tempo_bpm: f64,
}

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("io error: {0}")]
    Io(String),
    #[error("malformed file: {0}")]
    Malformed(String),
    #[error("encode error: {0}")]
    Encode(String),
}

pub trait ScoreCodecPort: Send + Sync {
    fn load_path(&self, path: &Path) -> Result<ScoreData, CodecError>;
    fn load_bytes(&self, data: &[u8]) -> Result<ScoreData, CodecError>;

    fn save_path(
        &self,
        path: &Path,
        notes: &[Note],
        ppqn: u16,
        tempo_bpm: f64,
    ) -> Result<(), CodecError>;
    fn encode_bytes(&self, notes: &[Note], ppqn: u16, tempo_bpm: f64)
        -> Result<Vec<u8>, CodecError>;
}
