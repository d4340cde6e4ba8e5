pub mod codec;
pub mod generate;
pub mod sequencer;
pub mod types;

pub use codec::*;
pub use generate::*;
pub use sequencer::*;
pub use types::*;
