pub mod command;
pub mod history;
pub mod selection;

pub use command::*;
pub use history::*;
pub use selection::*;
