pub mod gesture;
pub mod playback;
pub mod session;
pub mod view_map;

pub use gesture::*;
pub use playback::*;
pub use session::*;
pub use view_map::*;
