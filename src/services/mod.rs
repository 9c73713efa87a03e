pub mod interaction;
pub mod pacing;
pub mod scanner;

pub use interaction::{activate, find_indicator, nearest_indicator, Indicator};
pub use pacing::{DelayModel, Pacer};
pub use scanner::scan;
