pub mod indicators;
pub mod market;
pub mod optimization;
pub mod signals;
pub mod strategy;

pub use indicators::*;
pub use market::*;
pub use optimization::*;
pub use signals::*;
pub use strategy::*;
