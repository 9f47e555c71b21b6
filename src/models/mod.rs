pub mod event;
pub mod town;

pub use event::*;
pub use town::*;
