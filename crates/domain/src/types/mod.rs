//! Domain data types

pub mod events;
pub mod lifelog;
pub mod sync;
pub mod tokens;

pub use events::*;
pub use lifelog::*;
pub use sync::*;
pub use tokens::*;
