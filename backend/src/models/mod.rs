pub mod broadcast;
pub mod classroom;
pub mod identity;
pub mod macros;

pub use broadcast::*;
pub use classroom::*;
pub use identity::*;
