mod kind;
mod precision;
mod variant;

pub use kind::*;
pub use precision::*;
pub use variant::*;
