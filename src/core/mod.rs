pub mod error;
pub mod indexable;
pub mod version;

pub use error::*;
pub use indexable::*;
pub use version::*;
