pub mod registry;
pub mod state;

pub use registry::{VersionRegistry, VERSIONS_KEY};
pub use state::VersionState;
