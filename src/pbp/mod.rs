pub mod nflverse;
pub mod provider;
pub mod stored;

pub use nflverse::NflverseClient;
pub use provider::PlayByPlayProvider;
pub use stored::StoredProvider;
