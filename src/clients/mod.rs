/// Search hit and credential types
pub mod entities;
/// Error types and result aliases
pub mod errors;
/// Genius search API client
pub mod genius;

pub use entities::{Credential, Hit};
pub use genius::{GeniusClient, SearchApi};
