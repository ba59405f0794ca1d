use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::clients::errors::{Error, Result};

/// One `result` record of a Genius search hit. Fields vary per record.
pub type Hit = Map<String, Value>;

#[derive(Deserialize, Debug)]
pub(crate) struct SearchEnvelope {
    pub response: SearchResponse,
}

#[derive(Deserialize, Debug)]
pub(crate) struct SearchResponse {
    pub hits: Vec<RawHit>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct RawHit {
    pub result: Hit,
}

/// Bearer token for the Genius API. Loaded once and never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Name of the environment variable holding the token.
    pub const ENV_VAR: &'static str = "ACCESS_TOKEN";

    // Read the token from the environment or raise a configuration error
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(Self::ENV_VAR).map_err(|e| {
            Error::ConfigurationError(format!(
                "{} is not set ({e}). Add it to the environment or a .env file.",
                Self::ENV_VAR
            ))
        })?;
        Self::try_from_token(token)
    }

    pub fn try_from_token(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::ConfigurationError(format!(
                "{} is empty",
                Self::ENV_VAR
            )));
        }
        Ok(Credential(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep the token out of logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}
