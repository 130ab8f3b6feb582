pub mod failover;
pub mod source;

pub use failover::{ArlSearch, env_override, find_working_arl, trial_order};
pub use source::{ArlRetrievalError, ArlSource};

use std::fmt;

/// A Deezer ARL: the session cookie value that authenticates a client.
///
/// Never printed in full; `Debug` and `Display` show a short prefix and the length.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Arl(String);

impl Arl {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(8).collect();
        format!("{}… ({} chars)", prefix, self.0.chars().count())
    }
}

impl fmt::Debug for Arl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Arl").field(&self.redacted()).finish()
    }
}

impl fmt::Display for Arl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}
