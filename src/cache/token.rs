use std::fmt;

/// Bearer credential issued by the auth endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    value: String,
}

impl AuthToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.value)
    }
}

// keep the credential out of logs
impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken").field("len", &self.value.len()).finish()
    }
}
