//! Owned credential strings. A `SecretValue` never prints its contents through
//! `Debug` and wipes its buffer when dropped, so a stray `{:?}` in a log line
//! cannot leak an API key.

use std::fmt;

use zeroize::Zeroize;

/// A credential loaded from the secret file.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue {
    inner: String,
}

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// Returns the plaintext. Callers own the decision to reveal it.
    pub fn expose(&self) -> &str {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// True when the value carries the provider prefix (`sk-` for OpenAI keys).
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.inner.starts_with(prefix)
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue(<redacted>)")
    }
}

impl Drop for SecretValue {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}
