//! Secret configuration loader. A JSON file maps each recognized key name to
//! its credential; the file is read once at startup and the resulting
//! `Configuration` is handed to whatever needs the secret.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use crate::secret::SecretValue;

/// Value shipped in `secrets.example.json`. Never accepted as a real key.
pub const PLACEHOLDER_VALUE: &str = "sk-your-actual-openai-api-key-here";

/// File names containing this marker are committed templates, not secret sources.
const EXAMPLE_MARKER: &str = ".example.";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("secret config not found at {}", .0.display())]
    NotFound(PathBuf),
    #[error("{} is the committed example file, not a secret source", .0.display())]
    ExampleSource(PathBuf),
    #[error("secret config unreadable at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed secret config: {0}")]
    MalformedConfig(String),
    #[error("required key {0} is missing")]
    MissingKey(KeyName),
    #[error("unknown key `{0}`")]
    UnknownKey(String),
    #[error("key {0} is empty or still holds the example placeholder")]
    Placeholder(KeyName),
}

/// The recognized key set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyName {
    OpenAiApiKey,
}

impl KeyName {
    /// Every recognized key. All of them are required.
    pub const ALL: [KeyName; 1] = [KeyName::OpenAiApiKey];

    pub fn as_str(self) -> &'static str {
        match self {
            KeyName::OpenAiApiKey => "OPENAI_API_KEY",
        }
    }

    /// Conventional provider prefix. A mismatch is logged, not rejected.
    fn expected_prefix(self) -> Option<&'static str> {
        match self {
            KeyName::OpenAiApiKey => Some("sk-"),
        }
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyName::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

/// What to do with keys in the file that are not in the recognized set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownKeyPolicy {
    /// Skip them, logging the key name.
    #[default]
    Ignore,
    /// Fail the load with `ConfigError::UnknownKey`.
    Reject,
}

/// Loaded secrets. Holds exactly one value per recognized key and is never
/// mutated after construction.
#[derive(Debug, Clone)]
pub struct Configuration {
    values: BTreeMap<KeyName, SecretValue>,
}

impl Configuration {
    /// Reads and validates the secret file, ignoring unrecognized keys.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load_with_policy(path, UnknownKeyPolicy::default())
    }

    pub fn load_with_policy(
        path: impl AsRef<Path>,
        policy: UnknownKeyPolicy,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading secret config");
        fs::metadata(path).map_err(|source| read_error(path, source))?;
        if is_example_path(path) {
            return Err(ConfigError::ExampleSource(path.to_path_buf()));
        }

        let mut raw = fs::read_to_string(path).map_err(|source| read_error(path, source))?;

        let parsed = Self::from_json_str(&raw, policy);
        raw.zeroize();
        let config = parsed?;

        info!(path = %path.display(), keys = config.values.len(), "secret config loaded");
        Ok(config)
    }

    /// Parses already-read file contents.
    pub fn from_json_str(text: &str, policy: UnknownKeyPolicy) -> Result<Self, ConfigError> {
        let document: Value =
            serde_json::from_str(text).map_err(|e| ConfigError::MalformedConfig(format!("{e}")))?;
        let Value::Object(mut fields) = document else {
            return Err(ConfigError::MalformedConfig(
                "top level must be a JSON object".to_string(),
            ));
        };

        let unrecognized: Vec<String> = fields
            .keys()
            .filter(|name| name.parse::<KeyName>().is_err())
            .cloned()
            .collect();
        for name in unrecognized {
            match policy {
                UnknownKeyPolicy::Ignore => {
                    warn!(key = %name, "ignoring unrecognized key in secret config");
                    fields.remove(&name);
                }
                UnknownKeyPolicy::Reject => return Err(ConfigError::UnknownKey(name)),
            }
        }

        let mut values = BTreeMap::new();
        for key in KeyName::ALL {
            let text = match fields.remove(key.as_str()) {
                Some(Value::String(text)) => text,
                Some(_) => {
                    return Err(ConfigError::MalformedConfig(format!(
                        "{key} must be a string"
                    )))
                }
                None => return Err(ConfigError::MissingKey(key)),
            };
            if text.is_empty() || text == PLACEHOLDER_VALUE {
                return Err(ConfigError::Placeholder(key));
            }

            let secret = SecretValue::new(text);
            if let Some(prefix) = key.expected_prefix() {
                if !secret.has_prefix(prefix) {
                    warn!(key = %key, prefix, "secret value lacks the conventional prefix");
                }
            }
            values.insert(key, secret);
        }

        Ok(Self { values })
    }

    /// Looks a value up by its key name string.
    pub fn get(&self, key_name: &str) -> Result<&SecretValue, ConfigError> {
        let key = key_name.parse::<KeyName>()?;
        Ok(self.secret(key))
    }

    pub fn secret(&self, key: KeyName) -> &SecretValue {
        // Construction inserts every member of KeyName::ALL.
        &self.values[&key]
    }

    pub fn keys(&self) -> impl Iterator<Item = KeyName> + '_ {
        self.values.keys().copied()
    }
}

/// Loads the secret file at `path` with the default policy.
pub fn load(path: impl AsRef<Path>) -> Result<Configuration, ConfigError> {
    Configuration::load(path)
}

/// Retrieves the value for `key_name` from a loaded configuration.
pub fn get<'a>(config: &'a Configuration, key_name: &str) -> Result<&'a SecretValue, ConfigError> {
    config.get(key_name)
}

/// A missing file, or a path running through a regular file, is `NotFound`.
fn read_error(path: &Path, source: io::Error) -> ConfigError {
    match source.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => {
            ConfigError::NotFound(path.to_path_buf())
        }
        _ => ConfigError::Read {
            path: path.to_path_buf(),
            source,
        },
    }
}

fn is_example_path(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.contains(EXAMPLE_MARKER))
}

#[cfg(test)]
mod tests {
    use super::{get, load, ConfigError, Configuration, KeyName, UnknownKeyPolicy};
    use serde_json::json;
    use std::fs;
    use tempfile::{tempdir, NamedTempFile};

    fn write_config(contents: &str) -> NamedTempFile {
        let file = NamedTempFile::new().expect("temp file");
        fs::write(file.path(), contents).expect("write config");
        file
    }

    #[test]
    fn loads_and_returns_exact_value() {
        let file = write_config(&json!({ "OPENAI_API_KEY": "sk-abc123" }).to_string());
        let config = load(file.path()).expect("config should load");
        let value = get(&config, "OPENAI_API_KEY").expect("key is recognized");
        assert_eq!(value.expose(), "sk-abc123");
    }

    #[test]
    fn keeps_value_unmodified() {
        let raw = "sk-\u{00e9}\\\"quoted\\\" with trailing space ";
        let file = write_config(&format!("{{\"OPENAI_API_KEY\": \"{raw}\"}}"));
        let config = load(file.path()).expect("config should load");
        assert_eq!(
            config.secret(KeyName::OpenAiApiKey).expose(),
            "sk-\u{00e9}\"quoted\" with trailing space "
        );
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempdir().expect("temp dir");
        let err = load(dir.path().join("secrets.json")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn missing_example_file_is_not_found() {
        let dir = tempdir().expect("temp dir");
        let err = load(dir.path().join("secrets.example.json")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn path_through_a_regular_file_is_not_found() {
        let file = write_config("{}");
        let err = load(file.path().join("secrets.json")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)), "{err}");
    }

    #[test]
    fn example_file_is_never_a_source() {
        let dir = tempdir().expect("temp dir");
        let example = dir.path().join("secrets.example.json");
        fs::write(&example, json!({ "OPENAI_API_KEY": "sk-real-looking" }).to_string())
            .expect("write example");
        let err = load(&example).unwrap_err();
        assert!(matches!(err, ConfigError::ExampleSource(_)));
    }

    #[test]
    fn unrelated_key_only_is_missing_key() {
        let file = write_config(&json!({ "ANTHROPIC_API_KEY": "sk-ant-1" }).to_string());
        let err = load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey(KeyName::OpenAiApiKey)));
        assert!(format!("{err}").contains("OPENAI_API_KEY"));
    }

    #[test]
    fn unknown_key_name_is_rejected_by_get() {
        let file = write_config(&json!({ "OPENAI_API_KEY": "sk-abc123" }).to_string());
        let config = load(file.path()).expect("config should load");
        for name in ["openai_api_key", "", "OPENAI_API_KEY ", "DATABASE_URL"] {
            let err = get(&config, name).unwrap_err();
            assert!(matches!(err, ConfigError::UnknownKey(ref k) if k == name));
        }
    }

    #[test]
    fn extra_keys_are_ignored_by_default() {
        let text = json!({ "OPENAI_API_KEY": "sk-abc123", "EXTRA": "x" }).to_string();
        let config = Configuration::from_json_str(&text, UnknownKeyPolicy::Ignore)
            .expect("extra keys are skipped");
        assert_eq!(config.keys().collect::<Vec<_>>(), vec![KeyName::OpenAiApiKey]);
    }

    #[test]
    fn extra_keys_fail_under_reject_policy() {
        let text = json!({ "OPENAI_API_KEY": "sk-abc123", "EXTRA": "x" }).to_string();
        let err = Configuration::from_json_str(&text, UnknownKeyPolicy::Reject).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(ref k) if k == "EXTRA"));
    }

    #[test]
    fn rejects_malformed_sources() {
        for text in ["", "not json", "[\"sk-abc\"]", "{\"OPENAI_API_KEY\": 42}"] {
            let err = Configuration::from_json_str(text, UnknownKeyPolicy::Ignore).unwrap_err();
            assert!(matches!(err, ConfigError::MalformedConfig(_)), "{text}: {err}");
        }
    }

    #[test]
    fn rejects_placeholder_and_empty_values() {
        for value in [super::PLACEHOLDER_VALUE, ""] {
            let text = json!({ "OPENAI_API_KEY": value }).to_string();
            let err = Configuration::from_json_str(&text, UnknownKeyPolicy::Ignore).unwrap_err();
            assert!(matches!(err, ConfigError::Placeholder(KeyName::OpenAiApiKey)));
        }
    }

    #[test]
    fn accepts_value_without_prefix() {
        let text = json!({ "OPENAI_API_KEY": "proj-key" }).to_string();
        let config = Configuration::from_json_str(&text, UnknownKeyPolicy::Ignore)
            .expect("prefix is advisory");
        assert_eq!(config.secret(KeyName::OpenAiApiKey).expose(), "proj-key");
    }

    #[test]
    fn debug_and_errors_never_show_the_value() {
        let file = write_config(&json!({ "OPENAI_API_KEY": "sk-topsecret" }).to_string());
        let config = load(file.path()).expect("config should load");
        assert!(!format!("{config:?}").contains("sk-topsecret"));

        let text = json!({ "OPENAI_API_KEY": "sk-topsecret", "X": "y" }).to_string();
        let err = Configuration::from_json_str(&text, UnknownKeyPolicy::Reject).unwrap_err();
        assert!(!format!("{err}").contains("sk-topsecret"));
    }

    #[test]
    fn committed_example_holds_only_the_placeholder() {
        let text = include_str!("../../secrets.example.json");
        let err = Configuration::from_json_str(text, UnknownKeyPolicy::Reject).unwrap_err();
        assert!(matches!(err, ConfigError::Placeholder(KeyName::OpenAiApiKey)));
    }

    #[test]
    fn key_names_parse_round_trip() {
        for key in KeyName::ALL {
            assert_eq!(key.as_str().parse::<KeyName>().expect("recognized"), key);
        }
    }
}
