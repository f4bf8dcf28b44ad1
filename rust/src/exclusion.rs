//! Checks that the real secret file stays out of version control, and the
//! setup text shown when it has not been created yet.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

/// Reports whether `ignore_file` (a `.gitignore`) excludes `secret_file_name`.
///
/// Only exact names are matched: blank lines and `#` comments are skipped, a
/// leading `/` anchors to the same directory and is stripped, and a later
/// `!name` line re-includes the file. A missing or unreadable ignore file
/// excludes nothing; only the unreadable case is logged as a warning.
pub fn is_excluded(ignore_file: impl AsRef<Path>, secret_file_name: &str) -> bool {
    let ignore_file = ignore_file.as_ref();
    let contents = match fs::read_to_string(ignore_file) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %ignore_file.display(), "no ignore file to inspect");
            return false;
        }
        Err(err) => {
            warn!(path = %ignore_file.display(), error = %err, "unable to read ignore file");
            return false;
        }
    };

    let mut excluded = false;
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (negated, pattern) = match line.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, line),
        };
        let pattern = pattern.strip_prefix('/').unwrap_or(pattern);
        if pattern == secret_file_name {
            excluded = !negated;
        }
    }
    excluded
}

/// Steps printed when the secret file has not been created yet.
pub fn setup_instructions(example: &Path, target: &Path) -> String {
    let target_name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| target.display().to_string());
    format!(
        "Secret config is missing. To set it up:\n  \
         1. copy {example} to {target}\n  \
         2. replace the placeholder OPENAI_API_KEY with your real key (https://platform.openai.com/api-keys)\n  \
         3. make sure {target_name} is listed in .gitignore and never commit it",
        example = example.display(),
        target = target.display(),
    )
}
