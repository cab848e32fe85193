//! Environment configuration
//!
//! Settings such as `SIGNOFF_MANIFEST_SOURCE` can live in an environment
//! file instead of the process environment. The file named by
//! `SIGNOFF_ENV_FILE` wins; otherwise the first of [`ENV_FILE_PATHS`] that
//! exists is applied. Variables already present in the process are left
//! alone.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Variable naming a custom environment file
pub const ENV_FILE_VAR: &str = "SIGNOFF_ENV_FILE";

/// Fallback environment files, highest priority first
pub const ENV_FILE_PATHS: &[&str] = &["/etc/signoff/environment", "/etc/signoff.env", ".env"];

/// Apply the first environment file found. Returns its path.
pub fn load_environment() -> Option<PathBuf> {
    let candidates = get_config_opt(ENV_FILE_VAR)
        .map(PathBuf::from)
        .into_iter()
        .chain(ENV_FILE_PATHS.iter().map(PathBuf::from));

    for path in candidates {
        if apply_env_file(&path).is_some() {
            return Some(path);
        }
    }

    debug!("No environment file applied");
    None
}

/// Set every unset variable named in `path`; None when the file is absent
/// or unreadable
fn apply_env_file(path: &Path) -> Option<usize> {
    if !path.is_file() {
        return None;
    }

    let content = fs::read_to_string(path)
        .map_err(|e| warn!(path = %path.display(), error = %e, "Unreadable environment file"))
        .ok()?;

    let mut applied = 0;
    for (key, value) in content.lines().filter_map(parse_env_line) {
        if std::env::var_os(&key).is_some() {
            debug!(key = %key, "Already set, keeping process value");
            continue;
        }
        std::env::set_var(&key, &value);
        applied += 1;
    }

    info!(path = %path.display(), applied, "Applied environment file");
    Some(applied)
}

/// `KEY=VALUE`, optionally prefixed with `export` and with the value in
/// matching quotes. Blank lines and `#` comments yield None.
fn parse_env_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.starts_with('#') {
        return None;
    }

    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    let value = value.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|q| value.strip_prefix(*q).and_then(|v| v.strip_suffix(*q)))
        .unwrap_or(value);

    Some((key.to_string(), unquoted.to_string()))
}

/// Optional setting; an empty value counts as unset
pub fn get_config_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
