use std::path::{Path, PathBuf};

use tracing::{info, warn};

const DEFAULT_ENV_FILE: &str = ".env";

/// Seed the process environment from `.env` in the working directory.
///
/// Variables already present in the environment are left alone. A missing or
/// unreadable file is reported as a warning and never fails startup.
pub fn load_env_file() -> Option<PathBuf> {
    load_env_file_from(Path::new(DEFAULT_ENV_FILE))
}

/// Same as [`load_env_file`] but reads an explicit path.
pub fn load_env_file_from(path: &Path) -> Option<PathBuf> {
    match dotenvy::from_path(path) {
        Ok(()) => {
            info!(env_file = %path.display(), "loaded environment overrides");
            Some(path.to_path_buf())
        }
        Err(e) if e.not_found() => {
            warn!(env_file = %path.display(), "env file not found, using system environment variables");
            None
        }
        Err(e) => {
            warn!(env_file = %path.display(), error = %e, "failed to load env file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::io::Write;

    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn test_missing_file_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_env_file_from(&dir.path().join("absent.env"));
        assert!(loaded.is_none());
    }

    #[test]
    #[serial]
    fn test_default_location_missing_is_not_fatal() {
        // the crate directory carries no .env
        assert!(load_env_file().is_none());
    }

    #[test]
    #[serial]
    fn test_file_seeds_but_does_not_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "GATEWAY_ENV_FILE_SEEDED=from_file").unwrap();
        writeln!(file, "GATEWAY_ENV_FILE_EXISTING=from_file").unwrap();
        drop(file);

        env::remove_var("GATEWAY_ENV_FILE_SEEDED");
        env::set_var("GATEWAY_ENV_FILE_EXISTING", "from_process");

        let loaded = load_env_file_from(&path);
        assert_eq!(loaded.as_deref(), Some(path.as_path()));
        assert_eq!(env::var("GATEWAY_ENV_FILE_SEEDED").unwrap(), "from_file");
        assert_eq!(env::var("GATEWAY_ENV_FILE_EXISTING").unwrap(), "from_process");

        env::remove_var("GATEWAY_ENV_FILE_SEEDED");
        env::remove_var("GATEWAY_ENV_FILE_EXISTING");
    }
}
