use std::path::PathBuf;

use tempfile::TempDir;

/// A file-backed SQLite database that lives as long as this value.
///
/// File-backed rather than `sqlite::memory:` so every pooled connection sees
/// the same database.
pub struct TempSqlite {
    dir: TempDir,
}

impl TempSqlite {
    pub fn new() -> Self {
        let dir = tempfile::Builder::new()
            .prefix("gateway-test-")
            .tempdir()
            .unwrap_or_else(|e| panic!("failed to create temp dir for sqlite: {e}"));
        Self { dir }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("test.db")
    }

    /// Connection string that creates the file on first connect.
    pub fn url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.path().display())
    }
}

impl Default for TempSqlite {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_points_inside_temp_dir() {
        let db = TempSqlite::new();
        let url = db.url();
        assert!(url.starts_with("sqlite://"));
        assert!(url.ends_with("test.db?mode=rwc"));
        assert!(url.contains(&db.dir.path().display().to_string()));
    }

    #[test]
    fn test_each_instance_is_isolated() {
        let a = TempSqlite::new();
        let b = TempSqlite::new();
        assert_ne!(a.url(), b.url());
    }
}
