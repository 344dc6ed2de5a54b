//! Create an empty, timestamped SQL migration file.
//!
//! # Usage
//!
//! ```bash
//! ts-cli makemigration "add product tags"
//! # -> crates/server/migrations/20261016093000_add_product_tags.sql
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Default directory migrations are written to, relative to the workspace root.
pub const DEFAULT_MIGRATIONS_DIR: &str = "crates/server/migrations";

#[derive(Debug, Error)]
pub enum MakeMigrationError {
    #[error("Migration name must contain at least one letter or digit")]
    EmptyName,

    #[error("Migrations directory not found: {0}")]
    MissingDir(PathBuf),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Normalize a free-form name to `snake_case` made of `[a-z0-9_]`.
///
/// Runs of other characters collapse into a single underscore.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !normalized.is_empty() {
                normalized.push('_');
            }
            pending_separator = false;
            normalized.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    normalized
}

/// File name for a migration called `name` created at `now`.
///
/// # Errors
///
/// Returns `MakeMigrationError::EmptyName` if nothing survives normalization.
pub fn file_name(name: &str, now: DateTime<Utc>) -> Result<String, MakeMigrationError> {
    let name = normalize_name(name);
    if name.is_empty() {
        return Err(MakeMigrationError::EmptyName);
    }
    Ok(format!("{}_{name}.sql", now.format("%Y%m%d%H%M%S")))
}

fn header(name: &str, now: DateTime<Utc>) -> String {
    format!(
        "-- Migration: {name}\n-- Created: {}\n\n",
        now.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// Write a new migration file into `dir` and return its path.
///
/// # Errors
///
/// Returns `MakeMigrationError` if the name is empty, the directory does not
/// exist, or the file cannot be created (including when it already exists).
pub fn run(name: &str, dir: &Path) -> Result<PathBuf, MakeMigrationError> {
    let now = Utc::now();
    let file_name = file_name(name, now)?;

    if !dir.is_dir() {
        return Err(MakeMigrationError::MissingDir(dir.to_path_buf()));
    }

    let path = dir.join(file_name);
    let write = || -> std::io::Result<()> {
        use std::io::Write;

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        file.write_all(header(&normalize_name(name), now).as_bytes())
    };
    write().map_err(|source| MakeMigrationError::Write {
        path: path.clone(),
        source,
    })?;

    tracing::info!(path = %path.display(), "Created migration");
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Add product tags"), "add_product_tags");
        assert_eq!(normalize_name("  create--Index!! "), "create_index");
        assert_eq!(normalize_name("v2_users"), "v2_users");
        assert_eq!(normalize_name("___"), "");
    }

    #[test]
    fn test_file_name() {
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            file_name("Add VIP flag", now).unwrap(),
            "20260309070501_add_vip_flag.sql"
        );
        assert!(matches!(
            file_name(" - ", now),
            Err(MakeMigrationError::EmptyName)
        ));
    }

    #[test]
    fn test_run_writes_header() {
        let dir = std::env::temp_dir().join(format!("ts-cli-migrations-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let path = run("seed promotions", &dir).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("-- Migration: seed_promotions\n"));
        assert!(path.to_string_lossy().ends_with("_seed_promotions.sql"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_run_requires_directory() {
        let missing = std::env::temp_dir().join("ts-cli-no-such-dir/nested");
        assert!(matches!(
            run("anything", &missing),
            Err(MakeMigrationError::MissingDir(_))
        ));
    }
}
