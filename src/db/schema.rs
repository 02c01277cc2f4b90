//! Database schema migrations.
//!
//! Each entry is applied once, in order, inside its own transaction.
//! Applied versions are recorded in the `schema_version` table.

/// Ordered list of schema migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: uploads table, one row per share code
    "CREATE TABLE uploads (
        code          TEXT PRIMARY KEY,
        original_name TEXT NOT NULL,
        stored_name   TEXT NOT NULL,
        mime_type     TEXT NOT NULL,
        size_bytes    INTEGER NOT NULL,
        created_at    INTEGER NOT NULL,
        expires_at    INTEGER NOT NULL,
        downloads     INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX idx_uploads_expires_at ON uploads(expires_at);",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_not_empty() {
        assert!(!MIGRATIONS.is_empty());
    }

    #[test]
    fn test_first_migration_creates_uploads() {
        assert!(MIGRATIONS[0].contains("CREATE TABLE uploads"));
        assert!(MIGRATIONS[0].contains("code          TEXT PRIMARY KEY"));
    }
}
