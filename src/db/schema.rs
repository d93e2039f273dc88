//! SQL DDL for the `schools` table.
//! One script per dialect; both are idempotent.

/// SQLite schema:
/// - `id` INTEGER PRIMARY KEY AUTOINCREMENT
/// - `name` NOT NULL; `city`/`state` nullable since the lax mode may omit them
/// - index on `name` for the ordered listing
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS schools (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    address TEXT NULL,
    city TEXT NULL,
    state TEXT NULL,
    contact TEXT NULL,
    email_id TEXT NULL,
    image TEXT NULL
);

CREATE INDEX IF NOT EXISTS idx_schools_name ON schools(name);
"#;

/// MySQL schema. Everything is VARCHAR so rows decode as text through the any-driver.
pub const MYSQL_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS schools (
    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    address VARCHAR(1024) NULL,
    city VARCHAR(255) NULL,
    state VARCHAR(255) NULL,
    contact VARCHAR(64) NULL,
    email_id VARCHAR(255) NULL,
    image VARCHAR(2048) NULL,
    INDEX idx_schools_name (name)
) DEFAULT CHARSET = utf8mb4;
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    MySql,
}

impl Dialect {
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split_once(':')?.0.to_ascii_lowercase();
        match scheme.as_str() {
            "sqlite" => Some(Self::Sqlite),
            "mysql" | "mariadb" => Some(Self::MySql),
            _ => None,
        }
    }

    pub fn init_script(self) -> &'static str {
        match self {
            Self::Sqlite => SQLITE_INIT,
            Self::MySql => MYSQL_INIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialect_follows_url_scheme() {
        assert_eq!(Dialect::from_url("sqlite://x.db?mode=rwc"), Some(Dialect::Sqlite));
        assert_eq!(Dialect::from_url("sqlite::memory:"), Some(Dialect::Sqlite));
        assert_eq!(Dialect::from_url("mysql://u:p@h:3306/d"), Some(Dialect::MySql));
        assert_eq!(Dialect::from_url("postgres://h/d"), None);
    }
}
