use crate::config::DatabaseConfig;
use crate::db::models::{NewSchool, School};
use crate::db::schema::Dialect;
use crate::error::DirectoryError;
use sqlx::any::{AnyPoolOptions, install_default_drivers};
use sqlx::{AnyPool, Error as SqlxError};
use std::time::Duration;
use tracing::info;

#[derive(Clone, Debug)]
pub struct SchoolStore {
    pool: AnyPool,
    dialect: Dialect,
}

impl SchoolStore {
    pub fn new(pool: AnyPool, dialect: Dialect) -> Self {
        Self { pool, dialect }
    }

    /// Open a bounded pool for `url` and make sure the table exists.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, DirectoryError> {
        let dialect = Dialect::from_url(url).ok_or_else(|| {
            DirectoryError::InvalidConfig(format!("unsupported database url scheme: {url}"))
        })?;
        install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await?;
        let store = Self::new(pool, dialect);
        store.init_schema().await?;
        info!(dialect = ?dialect, max_connections, "school store ready");
        Ok(store)
    }

    pub async fn from_config(cfg: &DatabaseConfig) -> Result<Self, DirectoryError> {
        let url = cfg.connection_url()?;
        Self::connect(
            &url,
            cfg.max_connections,
            Duration::from_secs(cfg.acquire_timeout_secs),
        )
        .await
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), DirectoryError> {
        // sqlx::query runs one statement at a time
        for stmt in self.dialect.init_script().split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Insert one row and return its generated id.
    pub async fn insert(&self, school: NewSchool) -> Result<i64, DirectoryError> {
        let insert = sqlx::query(
            r#"
            INSERT INTO schools (name, address, city, state, contact, email_id, image)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(school.name)
        .bind(school.address)
        .bind(school.city)
        .bind(school.state)
        .bind(school.contact)
        .bind(school.email_id)
        .bind(school.image);

        // The any-driver only reports insert ids for MySQL; SQLite needs the
        // rowid read back on the same connection.
        let mut conn = self.pool.acquire().await?;
        let result = insert.execute(&mut *conn).await?;
        let id = match self.dialect {
            Dialect::MySql => result.last_insert_id(),
            Dialect::Sqlite => Some(
                sqlx::query_scalar::<_, i64>("SELECT last_insert_rowid()")
                    .fetch_one(&mut *conn)
                    .await?,
            ),
        };
        id.ok_or_else(|| SqlxError::Protocol("driver did not report an insert id".into()).into())
    }

    /// Every row, ordered by `name` under the backend's default collation.
    pub async fn list(&self) -> Result<Vec<School>, DirectoryError> {
        let rows = sqlx::query_as::<_, School>(
            r#"SELECT id, name, address, city, state, contact, email_id, image
               FROM schools ORDER BY name ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
