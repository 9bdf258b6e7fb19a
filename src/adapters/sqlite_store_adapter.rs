//! SQLite portfolio store: one row per portfolio, the portfolio itself kept
//! as a JSON blob.

use crate::domain::error::AnalyzerError;
use crate::domain::portfolio::Portfolio;
use crate::ports::config_port::ConfigPort;
use crate::ports::portfolio_store_port::PortfolioStorePort;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, params};

pub struct SqliteStoreAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_error(e: r2d2::Error) -> AnalyzerError {
    AnalyzerError::Store {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> AnalyzerError {
    AnalyzerError::Store {
        reason: e.to_string(),
    }
}

impl SqliteStoreAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, AnalyzerError> {
        let db_path = config
            .get_string("store", "path")
            .ok_or_else(|| AnalyzerError::ConfigMissing {
                section: "store".into(),
                key: "path".into(),
            })?;
        let pool_size = config.get_int("store", "pool_size", 4).clamp(1, 64) as u32;
        Self::open(&db_path, pool_size)
    }

    pub fn open(db_path: &str, pool_size: u32) -> Result<Self, AnalyzerError> {
        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_error)?;
        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, AnalyzerError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_error)?;
        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, AnalyzerError> {
        self.pool.get().map_err(pool_error)
    }

    fn initialize_schema(&self) -> Result<(), AnalyzerError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS portfolios (
                    name TEXT PRIMARY KEY NOT NULL,
                    data TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                );",
            )
            .map_err(query_error)
    }
}

impl PortfolioStorePort for SqliteStoreAdapter {
    fn save(&self, name: &str, portfolio: &Portfolio) -> Result<(), AnalyzerError> {
        let data = serde_json::to_string(portfolio).map_err(|e| AnalyzerError::Store {
            reason: format!("failed to serialize portfolio {}: {}", name, e),
        })?;
        self.conn()?
            .execute(
                "INSERT INTO portfolios (name, data) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET data = excluded.data,
                     updated_at = CURRENT_TIMESTAMP",
                params![name, data],
            )
            .map_err(query_error)?;
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<Portfolio>, AnalyzerError> {
        let data: Option<String> = self
            .conn()?
            .query_row(
                "SELECT data FROM portfolios WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_error)?;

        data.map(|json| {
            serde_json::from_str(&json).map_err(|e| AnalyzerError::Store {
                reason: format!("corrupt portfolio {}: {}", name, e),
            })
        })
        .transpose()
    }

    fn list(&self) -> Result<Vec<String>, AnalyzerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT name FROM portfolios ORDER BY name")
            .map_err(query_error)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(query_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_error)?;
        Ok(names)
    }

    fn delete(&self, name: &str) -> Result<bool, AnalyzerError> {
        let affected = self
            .conn()?
            .execute("DELETE FROM portfolios WHERE name = ?1", params![name])
            .map_err(query_error)?;
        Ok(affected > 0)
    }
}
