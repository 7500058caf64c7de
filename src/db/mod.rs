use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, Transaction};

use crate::error::{AppError, AppResult};
use crate::models::*;

const CREATE_PRODUCTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS produtos (
        id         INTEGER PRIMARY KEY,
        nome       TEXT,
        quantidade INTEGER,
        status     TEXT
    )
"#;

const CREATE_PRODUCTS_NAME_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS ix_produtos_nome ON produtos (nome)";

/// How long a writer waits for another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the product store. Built once in `main`, cloned into every
/// request through `AppState`, closed on shutdown.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

/// A request-scoped storage session. Dropping it without `commit` rolls back
/// and returns the connection to the pool.
pub type Session = Transaction<'static, Sqlite>;

impl Database {
    /// Opens a pool on `url`, creating the SQLite file if it does not exist.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Creates the `produtos` table and its name index. Safe to run on every start.
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(CREATE_PRODUCTS_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_PRODUCTS_NAME_INDEX)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn begin(&self) -> AppResult<Session> {
        Ok(self.pool.begin().await?)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// ── Products ──────────────────────────────────────────────────────────────────

pub async fn fetch_all_products(conn: &mut SqliteConnection) -> AppResult<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT id, nome, quantidade, status FROM produtos ORDER BY id ASC",
    )
    .fetch_all(conn)
    .await?;

    Ok(products)
}

pub async fn insert_product(
    conn: &mut SqliteConnection,
    payload: &CreateProduct,
) -> AppResult<Product> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO produtos (nome, quantidade, status)
        VALUES (?, ?, ?)
        RETURNING id, nome, quantidade, status
        "#,
    )
    .bind(&payload.nome)
    .bind(payload.quantidade)
    .bind(payload.status().as_str())
    .fetch_one(conn)
    .await?;

    Ok(product)
}

/// Overwrites the quantity and recomputes the status. Name and id are untouched.
pub async fn update_product_quantity(
    conn: &mut SqliteConnection,
    id: i64,
    payload: &UpdateProduct,
) -> AppResult<Product> {
    // No SELECT before the write: a read lock held here deadlocks against
    // concurrent writers upgrading theirs.
    let product = sqlx::query_as::<_, Product>(
        r#"
        UPDATE produtos
        SET quantidade = ?,
            status     = ?
        WHERE id = ?
        RETURNING id, nome, quantidade, status
        "#,
    )
    .bind(payload.quantidade)
    .bind(payload.status().as_str())
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound(id))?;

    Ok(product)
}

pub async fn delete_product(conn: &mut SqliteConnection, id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM produtos WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(id));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) async fn in_memory() -> Database {
    let db = Database::connect("sqlite::memory:", 1)
        .await
        .expect("in-memory sqlite");
    db.init_schema().await.expect("schema");
    db
}
