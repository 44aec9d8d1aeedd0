use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use infokeeper_contracts::User;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{Postgres, Row};

use crate::specification::QueryArg;
use crate::{Resource, Specification, StorageError, VaultStore};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const MIGRATE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub db_url: String,
    pub schema: String,
    pub max_connections: u32,
    pub query_timeout: Duration,
}

#[derive(Clone)]
pub struct PgStore {
    pool: sqlx::PgPool,
    schema: String,
    query_timeout: Duration,
}

impl PgStore {
    pub async fn connect(config: &StoreConfig) -> Result<Self, StorageError> {
        if !is_identifier(&config.schema) {
            return Err(StorageError::Backend(format!(
                "invalid schema name {:?}",
                config.schema
            )));
        }

        let options = PgConnectOptions::from_str(&config.db_url)?
            .options([("search_path", config.schema.as_str())]);

        let pool = tokio::time::timeout(
            CONNECT_TIMEOUT,
            PgPoolOptions::new()
                .max_connections(config.max_connections.max(1))
                .connect_with(options),
        )
        .await
        .map_err(|_| StorageError::Timeout)??;

        Ok(Self {
            pool,
            schema: config.schema.clone(),
            query_timeout: config.query_timeout,
        })
    }

    pub async fn connect_and_migrate(config: &StoreConfig) -> Result<Self, StorageError> {
        let store = Self::connect(config).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Creates the schema if needed and applies embedded migrations inside it.
    pub async fn migrate(&self) -> Result<(), StorageError> {
        let create_schema = format!("CREATE SCHEMA IF NOT EXISTS {}", self.schema);
        tokio::time::timeout(MIGRATE_TIMEOUT, async {
            sqlx::query(&create_schema).execute(&self.pool).await?;
            migrate(&self.pool).await?;
            Ok::<(), StorageError>(())
        })
        .await
        .map_err(|_| StorageError::Timeout)??;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn bounded<T, F>(&self, deadline: Option<Duration>, fut: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        let limit = deadline.map_or(self.query_timeout, |d| d.min(self.query_timeout));
        tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| StorageError::Timeout)?
            .map_err(StorageError::from)
    }
}

impl VaultStore for PgStore {
    async fn insert<R: Resource>(
        &self,
        record: &R,
        deadline: Option<Duration>,
    ) -> Result<(), StorageError> {
        let args = record.insert_args();
        self.bounded(
            deadline,
            bind_args(sqlx::query(R::INSERT), &args).execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn select<R: Resource>(
        &self,
        spec: &Specification,
        deadline: Option<Duration>,
    ) -> Result<Vec<R>, StorageError> {
        let (sql, args) = spec.query(R::SELECT);
        let sql = format!("{} ORDER BY created_at, id", sql);

        let rows = self
            .bounded(deadline, bind_args(sqlx::query(&sql), &args).fetch_all(&self.pool))
            .await?;

        rows.iter()
            .map(R::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::from)
    }

    async fn insert_user(&self, user: &User, deadline: Option<Duration>) -> Result<(), StorageError> {
        self.bounded(
            deadline,
            sqlx::query(
                "INSERT INTO users (id, login, password_hash, created_at) VALUES ($1, $2, $3, $4)",
            )
            .bind(&user.id)
            .bind(&user.login)
            .bind(&user.password_hash)
            .bind(user.created_at)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn find_user_by_login(
        &self,
        login: &str,
        deadline: Option<Duration>,
    ) -> Result<Option<User>, StorageError> {
        let row = self
            .bounded(
                deadline,
                sqlx::query(
                    "SELECT id, login, password_hash, created_at FROM users WHERE login = $1",
                )
                .bind(login)
                .fetch_optional(&self.pool),
            )
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(User {
            id: row.try_get("id")?,
            login: row.try_get("login")?,
            password_hash: row.try_get("password_hash")?,
            created_at: row.try_get("created_at")?,
        }))
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.bounded(None, sqlx::query("SELECT 1").execute(&self.pool))
            .await?;
        Ok(())
    }
}

fn bind_args<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    args: &'q [QueryArg],
) -> Query<'q, Postgres, PgArguments> {
    for arg in args {
        query = match arg {
            QueryArg::Text(value) => query.bind(value.as_str()),
            QueryArg::Date(value) => query.bind(*value),
            QueryArg::Timestamp(value) => query.bind(*value),
        };
    }
    query
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

pub async fn migrate(pool: &sqlx::PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
