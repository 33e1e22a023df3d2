// src/db.rs
use std::future::Future;
use std::time::Duration;

use chrono::NaiveDateTime;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, Pool, Postgres};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::error::PollError;
use crate::models::{PollWindow, VoteOperation, VotingPower};

/// Read-only access to the governance warehouse.
pub trait Warehouse: Send + Sync {
    /// True when no live connection to the warehouse can be obtained.
    fn is_closed(&self) -> impl Future<Output = bool> + Send;

    fn reconnect(&self) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    fn poll_window(
        &self,
        code: u64,
    ) -> impl Future<Output = Result<Option<PollWindow>, sqlx::Error>> + Send;

    /// Operations for a poll, most recent first.
    fn vote_operations(
        &self,
        code: u64,
    ) -> impl Future<Output = Result<Vec<VoteOperation>, sqlx::Error>> + Send;

    fn voting_power(&self) -> impl Future<Output = Result<Vec<VotingPower>, sqlx::Error>> + Send;

    /// Most recent load of the votes table, if any load has run.
    fn last_load(&self) -> impl Future<Output = Result<Option<NaiveDateTime>, sqlx::Error>> + Send;
}

/// Reconnects once if the warehouse reports a closed connection.
pub async fn ensure_connected<W: Warehouse>(warehouse: &W) -> Result<(), PollError> {
    if !warehouse.is_closed().await {
        return Ok(());
    }

    tracing::warn!("warehouse connection is closed, reconnecting");
    if let Err(e) = warehouse.reconnect().await {
        tracing::error!("reconnection failed: {}", e);
        return Err(PollError::DatabaseConnection);
    }
    if warehouse.is_closed().await {
        tracing::error!("reconnection failed: connection still closed");
        return Err(PollError::DatabaseConnection);
    }
    Ok(())
}

fn pool_options(config: &PoolConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
}

pub async fn create_pool(config: &PoolConfig) -> Result<Pool<Postgres>, sqlx::Error> {
    pool_options(config).connect(&config.database_url).await
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl From<&Config> for PoolConfig {
    fn from(config: &Config) -> Self {
        Self {
            database_url: config.database_url.clone(),
            max_connections: config.max_connections,
            acquire_timeout: config.acquire_timeout,
        }
    }
}

struct Queries {
    poll_window: String,
    vote_operations: String,
    voting_power: String,
    last_load: String,
}

impl Queries {
    fn new(schema: &str) -> Self {
        Self {
            poll_window: format!(
                "select start_timestamp, end_timestamp \
                 from {schema}.yays \
                 where type = 'poll' and code::text = $1"
            ),
            vote_operations: format!(
                "select v.timestamp, v.tx_hash, v.voter, v.operation, \
                        v.dapproval::float8 as dapproval, v.option, v.proxy \
                 from {schema}.votes v \
                 where v.yay::text = $1 \
                 order by v.order_index desc, v.operation desc"
            ),
            voting_power: format!(
                "select voter, voting_power::float8 as voting_power \
                 from {schema}.voting_power"
            ),
            last_load: format!("select max(load_id) from {schema}.votes_scheduler"),
        }
    }
}

/// Postgres-backed warehouse whose pool can be replaced on reconnect.
pub struct PgWarehouse {
    pool_config: PoolConfig,
    pool: RwLock<Pool<Postgres>>,
    queries: Queries,
}

impl PgWarehouse {
    /// Connections are opened on first use, so the service starts even
    /// while the warehouse is unreachable.
    pub fn new(config: &Config) -> Result<Self, sqlx::Error> {
        let pool_config = PoolConfig::from(config);
        let pool = pool_options(&pool_config).connect_lazy(&pool_config.database_url)?;
        Ok(Self {
            pool_config,
            pool: RwLock::new(pool),
            queries: Queries::new(&config.schema),
        })
    }

    async fn pool(&self) -> Pool<Postgres> {
        self.pool.read().await.clone()
    }
}

impl Warehouse for PgWarehouse {
    async fn is_closed(&self) -> bool {
        let pool = self.pool().await;
        if pool.is_closed() {
            return true;
        }
        match pool.acquire().await {
            Ok(mut conn) => match conn.ping().await {
                Ok(()) => false,
                Err(e) => {
                    tracing::warn!("warehouse ping failed: {}", e);
                    true
                }
            },
            Err(e) => {
                tracing::warn!("no warehouse connection available: {}", e);
                true
            }
        }
    }

    async fn reconnect(&self) -> Result<(), sqlx::Error> {
        let fresh = create_pool(&self.pool_config).await?;
        let stale = std::mem::replace(&mut *self.pool.write().await, fresh);
        stale.close().await;
        tracing::info!("warehouse connection re-established");
        Ok(())
    }

    async fn poll_window(&self, code: u64) -> Result<Option<PollWindow>, sqlx::Error> {
        sqlx::query_as::<_, PollWindow>(&self.queries.poll_window)
            .bind(code.to_string())
            .fetch_optional(&self.pool().await)
            .await
    }

    async fn vote_operations(&self, code: u64) -> Result<Vec<VoteOperation>, sqlx::Error> {
        sqlx::query_as::<_, VoteOperation>(&self.queries.vote_operations)
            .bind(code.to_string())
            .fetch_all(&self.pool().await)
            .await
    }

    async fn voting_power(&self) -> Result<Vec<VotingPower>, sqlx::Error> {
        sqlx::query_as::<_, VotingPower>(&self.queries.voting_power)
            .fetch_all(&self.pool().await)
            .await
    }

    async fn last_load(&self) -> Result<Option<NaiveDateTime>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<NaiveDateTime>>(&self.queries.last_load)
            .fetch_one(&self.pool().await)
            .await
    }
}
