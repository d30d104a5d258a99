//! Physical connection ownership and idle-timeout tracking.
//!
//! MySQL drops connections that stay idle longer than `wait_timeout`. The
//! server's value is read once per handle; every operation then checks an
//! expiry watermark and reconnects before touching a connection the server
//! has probably closed already.

use crate::config::DbConfig;
use crate::driver::{Driver, DriverConnection};
use crate::dsn::ConnectOptions;
use crate::error::{DbError, DbResult};
use crate::transaction::TransactionStack;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

pub(crate) const WAIT_TIMEOUT_SQL: &str = "SHOW VARIABLES WHERE Variable_name = 'wait_timeout'";

/// Run `future` under an optional deadline.
pub(crate) async fn with_deadline<T, F>(limit: Option<Duration>, future: F) -> DbResult<T>
where
    F: Future<Output = DbResult<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| DbError::Timeout(limit))?,
        None => future.await,
    }
}

/// One physical connection plus the state that lives and dies with it.
pub(crate) struct Connection<D: Driver> {
    driver: D,
    options: ConnectOptions,
    config: DbConfig,
    conn: Option<D::Conn>,
    idle_timeout: Option<Duration>,
    expires_at: Instant,
    pub(crate) transactions: TransactionStack,
}

impl<D: Driver> Connection<D> {
    /// Connect, ping and learn the server idle timeout.
    pub(crate) async fn open(driver: D, options: ConnectOptions, config: DbConfig) -> DbResult<Self> {
        let mut connection = Self {
            driver,
            options,
            config,
            conn: None,
            idle_timeout: None,
            expires_at: Instant::now(),
            transactions: TransactionStack::new(),
        };
        let deadline = connection.config.query_timeout;
        with_deadline(deadline, connection.reconnect()).await?;
        Ok(connection)
    }

    pub(crate) fn config(&self) -> &DbConfig {
        &self.config
    }

    /// The idle timeout in effect (server-reported or fallback).
    pub(crate) fn idle_timeout(&self) -> Duration {
        self.idle_timeout
            .unwrap_or(self.config.fallback_idle_timeout)
    }

    pub(crate) fn is_expired(&self) -> bool {
        self.conn.is_none() || Instant::now() >= self.expires_at
    }

    /// Push the expiry watermark forward from now.
    pub(crate) fn touch(&mut self) {
        self.expires_at = Instant::now() + self.config.connection_ttl(self.idle_timeout());
    }

    /// A connection that is safe to use right now.
    ///
    /// An expired connection is replaced first. If that happens while
    /// transaction scopes are open, the server has already rolled them back:
    /// the stack is cleared and the call fails.
    pub(crate) async fn ensure_live(&mut self) -> DbResult<&mut D::Conn> {
        if self.is_expired() {
            let lost = self.transactions.clear();
            self.reconnect().await?;
            if lost > 0 {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    target: "fluentdb.conn",
                    depth = lost,
                    "connection expired inside a transaction; open scopes were discarded"
                );
                return Err(DbError::connection(format!(
                    "connection expired with {lost} open transaction scope(s); the server discarded them"
                )));
            }
        } else {
            self.touch();
        }
        self.conn
            .as_mut()
            .ok_or_else(|| DbError::connection("not connected"))
    }

    /// Drop the current connection (if any) and open a fresh one.
    async fn reconnect(&mut self) -> DbResult<()> {
        if let Some(old) = self.conn.take() {
            #[cfg(feature = "tracing")]
            tracing::debug!(target: "fluentdb.conn", "closing expired connection");
            // The server may have closed it already.
            let _ = old.close().await;
        }

        let connect = self.driver.connect(&self.options);
        let mut conn = match self.options.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, connect)
                .await
                .map_err(|_| DbError::connection(format!("connect timed out after {limit:?}")))??,
            None => connect.await?,
        };
        conn.ping().await?;

        if self.idle_timeout.is_none() {
            let fallback = self.config.fallback_idle_timeout;
            self.idle_timeout = Some(learn_idle_timeout(&mut conn, fallback).await);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            target: "fluentdb.conn",
            database = %self.options.database,
            idle_timeout = ?self.idle_timeout(),
            "connected"
        );

        self.conn = Some(conn);
        self.touch();
        Ok(())
    }

    /// Forget a connection whose statement was cut off mid-flight.
    ///
    /// Whether the server applied the statement is unknown, so the connection
    /// is dropped without a goodbye and every open scope with it. Returns the
    /// number of scopes discarded.
    pub(crate) fn discard(&mut self) -> usize {
        let lost = self.transactions.clear();
        if self.conn.take().is_some() {
            #[cfg(feature = "tracing")]
            tracing::warn!(target: "fluentdb.conn", depth = lost, "dropping interrupted connection");
        }
        lost
    }

    /// Close the physical connection. The next operation reconnects.
    pub(crate) async fn close(&mut self) -> DbResult<()> {
        self.transactions.clear();
        match self.conn.take() {
            Some(conn) => conn.close().await,
            None => Ok(()),
        }
    }
}

async fn learn_idle_timeout<C: DriverConnection>(conn: &mut C, fallback: Duration) -> Duration {
    let rows = match conn.query(WAIT_TIMEOUT_SQL, &[]).await {
        Ok(rows) => rows,
        Err(_e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(target: "fluentdb.conn", error = %_e, ?fallback, "could not read wait_timeout");
            return fallback;
        }
    };
    let parsed = rows
        .first()
        .and_then(|row| row.get("Value"))
        .and_then(|v| v.trim().parse::<u64>().ok());
    match parsed {
        Some(secs) => Duration::from_secs(secs),
        None => {
            #[cfg(feature = "tracing")]
            tracing::warn!(target: "fluentdb.conn", ?fallback, "wait_timeout missing or not numeric");
            fallback
        }
    }
}
