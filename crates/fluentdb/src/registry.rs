//! Connection-string keyed cache of handles.
//!
//! Repeated lookups of the same connection string return the same
//! `Arc<Db>`, and therefore the same connection and transaction stack. This is
//! a keyed singleton, not a pool: callers sharing a handle share its state.

use crate::config::DbConfig;
use crate::db::Db;
use crate::driver::Driver;
use crate::error::DbResult;
use crate::monitor::SqlLogger;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;

#[cfg(feature = "mysql")]
use crate::driver::mysql::MySqlDriver;
#[cfg(feature = "mysql")]
use std::sync::OnceLock;

/// Lookup-or-create cache from connection string to handle.
pub struct Registry<D: Driver> {
    driver: D,
    config: DbConfig,
    logger: RwLock<Option<Arc<dyn SqlLogger>>>,
    handles: Mutex<HashMap<String, Arc<Db<D>>>>,
}

impl<D: Driver> std::fmt::Debug for Registry<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<D: Driver> Registry<D> {
    pub fn new(driver: D) -> Self {
        Self::with_config(driver, DbConfig::default())
    }

    /// Handles created by this registry use `config`.
    pub fn with_config(driver: D, config: DbConfig) -> Self {
        Self {
            driver,
            config,
            logger: RwLock::new(None),
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Handles created by this registry log through `logger`.
    pub fn with_logger(self, logger: impl SqlLogger + 'static) -> Self {
        *self.logger.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(logger));
        self
    }

    /// The handle for `dsn`, connecting on first use.
    ///
    /// Concurrent first lookups connect once. A failed connect caches nothing,
    /// so the next lookup tries again.
    pub async fn get(&self, dsn: &str) -> DbResult<Arc<Db<D>>> {
        let mut handles = self.handles.lock().await;
        if let Some(db) = handles.get(dsn) {
            return Ok(Arc::clone(db));
        }

        let db = Db::connect_with(self.driver.clone(), dsn, self.config.clone()).await?;
        if let Some(logger) = self.logger() {
            db.set_logger_arc(logger);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(target: "fluentdb.registry", handles = handles.len() + 1, "registered new handle");

        let db = Arc::new(db);
        handles.insert(dsn.to_string(), Arc::clone(&db));
        Ok(db)
    }

    /// Forget the handle for `dsn`. Holders of the `Arc` keep using it.
    pub async fn remove(&self, dsn: &str) -> Option<Arc<Db<D>>> {
        self.handles.lock().await.remove(dsn)
    }

    pub async fn len(&self) -> usize {
        self.handles.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.handles.lock().await.is_empty()
    }

    /// Set the logger for existing and future handles.
    pub async fn set_logger(&self, logger: impl SqlLogger + 'static) {
        let logger: Arc<dyn SqlLogger> = Arc::new(logger);
        *self.logger.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&logger));
        for db in self.handles.lock().await.values() {
            db.set_logger_arc(Arc::clone(&logger));
        }
    }

    fn logger(&self) -> Option<Arc<dyn SqlLogger>> {
        self.logger
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(feature = "mysql")]
static GLOBAL: OnceLock<Registry<MySqlDriver>> = OnceLock::new();

/// The process-wide MySQL registry.
#[cfg(feature = "mysql")]
pub fn global() -> &'static Registry<MySqlDriver> {
    GLOBAL.get_or_init(|| Registry::new(MySqlDriver))
}

/// The process-wide handle for `dsn`.
///
/// ```rust,ignore
/// let db = fluentdb::instance("root:pw@tcp(127.0.0.1:3306)/app").await?;
/// assert!(Arc::ptr_eq(&db, &fluentdb::instance("root:pw@tcp(127.0.0.1:3306)/app").await?));
/// ```
#[cfg(feature = "mysql")]
pub async fn instance(dsn: &str) -> DbResult<Arc<Db<MySqlDriver>>> {
    global().get(dsn).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::FakeDriver;
    use crate::monitor::from_fn;
    use std::sync::Mutex as StdMutex;

    const DSN_A: &str = "u:p@tcp(a:3306)/app";
    const DSN_B: &str = "u:p@tcp(b:3306)/app";

    #[tokio::test]
    async fn same_string_same_handle() {
        let driver = FakeDriver::new();
        let registry = Registry::new(driver.clone());

        let first = registry.get(DSN_A).await.unwrap();
        let second = registry.get(DSN_A).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(driver.connects(), 1);

        let other = registry.get(DSN_B).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn failed_connect_is_not_cached() {
        let driver = FakeDriver::new();
        let registry = Registry::new(driver.clone());

        driver.state().fail_connect = true;
        assert!(registry.get(DSN_A).await.unwrap_err().is_connection());
        assert!(registry.is_empty().await);

        driver.state().fail_connect = false;
        registry.get(DSN_A).await.unwrap();
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_lookups_connect_once() {
        let driver = FakeDriver::new();
        let registry = Arc::new(Registry::new(driver.clone()));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.get(DSN_A).await.unwrap() })
            })
            .collect();

        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap());
        }
        assert!(handles.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(driver.connects(), 1);
    }

    #[tokio::test]
    async fn shared_handle_shares_transaction_stack() {
        let registry = Registry::new(FakeDriver::new());
        let a = registry.get(DSN_A).await.unwrap();
        let b = registry.get(DSN_A).await.unwrap();

        a.begin().await.unwrap();
        assert_eq!(b.transaction_depth().await, 1);
        b.commit().await.unwrap();
        assert!(!a.in_transaction().await);
    }

    #[tokio::test]
    async fn remove_forgets_handle() {
        let driver = FakeDriver::new();
        let registry = Registry::new(driver.clone());
        let first = registry.get(DSN_A).await.unwrap();
        assert!(registry.remove(DSN_A).await.is_some());

        let second = registry.get(DSN_A).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(driver.connects(), 2);
    }

    #[tokio::test]
    async fn logger_reaches_existing_and_new_handles() {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let registry = Registry::new(FakeDriver::new());

        let a = registry.get(DSN_A).await.unwrap();
        registry
            .set_logger(from_fn(move |sql: &str| sink.lock().unwrap().push(sql.to_string())))
            .await;
        let b = registry.get(DSN_B).await.unwrap();

        a.exec("DO 1", &[]).await.unwrap();
        b.exec("DO 2", &[]).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["DO 1", "DO 2"]);
    }
}
