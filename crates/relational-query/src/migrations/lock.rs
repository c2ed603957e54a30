//! Exclusive migrations lock.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use super::connection::MigrationConnection;
use super::history::LockReleaseBehavior;
use crate::error::Result;

/// A held migrations lock.
///
/// Releasing is idempotent: only the first `release` or `release_async`
/// call sends the release statement. A lock dropped while still held is
/// released on drop through the blocking path; failures there are logged.
pub struct DatabaseLock {
    connection: Arc<dyn MigrationConnection>,
    release_sql: String,
    behavior: LockReleaseBehavior,
    released: AtomicBool,
}

impl DatabaseLock {
    pub fn new(
        connection: Arc<dyn MigrationConnection>,
        release_sql: impl Into<String>,
        behavior: LockReleaseBehavior,
    ) -> Self {
        Self {
            connection,
            release_sql: release_sql.into(),
            behavior,
            released: AtomicBool::new(false),
        }
    }

    pub fn release_behavior(&self) -> LockReleaseBehavior {
        self.behavior
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub fn release(&self) -> Result<()> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.connection.execute_non_query(&self.release_sql)?;
        info!("Released migrations lock");
        Ok(())
    }

    pub async fn release_async(&self) -> Result<()> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.connection.execute_non_query_async(&self.release_sql).await?;
        info!("Released migrations lock");
        Ok(())
    }
}

impl Drop for DatabaseLock {
    fn drop(&mut self) {
        if self.is_released() {
            return;
        }
        if let Err(e) = self.release() {
            warn!("Failed to release migrations lock on drop: {}", e);
        }
    }
}

impl fmt::Debug for DatabaseLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseLock")
            .field("behavior", &self.behavior)
            .field("released", &self.is_released())
            .finish()
    }
}
