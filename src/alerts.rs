// Transient user-facing error entries with auto-expiry

use chrono::Utc;
use log::{error, warn};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use uuid::Uuid;

use crate::models::AppError;

pub const DEFAULT_ERROR_TTL: Duration = Duration::from_secs(5);

/// Collects reported errors; each entry removes itself after the TTL.
/// Identical reports are kept as separate entries.
pub struct ErrorAggregator {
    errors: Arc<Mutex<Vec<AppError>>>,
    expiries: Mutex<Vec<JoinHandle<()>>>,
    ttl: Duration,
}

impl ErrorAggregator {
    pub fn new(ttl: Duration) -> Self {
        ErrorAggregator {
            errors: Arc::new(Mutex::new(Vec::new())),
            expiries: Mutex::new(Vec::new()),
            ttl,
        }
    }

    /// Record an error and schedule its removal. Must be called from within a
    /// tokio runtime for the expiry to be scheduled.
    pub fn report(&self, code: &str, message: &str) -> AppError {
        let entry = AppError {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
        };
        error!("[{}] {}", code, message);

        if let Ok(mut errors) = self.errors.lock() {
            errors.push(entry.clone());
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let errors = self.errors.clone();
                let id = entry.id.clone();
                let ttl = self.ttl;
                let expiry = handle.spawn(async move {
                    tokio::time::sleep(ttl).await;
                    if let Ok(mut errors) = errors.lock() {
                        errors.retain(|e| e.id != id);
                    }
                });
                if let Ok(mut expiries) = self.expiries.lock() {
                    expiries.retain(|h| !h.is_finished());
                    expiries.push(expiry);
                }
            }
            Err(_) => warn!("No runtime available, error {} will not auto-expire", entry.id),
        }

        entry
    }

    /// Snapshot of the live errors, oldest first.
    pub fn current(&self) -> Vec<AppError> {
        match self.errors.lock() {
            Ok(errors) => errors.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn remove(&self, id: &str) -> bool {
        if let Ok(mut errors) = self.errors.lock() {
            let before = errors.len();
            errors.retain(|e| e.id != id);
            return errors.len() != before;
        }
        false
    }

    pub fn clear(&self) {
        if let Ok(mut errors) = self.errors.lock() {
            errors.clear();
        }
        if let Ok(mut expiries) = self.expiries.lock() {
            for handle in expiries.drain(..) {
                handle.abort();
            }
        }
    }
}

impl Default for ErrorAggregator {
    fn default() -> Self {
        ErrorAggregator::new(DEFAULT_ERROR_TTL)
    }
}

impl Drop for ErrorAggregator {
    fn drop(&mut self) {
        if let Ok(mut expiries) = self.expiries.lock() {
            for handle in expiries.drain(..) {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_errors_expire_after_ttl() {
        let alerts = ErrorAggregator::default();
        alerts.report("LOAD_ERROR", "Failed to load chats");
        assert_eq!(alerts.current().len(), 1);

        tokio::time::sleep(Duration::from_millis(4900)).await;
        assert_eq!(alerts.current().len(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(alerts.current().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicates_get_their_own_timer() {
        let alerts = ErrorAggregator::default();
        alerts.report("VALIDATION_ERROR", "Message too long");
        tokio::time::sleep(Duration::from_secs(2)).await;
        alerts.report("VALIDATION_ERROR", "Message too long");

        let current = alerts.current();
        assert_eq!(current.len(), 2);
        assert_ne!(current[0].id, current[1].id);

        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(alerts.current().len(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(alerts.current().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_and_clear() {
        let alerts = ErrorAggregator::new(Duration::from_secs(60));
        let first = alerts.report("A", "first");
        alerts.report("B", "second");

        assert!(alerts.remove(&first.id));
        assert!(!alerts.remove(&first.id));
        assert_eq!(alerts.current()[0].code, "B");

        alerts.clear();
        assert!(alerts.current().is_empty());
    }

    #[test]
    fn test_report_without_runtime_keeps_entry() {
        let alerts = ErrorAggregator::default();
        alerts.report("SETUP", "no runtime here");
        assert_eq!(alerts.current().len(), 1);
    }
}
