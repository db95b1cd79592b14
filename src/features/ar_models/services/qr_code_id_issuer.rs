use rand::{rngs::OsRng, RngCore};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::core::error::AppError;
use crate::features::ar_models::stores::{ArModelStore, StoreError};

/// Number of random bytes in a QR code id (rendered as twice as many hex chars)
pub const QR_CODE_ID_BYTES: usize = 8;

/// Upper bound on generate-and-check rounds for a single id
pub const MAX_ISSUE_ATTEMPTS: usize = 1000;

#[derive(Debug, Error)]
pub enum IssueError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("No unused QR code id found after {attempts} attempts")]
    Exhausted { attempts: usize },
}

impl From<IssueError> for AppError {
    fn from(e: IssueError) -> Self {
        match e {
            IssueError::Store(e) => e.into(),
            IssueError::Exhausted { attempts } => AppError::ServiceUnavailable(format!(
                "Could not allocate a QR code id after {} attempts",
                attempts
            )),
        }
    }
}

/// 8 bytes from the OS random source as 16 uppercase hex characters
pub fn generate_qr_code_id() -> String {
    let mut bytes = [0u8; QR_CODE_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode_upper(bytes)
}

type IdGenerator = Box<dyn Fn() -> String + Send + Sync>;

/// Mints short QR code ids that no stored record uses yet
pub struct QrCodeIdIssuer {
    store: Arc<dyn ArModelStore>,
    generator: IdGenerator,
    max_attempts: usize,
}

impl QrCodeIdIssuer {
    pub fn new(store: Arc<dyn ArModelStore>) -> Self {
        Self {
            store,
            generator: Box::new(generate_qr_code_id),
            max_attempts: MAX_ISSUE_ATTEMPTS,
        }
    }

    /// Replace the random source, e.g. to force collisions
    #[cfg(test)]
    pub fn with_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.generator = Box::new(generator);
        self
    }

    #[cfg(test)]
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Generate ids until one is not used by any record, active or inactive.
    ///
    /// The id is not reserved: the unique index on insert remains the final
    /// arbiter when two uploads race.
    pub async fn issue(&self) -> Result<String, IssueError> {
        for attempt in 1..=self.max_attempts {
            let candidate = (self.generator)();

            if !self.store.qr_code_id_exists(&candidate).await? {
                return Ok(candidate);
            }

            debug!(
                "QR code id collision on attempt {}: {}, regenerating",
                attempt, candidate
            );
        }

        Err(IssueError::Exhausted {
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ar_models::stores::InMemoryArModelStore;
    use crate::shared::test_helpers::{id_sequence, new_record, FailingStore};
    use std::collections::HashSet;

    fn is_qr_code_id(s: &str) -> bool {
        s.len() == 16 && s.chars().all(|c| matches!(c, '0'..='9' | 'A'..='F'))
    }

    #[test]
    fn test_generate_qr_code_id_format() {
        for _ in 0..100 {
            let id = generate_qr_code_id();
            assert!(is_qr_code_id(&id), "unexpected id format: {}", id);
        }
    }

    #[test]
    fn test_generate_qr_code_id_varies() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_qr_code_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[tokio::test]
    async fn test_issue_returns_first_unused_id() {
        let store = Arc::new(InMemoryArModelStore::new());
        let issuer = QrCodeIdIssuer::new(store);

        let id = issuer.issue().await.unwrap();
        assert!(is_qr_code_id(&id));
    }

    #[tokio::test]
    async fn test_issue_skips_ids_of_active_and_inactive_records() {
        let store = Arc::new(InMemoryArModelStore::new());
        store.insert(new_record(1, "AAAAAAAAAAAAAAAA")).await.unwrap();
        let inactive = store.insert(new_record(2, "BBBBBBBBBBBBBBBB")).await.unwrap();
        store.deactivate(inactive.id).await;

        let issuer = QrCodeIdIssuer::new(store).with_generator(id_sequence(&[
            "AAAAAAAAAAAAAAAA",
            "BBBBBBBBBBBBBBBB",
            "AAAAAAAAAAAAAAAA",
            "CCCCCCCCCCCCCCCC",
        ]));

        assert_eq!(issuer.issue().await.unwrap(), "CCCCCCCCCCCCCCCC");
    }

    #[tokio::test]
    async fn test_issue_never_returns_seeded_id() {
        let store = Arc::new(InMemoryArModelStore::new());
        let mut seeded = HashSet::new();
        for n in 0..50u32 {
            let id = format!("{:016X}", n * 2);
            store.insert(new_record(n, &id)).await.unwrap();
            seeded.insert(id);
        }

        // Cycles through 0..100, half of which are already taken
        let counter = std::sync::atomic::AtomicU32::new(0);
        let issuer = QrCodeIdIssuer::new(store.clone()).with_generator(move || {
            let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) % 100;
            format!("{:016X}", n)
        });

        for _ in 0..20 {
            let id = issuer.issue().await.unwrap();
            assert!(!seeded.contains(&id));
            assert!(!store.qr_code_id_exists(&id).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_issue_gives_up_after_max_attempts() {
        let store = Arc::new(InMemoryArModelStore::new());
        store.insert(new_record(1, "DEADBEEFDEADBEEF")).await.unwrap();

        let issuer = QrCodeIdIssuer::new(store)
            .with_generator(|| "DEADBEEFDEADBEEF".to_string())
            .with_max_attempts(25);

        match issuer.issue().await {
            Err(IssueError::Exhausted { attempts }) => assert_eq!(attempts, 25),
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[test]
    fn test_default_cap() {
        let issuer = QrCodeIdIssuer::new(Arc::new(InMemoryArModelStore::new()));
        assert_eq!(issuer.max_attempts, MAX_ISSUE_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_issue_surfaces_store_failure() {
        let issuer = QrCodeIdIssuer::new(Arc::new(FailingStore));

        match issuer.issue().await {
            Err(IssueError::Store(StoreError::Unavailable(_))) => {}
            other => panic!("expected store failure, got {:?}", other),
        }
    }
}
