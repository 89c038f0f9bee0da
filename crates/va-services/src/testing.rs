//! In-memory wiring for tests
//!
//! Builds a [`ServiceContext`] over the memory stores, a recording email
//! sender and the memory job queue, and keeps handles on the latter two so
//! tests can inspect what was sent and scheduled.

use std::sync::Arc;

use chrono::Utc;
use va_core::config::{AppConfig, StorageBackend};
use va_db::Stores;
use va_models::User;
use va_notifications::{MemoryEmailSender, MemoryJobQueue};

use crate::context::ServiceContext;

pub struct TestContext {
    pub ctx: ServiceContext,
    pub emails: Arc<MemoryEmailSender>,
    pub jobs: Arc<MemoryJobQueue>,
}

impl TestContext {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.storage = StorageBackend::Memory;
        config.auth.jwt_secret = "test-secret".to_string();

        let emails = Arc::new(MemoryEmailSender::new());
        let jobs = Arc::new(MemoryJobQueue::new());
        let ctx = ServiceContext::new(&config, Stores::memory(), emails.clone(), jobs.clone());
        Self { ctx, emails, jobs }
    }

    /// Insert a verified user directly into the store
    pub async fn user(&self, user_name: &str, full_name: &str) -> User {
        let email = format!("{}@example.com", user_name.to_lowercase());
        let user = User {
            id: uuid::Uuid::new_v4(),
            user_name: user_name.to_string(),
            email,
            password_hash: String::new(),
            full_name: full_name.to_string(),
            verify_token: None,
            verify_token_expiry: None,
            reset_token: None,
            reset_token_expiry: None,
            verified: true,
            created_at: Utc::now(),
        };
        match self.ctx.stores.users.create(user.clone()).await {
            Ok(created) => created,
            Err(_) => user,
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
