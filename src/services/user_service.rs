use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::services::code_store::CodeStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpStatus {
    Sent,
    AlreadySent,
}

impl OtpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpStatus::Sent => "sent",
            OtpStatus::AlreadySent => "already_sent",
        }
    }
}

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
    codes: Arc<dyn CodeStore>,
    otp_ttl: Duration,
}

impl UserService {
    pub fn new(pool: PgPool, codes: Arc<dyn CodeStore>, otp_ttl: Duration) -> Self {
        Self {
            pool,
            codes,
            otp_ttl,
        }
    }

    /// Stores a fresh one-time code for the caller unless an unexpired one is
    /// already present. Actual email dispatch is an external collaborator;
    /// this only records the code and signals which case applied.
    pub async fn send_otp(&self, email: &str) -> Result<OtpStatus> {
        if self.codes.get(email).await?.is_some() {
            return Ok(OtpStatus::AlreadySent);
        }

        let code = generate_code();
        self.codes.set(email, &code, self.otp_ttl).await?;
        info!(email = %email, "One-time code stored");
        Ok(OtpStatus::Sent)
    }

    /// Compares the supplied code with the stored one and marks the user as
    /// verified on an exact match. A missing entry means the store evicted it.
    pub async fn verify_email(&self, user_id: Uuid, email: &str, code: &str) -> Result<()> {
        let stored = self.codes.get(email).await?.ok_or(Error::CodeExpired)?;
        if stored != code {
            return Err(Error::BadRequest("Incorrect code".to_string()));
        }

        sqlx::query("UPDATE users SET verified = TRUE WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        info!(user = %user_id, "Email verified");
        Ok(())
    }
}

fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}
