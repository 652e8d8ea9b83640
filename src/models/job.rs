use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image: String,
    pub poster: Uuid,
    pub is_active: bool,
    pub winner: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
}
