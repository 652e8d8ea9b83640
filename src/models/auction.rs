use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Auction {
    pub id: Uuid,
    pub job: Uuid,
    pub shipper: Uuid,
    pub bid_price: Option<Decimal>,
    pub created_at: Option<DateTime<Utc>>,
}
