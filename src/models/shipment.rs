use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Shipment {
    pub id: Uuid,
    pub job: Uuid,
    pub pick_up: Uuid,
    pub delivery_address: Uuid,
    pub shipping_date: NaiveDate,
    pub expected_delivery_date: NaiveDate,
    pub created_at: Option<DateTime<Utc>>,
}
