use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub job: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub price: Option<Decimal>,
}
