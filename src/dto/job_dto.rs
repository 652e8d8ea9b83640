use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::address::Address;
use crate::models::auction::Auction;
use crate::models::job::Job;
use crate::models::product::Product;
use crate::models::shipment::Shipment;
use crate::models::shipper::Shipper;

/// `job` sub-document of the post_job multipart request. The image URL and the
/// poster are injected server-side; payload values for either are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct JobPayload {
    #[validate(length(min = 1))]
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProductPayload {
    #[validate(length(min = 1))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddressPayload {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    pub street: Option<String>,
    pub ward: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ShipmentPayload {
    #[validate(nested)]
    pub pick_up: AddressPayload,
    #[validate(nested)]
    pub delivery_address: AddressPayload,
    pub shipping_date: NaiveDate,
    pub expected_delivery_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image: String,
    pub poster: Uuid,
    pub is_active: bool,
    pub winner: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub job: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressResponse {
    pub id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub street: Option<String>,
    pub ward: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentResponse {
    pub id: Uuid,
    pub job: Uuid,
    pub shipping_date: NaiveDate,
    pub expected_delivery_date: NaiveDate,
    pub pick_up: AddressResponse,
    pub delivery_address: AddressResponse,
}

/// Response of a successful aggregate create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobAggregateResponse {
    pub job: JobResponse,
    pub products: Vec<ProductResponse>,
    pub shipment: ShipmentResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipperInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionResponse {
    pub id: Uuid,
    pub bid_price: Option<Decimal>,
    pub created_at: Option<DateTime<Utc>>,
    pub shipper: ShipperInfo,
}

/// One job in a listing: job fields at the top level, shipment and products
/// nested, auctions only on the owner listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDocument {
    #[serde(flatten)]
    pub job: JobResponse,
    pub shipment: ShipmentResponse,
    pub products: Vec<ProductResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auctions: Option<Vec<AuctionResponse>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JobListQuery {
    #[serde(rename = "fromDate")]
    pub from_date: Option<String>,
    #[serde(rename = "toDate")]
    pub to_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptJobRequest {
    pub job: Uuid,
    pub shipper: Uuid,
}

impl From<Job> for JobResponse {
    fn from(value: Job) -> Self {
        Self {
            id: value.id,
            title: value.title,
            description: value.description,
            image: value.image,
            poster: value.poster,
            is_active: value.is_active,
            winner: value.winner,
            created_at: value.created_at,
        }
    }
}

impl From<Product> for ProductResponse {
    fn from(value: Product) -> Self {
        Self {
            id: value.id,
            job: value.job,
            name: value.name,
            description: value.description,
            quantity: value.quantity,
            price: value.price,
        }
    }
}

impl From<Address> for AddressResponse {
    fn from(value: Address) -> Self {
        Self {
            id: value.id,
            latitude: value.latitude,
            longitude: value.longitude,
            street: value.street,
            ward: value.ward,
            district: value.district,
            city: value.city,
        }
    }
}

impl ShipmentResponse {
    pub fn assemble(shipment: Shipment, pick_up: Address, delivery_address: Address) -> Self {
        Self {
            id: shipment.id,
            job: shipment.job,
            shipping_date: shipment.shipping_date,
            expected_delivery_date: shipment.expected_delivery_date,
            pick_up: pick_up.into(),
            delivery_address: delivery_address.into(),
        }
    }
}

impl AuctionResponse {
    pub fn assemble(auction: Auction, shipper: Shipper) -> Self {
        Self {
            id: auction.id,
            bid_price: auction.bid_price,
            created_at: auction.created_at,
            shipper: ShipperInfo {
                id: shipper.id,
                name: shipper.name,
                email: shipper.email,
            },
        }
    }
}
