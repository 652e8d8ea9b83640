use std::sync::Arc;

use bytes::Bytes;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::dto::job_dto::{
    AddressPayload, AuctionResponse, JobAggregateResponse, JobDocument, JobPayload, JobResponse,
    ProductPayload, ShipmentPayload, ShipmentResponse,
};
use crate::error::{Error, Result};
use crate::models::address::Address;
use crate::models::auction::Auction;
use crate::models::job::Job;
use crate::models::product::Product;
use crate::models::shipment::Shipment;
use crate::models::shipper::Shipper;

const JOB_COLUMNS: &str = "id, title, description, image, poster, is_active, winner, created_at";
const PRODUCT_COLUMNS: &str = "id, job, name, description, quantity, price";
const ADDRESS_COLUMNS: &str = "id, latitude, longitude, street, ward, district, city";
const SHIPMENT_COLUMNS: &str =
    "id, job, pick_up, delivery_address, shipping_date, expected_delivery_date, created_at";

#[derive(Clone)]
pub struct JobService {
    pool: PgPool,
    images: Arc<dyn crate::services::image_store::ImageStore>,
}

impl JobService {
    pub fn new(pool: PgPool, images: Arc<dyn crate::services::image_store::ImageStore>) -> Self {
        Self { pool, images }
    }

    /// Creates the whole job aggregate: one job, its products, the two shipment
    /// addresses and the shipment itself. The image upload happens before the
    /// transaction opens, so a failure after it leaves the uploaded image
    /// orphaned in the store. Everything else is all-or-nothing: the
    /// transaction guard rolls back on any early return.
    pub async fn post_job(
        &self,
        poster: Uuid,
        job: JobPayload,
        products: Vec<ProductPayload>,
        shipment: ShipmentPayload,
        image: Bytes,
        image_name: &str,
    ) -> Result<JobAggregateResponse> {
        let image_url = self.images.upload(image, image_name, "job_image").await?;

        let mut tx = self.pool.begin().await?;

        job.validate()?;
        let job_row = sqlx::query_as::<_, Job>(&format!(
            "INSERT INTO jobs (title, description, image, poster)
             VALUES ($1, $2, $3, $4)
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(&job.title)
        .bind(&job.description)
        .bind(&image_url)
        .bind(poster)
        .fetch_one(&mut *tx)
        .await?;

        let mut product_rows = Vec::with_capacity(products.len());
        for product in &products {
            product.validate()?;
            let row = sqlx::query_as::<_, Product>(&format!(
                "INSERT INTO products (job, name, description, quantity, price)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING {PRODUCT_COLUMNS}"
            ))
            .bind(job_row.id)
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.quantity.unwrap_or(1))
            .bind(product.price)
            .fetch_one(&mut *tx)
            .await?;
            product_rows.push(row);
        }

        let pick_up = Self::insert_address(&mut tx, &shipment.pick_up).await?;
        let delivery_address = Self::insert_address(&mut tx, &shipment.delivery_address).await?;

        // Address rows must exist before the shipment references them.
        let shipment_row = sqlx::query_as::<_, Shipment>(&format!(
            "INSERT INTO shipments (job, pick_up, delivery_address, shipping_date, expected_delivery_date)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {SHIPMENT_COLUMNS}"
        ))
        .bind(job_row.id)
        .bind(pick_up.id)
        .bind(delivery_address.id)
        .bind(shipment.shipping_date)
        .bind(shipment.expected_delivery_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(job = %job_row.id, products = product_rows.len(), "Job aggregate created");

        Ok(JobAggregateResponse {
            job: job_row.into(),
            products: product_rows.into_iter().map(Into::into).collect(),
            shipment: ShipmentResponse::assemble(shipment_row, pick_up, delivery_address),
        })
    }

    async fn insert_address(
        tx: &mut Transaction<'_, Postgres>,
        payload: &AddressPayload,
    ) -> Result<Address> {
        payload.validate()?;
        let row = sqlx::query_as::<_, Address>(&format!(
            "INSERT INTO addresses (latitude, longitude, street, ward, district, city)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(payload.latitude)
        .bind(payload.longitude)
        .bind(&payload.street)
        .bind(&payload.ward)
        .bind(&payload.district)
        .bind(&payload.city)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row)
    }

    /// Public listing: active jobs with their shipment and products. The date
    /// filter only applies when both bounds are present; a single bound means
    /// no filter at all.
    pub async fn list_jobs(&self, range: Option<(NaiveDate, NaiveDate)>) -> Result<Vec<JobDocument>> {
        let jobs = match range {
            Some((from, to)) => {
                sqlx::query_as::<_, Job>(&format!(
                    "SELECT {JOB_COLUMNS} FROM jobs
                     WHERE is_active = TRUE
                       AND id IN (
                           SELECT job FROM shipments
                           WHERE shipping_date >= $1 AND expected_delivery_date <= $2
                       )
                     ORDER BY created_at DESC"
                ))
                .bind(from)
                .bind(to)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Job>(&format!(
                    "SELECT {JOB_COLUMNS} FROM jobs
                     WHERE is_active = TRUE
                     ORDER BY created_at DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        self.enrich(jobs, false).await
    }

    /// Owner listing: active jobs of the caller, enriched with auction bids.
    pub async fn my_jobs(&self, poster: Uuid) -> Result<Vec<JobDocument>> {
        let jobs = sqlx::query_as::<_, Job>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs
             WHERE is_active = TRUE AND poster = $1
             ORDER BY created_at DESC"
        ))
        .bind(poster)
        .fetch_all(&self.pool)
        .await?;

        self.enrich(jobs, true).await
    }

    async fn enrich(&self, jobs: Vec<Job>, with_auctions: bool) -> Result<Vec<JobDocument>> {
        let mut documents = Vec::with_capacity(jobs.len());
        for job in jobs {
            // One shipment per job is the contract; take the first one found.
            let Some(shipment) = sqlx::query_as::<_, Shipment>(&format!(
                "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE job = $1 ORDER BY created_at LIMIT 1"
            ))
            .bind(job.id)
            .fetch_optional(&self.pool)
            .await?
            else {
                warn!(job = %job.id, "Job has no shipment, skipping");
                continue;
            };

            let pick_up = self.get_address(shipment.pick_up).await?;
            let delivery_address = self.get_address(shipment.delivery_address).await?;

            let products = sqlx::query_as::<_, Product>(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products WHERE job = $1"
            ))
            .bind(job.id)
            .fetch_all(&self.pool)
            .await?;

            let auctions = if with_auctions {
                Some(self.auctions_for(job.id).await?)
            } else {
                None
            };

            documents.push(JobDocument {
                job: JobResponse::from(job),
                shipment: ShipmentResponse::assemble(shipment, pick_up, delivery_address),
                products: products.into_iter().map(Into::into).collect(),
                auctions,
            });
        }
        Ok(documents)
    }

    async fn get_address(&self, id: Uuid) -> Result<Address> {
        let row = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn auctions_for(&self, job: Uuid) -> Result<Vec<AuctionResponse>> {
        let auctions = sqlx::query_as::<_, Auction>(
            "SELECT id, job, shipper, bid_price, created_at
             FROM auctions
             WHERE job = $1
             ORDER BY created_at",
        )
        .bind(job)
        .fetch_all(&self.pool)
        .await?;

        let mut responses = Vec::with_capacity(auctions.len());
        for auction in auctions {
            let shipper = sqlx::query_as::<_, Shipper>(
                "SELECT id, name, email, phone, created_at FROM shippers WHERE id = $1",
            )
            .bind(auction.shipper)
            .fetch_one(&self.pool)
            .await?;
            responses.push(AuctionResponse::assemble(auction, shipper));
        }
        Ok(responses)
    }

    /// Assigns the winning shipper. The job lookup is scoped to the caller as
    /// poster, so a job owned by someone else is indistinguishable from a
    /// missing one. An already-set winner is overwritten; last write wins.
    pub async fn accept(&self, poster: Uuid, job_id: Uuid, shipper_id: Uuid) -> Result<()> {
        let job = sqlx::query_as::<_, Job>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1 AND poster = $2"
        ))
        .bind(job_id)
        .bind(poster)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Job not found".to_string()))?;

        let shipper = sqlx::query_as::<_, Shipper>(
            "SELECT id, name, email, phone, created_at FROM shippers WHERE id = $1",
        )
        .bind(shipper_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Shipper not found".to_string()))?;

        sqlx::query("UPDATE jobs SET winner = $1 WHERE id = $2")
            .bind(shipper.id)
            .bind(job.id)
            .execute(&self.pool)
            .await?;

        info!(job = %job.id, shipper = %shipper.id, "Job accepted");
        Ok(())
    }
}
