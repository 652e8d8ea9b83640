pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::services::{
    code_store::{CodeStore, RedisCodeStore},
    image_store::{HttpImageStore, ImageStore},
    job_service::JobService,
    user_service::UserService,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub job_service: JobService,
    pub user_service: UserService,
}

impl AppState {
    /// Wires the services with explicitly injected collaborators. Tests pass
    /// their own image/code stores here.
    pub fn new(pool: PgPool, images: Arc<dyn ImageStore>, codes: Arc<dyn CodeStore>) -> Self {
        let config = crate::config::get_config();
        let job_service = JobService::new(pool.clone(), images);
        let user_service = UserService::new(
            pool.clone(),
            codes,
            Duration::from_secs(config.otp_ttl_secs),
        );

        Self {
            pool,
            job_service,
            user_service,
        }
    }

    /// Production wiring: HTTP image store and Redis code store from config.
    pub async fn from_config(pool: PgPool) -> crate::error::Result<Self> {
        let config = crate::config::get_config();
        let images = Arc::new(HttpImageStore::new(
            config.image_store_url.clone(),
            config.image_store_api_key.clone(),
        ));
        let codes = Arc::new(RedisCodeStore::connect(&config.redis_url).await?);
        Ok(Self::new(pool, images, codes))
    }
}
