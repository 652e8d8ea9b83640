pub mod code_store;
pub mod image_store;
pub mod job_service;
pub mod user_service;
