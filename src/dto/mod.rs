pub mod job_dto;
pub mod user_dto;
