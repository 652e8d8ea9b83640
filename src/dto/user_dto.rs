use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VerifyEmailRequest {
    #[validate(length(min = 1))]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpStatusResponse {
    pub status: String,
}
