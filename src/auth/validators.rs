use super::models::UserCreate;
use crate::common::{is_valid_email, ValidationResult, Validator};

impl Validator<UserCreate> for UserCreate {
    fn validate(&self, data: &UserCreate) -> ValidationResult {
        let mut result = ValidationResult::new();

        if !is_valid_email(data.email.trim()) {
            result.add_error("email", "Invalid email address");
        }

        if data.password.is_empty() {
            result.add_error("password", "Password is required");
        }

        if data.password.len() > 72 {
            result.add_error("password", "Password must not exceed 72 bytes");
        }

        result
    }
}
