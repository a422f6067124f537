use super::models::TaskCreate;
use crate::common::{ValidationResult, Validator};

pub const MAX_TITLE_CHARS: usize = 255;
pub const MAX_DESCRIPTION_CHARS: usize = 5000;
const MAX_ADDRESS_CHARS: usize = 500;

impl Validator<TaskCreate> for TaskCreate {
    fn validate(&self, data: &TaskCreate) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.title.trim().is_empty() {
            result.add_error("title", "Title is required");
        }

        if data.title.chars().count() > MAX_TITLE_CHARS {
            result.add_error("title", "Title must not exceed 255 characters");
        }

        if let Some(description) = &data.description {
            if description.chars().count() > MAX_DESCRIPTION_CHARS {
                result.add_error("description", "Description must not exceed 5000 characters");
            }
        }

        if let Some(address) = &data.address {
            if address.chars().count() > MAX_ADDRESS_CHARS {
                result.add_error("address", "Address must not exceed 500 characters");
            }
        }

        if let Some(lat) = data.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                result.add_error("latitude", "Latitude must be between -90 and 90");
            }
        }

        if let Some(lon) = data.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                result.add_error("longitude", "Longitude must be between -180 and 180");
            }
        }

        result
    }
}
