use super::models::CalendarEventRequest;
use crate::common::{ValidationResult, Validator};
use crate::services::google::EventDateTime;

fn has_time(value: &EventDateTime) -> bool {
    let filled = |v: &Option<String>| v.as_deref().map_or(false, |s| !s.trim().is_empty());
    filled(&value.date_time) || filled(&value.date)
}

impl Validator<CalendarEventRequest> for CalendarEventRequest {
    fn validate(&self, data: &CalendarEventRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.summary.trim().is_empty() {
            result.add_error("summary", "Summary is required");
        }

        if !has_time(&data.start) {
            result.add_error("start", "Start requires dateTime or date");
        }

        if !has_time(&data.end) {
            result.add_error("end", "End requires dateTime or date");
        }

        result
    }
}
