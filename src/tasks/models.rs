use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub deadline: Option<NaiveDateTime>, // naive UTC
    pub priority: Priority,
    pub completed: bool,
    pub all_day: bool,
    pub google_event_id: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Accepts RFC 3339 (converted to UTC), naive `YYYY-MM-DD[T ]HH:MM[:SS]` or a bare date.
/// Empty strings and `null` clear the deadline.
fn deserialize_deadline<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_deadline(value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid deadline: {}", value))),
    }
}

pub fn parse_deadline(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }

    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Body of `POST /tasks` and `PUT /tasks/:id`
#[derive(Debug, Deserialize)]
pub struct TaskCreate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_deadline")]
    pub deadline: Option<NaiveDateTime>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub all_day: Option<bool>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskCompletedUpdate {
    pub completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct TaskEventLink {
    pub google_event_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Priority,
    Deadline,
    Insertion,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Query string shared by `GET /tasks` and the export routes
#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
    pub completed: Option<bool>,
}

const PRIORITY_RANK: &str =
    "CASE priority WHEN 'High' THEN 1 WHEN 'Medium' THEN 2 WHEN 'Low' THEN 3 ELSE 4 END";

impl ListTasksQuery {
    /// ORDER BY clause; missing deadlines always sort last
    pub fn order_by_clause(&self) -> String {
        let order = self.sort_order.unwrap_or_default();
        match (self.sort_by.unwrap_or(SortBy::Insertion), order) {
            (SortBy::Priority, SortOrder::Asc) => format!(
                "{} ASC, deadline IS NULL, deadline ASC, id ASC",
                PRIORITY_RANK
            ),
            (SortBy::Priority, SortOrder::Desc) => format!(
                "{} DESC, deadline IS NULL, deadline DESC, id ASC",
                PRIORITY_RANK
            ),
            (SortBy::Deadline, SortOrder::Asc) => {
                "deadline IS NULL, deadline ASC, id ASC".to_string()
            }
            (SortBy::Deadline, SortOrder::Desc) => {
                "deadline IS NULL, deadline DESC, id ASC".to_string()
            }
            (SortBy::Insertion, SortOrder::Asc) => "id ASC".to_string(),
            (SortBy::Insertion, SortOrder::Desc) => "id DESC".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub detail: String,
}
