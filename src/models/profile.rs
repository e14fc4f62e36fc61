use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::AppError;

/// Bucket key for courses a user has planned but not assigned to a term.
pub const STAGING_BUCKET: &str = "staging";

pub const DEFAULT_PLANNER_START_YEAR: i64 = 2021;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlannerSettings {
    pub show_starred: bool,
    pub show_titles: bool,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            show_starred: true,
            show_titles: true,
        }
    }
}

impl PlannerSettings {
    /// Shallow merge: fields present in the patch win.
    pub fn merged(self, patch: PlannerSettingsPatch) -> Self {
        Self {
            show_starred: patch.show_starred.unwrap_or(self.show_starred),
            show_titles: patch.show_titles.unwrap_or(self.show_titles),
        }
    }
}

/// Partial settings update; only the fields the caller set are applied.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlannerSettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_starred: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_titles: Option<bool>,
}

impl PlannerSettingsPatch {
    pub fn merged(self, other: PlannerSettingsPatch) -> Self {
        Self {
            show_starred: other.show_starred.or(self.show_starred),
            show_titles: other.show_titles.or(self.show_titles),
        }
    }
}

/// Authoritative per-user record: starred classes, planner buckets, display
/// settings. The client holds an optimistically-updated copy and pushes
/// field-level deltas; last write per field wins.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub email: String,
    pub name: String,
    pub last_login: Option<String>,
    pub first_login: Option<String>,
    pub classes: Vec<String>,
    pub planner_start_year: i64,
    pub planner_settings: PlannerSettings,
    pub planner: BTreeMap<String, Vec<String>>,
}

/// Wire shape of a profile delta: `{field, op, value}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileUpdateRequest {
    pub field: String,
    pub op: String,
    pub value: Value,
}

/// The closed set of permitted profile mutations. Anything the wire format
/// can express outside this enum is rejected at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileMutation {
    SetClasses(Vec<String>),
    AddClass(String),
    RemoveClass(String),
    SetPlannerStartYear(i64),
    SetPlannerSettings(PlannerSettingsPatch),
    SetPlannerBucket { bucket: String, courses: Vec<String> },
}

impl ProfileMutation {
    pub fn from_request(req: ProfileUpdateRequest) -> Result<Self, AppError> {
        let ProfileUpdateRequest { field, op, value } = req;
        match (field.as_str(), op.as_str()) {
            ("classes", "$set") => Ok(Self::SetClasses(decode(&field, value)?)),
            ("classes", "$addToSet") => Ok(Self::AddClass(decode(&field, value)?)),
            ("classes", "$pull") => Ok(Self::RemoveClass(decode(&field, value)?)),
            ("planner_start_year", "$set") => {
                Ok(Self::SetPlannerStartYear(decode(&field, value)?))
            }
            ("planner_settings", "$set") => Ok(Self::SetPlannerSettings(decode(&field, value)?)),
            (f, "$set") if f.starts_with("planner.") && f.len() > "planner.".len() => {
                Ok(Self::SetPlannerBucket {
                    bucket: f["planner.".len()..].to_string(),
                    courses: decode(f, value)?,
                })
            }
            ("classes" | "planner_start_year" | "planner_settings", _) => {
                Err(AppError::Validation("Unsupported operation".to_string()))
            }
            (f, _) if f.starts_with("planner.") && f.len() > "planner.".len() => {
                Err(AppError::Validation("Unsupported operation".to_string()))
            }
            _ => Err(AppError::Validation("Unrecognized operation".to_string())),
        }
    }

    /// The `{field, op, value}` description a client sends for this delta.
    pub fn to_request(&self) -> ProfileUpdateRequest {
        let (field, op, value) = match self {
            Self::SetClasses(classes) => ("classes".to_string(), "$set", json!(classes)),
            Self::AddClass(class) => ("classes".to_string(), "$addToSet", json!(class)),
            Self::RemoveClass(class) => ("classes".to_string(), "$pull", json!(class)),
            Self::SetPlannerStartYear(year) => {
                ("planner_start_year".to_string(), "$set", json!(year))
            }
            Self::SetPlannerSettings(patch) => ("planner_settings".to_string(), "$set", json!(patch)),
            Self::SetPlannerBucket { bucket, courses } => {
                (format!("planner.{bucket}"), "$set", json!(courses))
            }
        };
        ProfileUpdateRequest {
            field,
            op: op.to_string(),
            value,
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(field: &str, value: Value) -> Result<T, AppError> {
    serde_json::from_value(value)
        .map_err(|_| AppError::Validation(format!("Invalid value for field {field}")))
}
