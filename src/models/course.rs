use serde::{Deserialize, Serialize};

/// Catalog course as delivered by the search index. Read-only input; the
/// backend never mutates catalog data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "objectID")]
    pub id: String,
    pub number: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub units_min: String,
    pub units_max: String,
    #[serde(default)]
    pub grading: String,
    #[serde(default)]
    pub gers: Vec<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// One scheduled offering of a course within a term.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub term: String,
    pub term_id: String,
    pub class_id: String,
    #[serde(default)]
    pub section_number: String,
    pub component: String,
    #[serde(default)]
    pub schedules: Vec<Schedule>,
}

/// Meeting pattern: days-of-week, time-of-day in seconds, room, staff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(default)]
    pub days: Option<String>,
    #[serde(default)]
    pub start_timestamp: i64,
    #[serde(default)]
    pub end_timestamp: i64,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub instructors: Vec<Instructor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instructor {
    pub name: String,
    pub username: String,
}
