use std::collections::BTreeMap;

use crate::models::course::{Course, Schedule};

/// Composite lookup key for a (course, section) pair, `"<number>|<classId>"`.
/// Starred classes are stored under this key in the profile record.
pub fn class_key(number: &str, class_id: &str) -> String {
    format!("{number}|{class_id}")
}

/// Store-scoped lookup tables the planner resolves course ids and starred
/// keys against. Populated from search hits on session load and cleared on
/// logout; never process-global.
#[derive(Debug, Clone, Default)]
pub struct CourseCatalog {
    entries: BTreeMap<String, CatalogEntry>,
    courses: BTreeMap<String, CourseSummary>,
}

/// The flattened (course, section) attributes planner rendering needs.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub course_id: String,
    pub number: String,
    pub title: String,
    pub term: String,
    pub term_id: String,
    pub class_id: String,
    pub component: String,
    pub units_min: String,
    pub units_max: String,
    pub schedules: Vec<Schedule>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseSummary {
    pub number: String,
    pub title: String,
    pub units_min: String,
    pub units_max: String,
}

impl CourseCatalog {
    pub fn populate(&mut self, courses: &[Course]) {
        for course in courses {
            self.courses.insert(
                course.id.clone(),
                CourseSummary {
                    number: course.number.clone(),
                    title: course.title.clone(),
                    units_min: course.units_min.clone(),
                    units_max: course.units_max.clone(),
                },
            );

            for section in &course.sections {
                let key = class_key(&course.number, &section.class_id);
                self.entries.insert(
                    key,
                    CatalogEntry {
                        course_id: course.id.clone(),
                        number: course.number.clone(),
                        title: course.title.clone(),
                        term: section.term.clone(),
                        term_id: section.term_id.clone(),
                        class_id: section.class_id.clone(),
                        component: section.component.clone(),
                        units_min: course.units_min.clone(),
                        units_max: course.units_max.clone(),
                        schedules: section.schedules.clone(),
                    },
                );
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.courses.clear();
    }

    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        self.entries.get(key)
    }

    pub fn course(&self, course_id: &str) -> Option<&CourseSummary> {
        self.courses.get(course_id)
    }

    /// Maximum units for a planned course; unknown courses contribute zero.
    pub fn units_max(&self, course_id: &str) -> f64 {
        self.courses
            .get(course_id)
            .and_then(|c| c.units_max.parse().ok())
            .unwrap_or(0.0)
    }
}

/// A starred class resolved for one term, with lecture and discussion
/// sections of the same catalog number collapsed into a single entry so
/// unit totals count the course once. `components` records what was merged.
#[derive(Debug, Clone, PartialEq)]
pub struct TermClass {
    pub course_id: String,
    pub number: String,
    pub title: String,
    pub units_max: String,
    pub components: Vec<String>,
    pub class_ids: Vec<String>,
    pub schedules: Vec<Schedule>,
}

pub fn merge_term_classes<'a>(
    keys: impl IntoIterator<Item = &'a String>,
    catalog: &CourseCatalog,
    term_id: &str,
) -> Vec<TermClass> {
    let mut merged: Vec<TermClass> = Vec::new();

    for key in keys {
        let Some(entry) = catalog.get(key) else { continue };
        if entry.term_id != term_id {
            continue;
        }

        match merged.iter_mut().find(|c| c.number == entry.number) {
            Some(class) => {
                if !class.components.contains(&entry.component) {
                    class.components.push(entry.component.clone());
                }
                class.class_ids.push(entry.class_id.clone());
                class.schedules.extend(entry.schedules.iter().cloned());
            }
            None => merged.push(TermClass {
                course_id: entry.course_id.clone(),
                number: entry.number.clone(),
                title: entry.title.clone(),
                units_max: entry.units_max.clone(),
                components: vec![entry.component.clone()],
                class_ids: vec![entry.class_id.clone()],
                schedules: entry.schedules.clone(),
            }),
        }
    }

    merged
}

/// Unit total for a merged term view; each course counts once regardless of
/// how many of its sections are starred.
pub fn term_units(classes: &[TermClass]) -> f64 {
    classes
        .iter()
        .map(|c| c.units_max.parse::<f64>().unwrap_or(0.0))
        .sum()
}
