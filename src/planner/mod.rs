//! Planner state store.
//!
//! A reducer over the user's multi-year plan: ordered course lists per term
//! bucket plus a staging bucket for unassigned courses, the starred-class
//! overlay, and display settings. UI layers drive it through
//! [`PlannerCommand`]; every mutation applies synchronously and returns the
//! field-level deltas ([`ProfileMutation`]) to push to the profile endpoint
//! fire-and-forget. Local state stays authoritative for the session; a
//! failed persistence call is never rolled back.

mod catalog;

pub use catalog::{
    CatalogEntry, CourseCatalog, CourseSummary, TermClass, class_key, merge_term_classes,
    term_units,
};

use std::collections::BTreeMap;

use crate::models::profile::{
    DEFAULT_PLANNER_START_YEAR, PlannerSettings, PlannerSettingsPatch, ProfileMutation,
    STAGING_BUCKET, UserProfile,
};

/// A planner grouping key: a real term id or the staging sentinel.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Bucket {
    Staging,
    Term(String),
}

impl Bucket {
    pub fn from_key(key: &str) -> Self {
        if key == STAGING_BUCKET {
            Bucket::Staging
        } else {
            Bucket::Term(key.to_string())
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Bucket::Staging => STAGING_BUCKET,
            Bucket::Term(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlannerCommand {
    /// Append to a bucket; no-op if already present there. Callers moving a
    /// course between buckets must remove it from the source first (or use
    /// [`PlannerCommand::MoveCourse`]); cross-bucket duplicates are not
    /// checked here.
    AddCourse { bucket: Bucket, course_id: String },
    RemoveCourse { bucket: Bucket, course_id: String },
    /// Remove from `source` by value match (`source_index` is the gesture's
    /// claim and is not trusted) and insert at `dest_index` (clamped) in
    /// `dest`, as one state transition.
    MoveCourse {
        source: Bucket,
        source_index: usize,
        dest: Bucket,
        dest_index: usize,
        course_id: String,
    },
    SetSettings(PlannerSettingsPatch),
    SetStartYear(i64),
    /// Pin a `"<number>|<classId>"` key to the current-year schedule.
    Star(String),
    Unstar(String),
}

/// A course entry resolved for one bucket. `starred` marks overlay entries
/// synthesized from the starred set rather than the persisted planner list.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCourse {
    pub course_id: String,
    pub starred: bool,
}

#[derive(Debug, Clone)]
pub struct PlannerState {
    buckets: BTreeMap<String, Vec<String>>,
    starred: Vec<String>,
    settings: PlannerSettings,
    start_year: i64,
}

impl Default for PlannerState {
    fn default() -> Self {
        Self {
            buckets: BTreeMap::new(),
            starred: Vec::new(),
            settings: PlannerSettings::default(),
            start_year: DEFAULT_PLANNER_START_YEAR,
        }
    }
}

impl PlannerState {
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            buckets: profile.planner.clone(),
            starred: profile.classes.clone(),
            settings: profile.planner_settings,
            start_year: profile.planner_start_year,
        }
    }

    pub fn settings(&self) -> PlannerSettings {
        self.settings
    }

    pub fn start_year(&self) -> i64 {
        self.start_year
    }

    pub fn starred(&self) -> &[String] {
        &self.starred
    }

    /// The persisted (non-overlay) course list for a bucket.
    pub fn courses_in(&self, bucket: &Bucket) -> &[String] {
        self.buckets
            .get(bucket.key())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Apply a command and return the deltas to persist. Commands that do
    /// not change state return no deltas.
    pub fn apply(&mut self, command: PlannerCommand) -> Vec<ProfileMutation> {
        match command {
            PlannerCommand::AddCourse { bucket, course_id } => {
                let list = self.buckets.entry(bucket.key().to_string()).or_default();
                if list.contains(&course_id) {
                    return Vec::new();
                }
                list.push(course_id);
                vec![self.bucket_delta(&bucket)]
            }
            PlannerCommand::RemoveCourse { bucket, course_id } => {
                let Some(list) = self.buckets.get_mut(bucket.key()) else {
                    return Vec::new();
                };
                let before = list.len();
                list.retain(|c| c != &course_id);
                if list.len() == before {
                    return Vec::new();
                }
                vec![self.bucket_delta(&bucket)]
            }
            PlannerCommand::MoveCourse {
                source,
                source_index: _,
                dest,
                dest_index,
                course_id,
            } => self.move_course(&source, &dest, dest_index, course_id),
            PlannerCommand::SetSettings(patch) => {
                self.settings = self.settings.merged(patch);
                vec![ProfileMutation::SetPlannerSettings(patch)]
            }
            PlannerCommand::SetStartYear(year) => {
                self.start_year = year;
                vec![ProfileMutation::SetPlannerStartYear(year)]
            }
            PlannerCommand::Star(key) => {
                if self.starred.contains(&key) {
                    return Vec::new();
                }
                self.starred.push(key.clone());
                vec![ProfileMutation::AddClass(key)]
            }
            PlannerCommand::Unstar(key) => {
                let before = self.starred.len();
                self.starred.retain(|k| k != &key);
                if self.starred.len() == before {
                    return Vec::new();
                }
                vec![ProfileMutation::RemoveClass(key)]
            }
        }
    }

    fn move_course(
        &mut self,
        source: &Bucket,
        dest: &Bucket,
        dest_index: usize,
        course_id: String,
    ) -> Vec<ProfileMutation> {
        let mut changed_source = false;
        if let Some(list) = self.buckets.get_mut(source.key()) {
            let before = list.len();
            list.retain(|c| c != &course_id);
            changed_source = list.len() != before;
        }

        let dest_list = self.buckets.entry(dest.key().to_string()).or_default();
        let mut changed_dest = false;
        if !dest_list.contains(&course_id) {
            let index = dest_index.min(dest_list.len());
            dest_list.insert(index, course_id);
            changed_dest = true;
        }

        let mut deltas = Vec::new();
        if changed_source || (changed_dest && source == dest) {
            deltas.push(self.bucket_delta(source));
        }
        if changed_dest && source != dest {
            deltas.push(self.bucket_delta(dest));
        }
        deltas
    }

    fn bucket_delta(&self, bucket: &Bucket) -> ProfileMutation {
        ProfileMutation::SetPlannerBucket {
            bucket: bucket.key().to_string(),
            courses: self.courses_in(bucket).to_vec(),
        }
    }

    /// Resolve a bucket's course list for display. With `show_starred` on,
    /// term buckets additionally pick up overlay entries for starred classes
    /// in that term whose course is not already planned there, so a starred
    /// class stays visible even if never explicitly planned.
    pub fn courses_for_bucket(
        &self,
        bucket: &Bucket,
        catalog: &CourseCatalog,
        settings: &PlannerSettings,
    ) -> Vec<PlannedCourse> {
        let mut out: Vec<PlannedCourse> = self
            .courses_in(bucket)
            .iter()
            .map(|id| PlannedCourse {
                course_id: id.clone(),
                starred: false,
            })
            .collect();

        if settings.show_starred {
            if let Bucket::Term(term_id) = bucket {
                for key in &self.starred {
                    let Some(entry) = catalog.get(key) else { continue };
                    if entry.term_id != *term_id {
                        continue;
                    }
                    if out.iter().any(|c| c.course_id == entry.course_id) {
                        continue;
                    }
                    out.push(PlannedCourse {
                        course_id: entry.course_id.clone(),
                        starred: true,
                    });
                }
            }
        }

        out
    }

    /// Unit total for a bucket, counting each course once.
    pub fn bucket_units(
        &self,
        bucket: &Bucket,
        catalog: &CourseCatalog,
        settings: &PlannerSettings,
    ) -> f64 {
        self.courses_for_bucket(bucket, catalog, settings)
            .iter()
            .map(|c| catalog.units_max(&c.course_id))
            .sum()
    }

    /// The starred classes for one term, merged by catalog number.
    pub fn starred_for_term(&self, term_id: &str, catalog: &CourseCatalog) -> Vec<TermClass> {
        merge_term_classes(&self.starred, catalog, term_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::course::{Course, Section};

    fn course(id: &str, number: &str, units_max: &str, sections: Vec<Section>) -> Course {
        Course {
            id: id.to_string(),
            number: number.to_string(),
            title: format!("{number} title"),
            description: String::new(),
            units_min: "1".to_string(),
            units_max: units_max.to_string(),
            grading: "Letter".to_string(),
            gers: Vec::new(),
            sections,
        }
    }

    fn section(term_id: &str, class_id: &str, component: &str) -> Section {
        Section {
            term: "2019-2020 Autumn".to_string(),
            term_id: term_id.to_string(),
            class_id: class_id.to_string(),
            section_number: "01".to_string(),
            component: component.to_string(),
            schedules: Vec::new(),
        }
    }

    fn test_catalog() -> CourseCatalog {
        let mut catalog = CourseCatalog::default();
        catalog.populate(&[
            course(
                "c-alg",
                "CS 161",
                "5",
                vec![section("1202", "8001", "LEC"), section("1202", "8002", "DIS")],
            ),
            course("c-intro", "CS 106", "5", vec![section("1202", "9001", "LEC")]),
            course("c-hist", "HIST 10", "4", vec![section("1204", "7001", "LEC")]),
        ]);
        catalog
    }

    fn bucket_names(state: &PlannerState, course_id: &str) -> Vec<String> {
        let mut found = Vec::new();
        for bucket in [
            Bucket::Staging,
            Bucket::Term("1202".to_string()),
            Bucket::Term("1204".to_string()),
        ] {
            if state.courses_in(&bucket).contains(&course_id.to_string()) {
                found.push(bucket.key().to_string());
            }
        }
        found
    }

    #[test]
    fn course_lives_in_at_most_one_bucket() {
        let mut state = PlannerState::default();
        let staging = Bucket::Staging;
        let autumn = Bucket::Term("1202".to_string());
        let winter = Bucket::Term("1204".to_string());

        state.apply(PlannerCommand::AddCourse {
            bucket: staging.clone(),
            course_id: "c-alg".to_string(),
        });
        assert_eq!(bucket_names(&state, "c-alg"), ["staging"]);

        state.apply(PlannerCommand::MoveCourse {
            source: staging.clone(),
            source_index: 0,
            dest: autumn.clone(),
            dest_index: 0,
            course_id: "c-alg".to_string(),
        });
        assert_eq!(bucket_names(&state, "c-alg"), ["1202"]);

        state.apply(PlannerCommand::MoveCourse {
            source: autumn,
            source_index: 0,
            dest: winter,
            dest_index: 5,
            course_id: "c-alg".to_string(),
        });
        assert_eq!(bucket_names(&state, "c-alg"), ["1204"]);
    }

    #[test]
    fn same_bucket_move_only_permutes() {
        let mut state = PlannerState::default();
        let autumn = Bucket::Term("1202".to_string());
        for id in ["a", "b", "c"] {
            state.apply(PlannerCommand::AddCourse {
                bucket: autumn.clone(),
                course_id: id.to_string(),
            });
        }

        // The reported source index is stale on purpose; removal matches by
        // value.
        state.apply(PlannerCommand::MoveCourse {
            source: autumn.clone(),
            source_index: 1,
            dest: autumn.clone(),
            dest_index: 0,
            course_id: "c".to_string(),
        });

        assert_eq!(state.courses_in(&autumn), ["c", "a", "b"]);
    }

    #[test]
    fn move_clamps_destination_index() {
        let mut state = PlannerState::default();
        let staging = Bucket::Staging;
        let autumn = Bucket::Term("1202".to_string());
        state.apply(PlannerCommand::AddCourse {
            bucket: staging.clone(),
            course_id: "a".to_string(),
        });

        state.apply(PlannerCommand::MoveCourse {
            source: staging,
            source_index: 0,
            dest: autumn.clone(),
            dest_index: 99,
            course_id: "a".to_string(),
        });
        assert_eq!(state.courses_in(&autumn), ["a"]);
    }

    #[test]
    fn duplicate_add_is_a_silent_noop() {
        let mut state = PlannerState::default();
        let staging = Bucket::Staging;
        let deltas = state.apply(PlannerCommand::AddCourse {
            bucket: staging.clone(),
            course_id: "a".to_string(),
        });
        assert_eq!(deltas.len(), 1);

        let deltas = state.apply(PlannerCommand::AddCourse {
            bucket: staging.clone(),
            course_id: "a".to_string(),
        });
        assert!(deltas.is_empty());
        assert_eq!(state.courses_in(&staging), ["a"]);
    }

    #[test]
    fn move_emits_one_delta_per_changed_bucket() {
        let mut state = PlannerState::default();
        let staging = Bucket::Staging;
        let autumn = Bucket::Term("1202".to_string());
        state.apply(PlannerCommand::AddCourse {
            bucket: staging.clone(),
            course_id: "a".to_string(),
        });

        let deltas = state.apply(PlannerCommand::MoveCourse {
            source: staging,
            source_index: 0,
            dest: autumn,
            dest_index: 0,
            course_id: "a".to_string(),
        });

        assert_eq!(
            deltas,
            vec![
                ProfileMutation::SetPlannerBucket {
                    bucket: "staging".to_string(),
                    courses: Vec::new(),
                },
                ProfileMutation::SetPlannerBucket {
                    bucket: "1202".to_string(),
                    courses: vec!["a".to_string()],
                },
            ]
        );
    }

    #[test]
    fn starred_overlay_fills_unplanned_terms() {
        let catalog = test_catalog();
        let mut state = PlannerState::default();
        state.apply(PlannerCommand::Star("CS 161|8001".to_string()));

        let autumn = Bucket::Term("1202".to_string());
        let courses = state.courses_for_bucket(&autumn, &catalog, &state.settings());
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].course_id, "c-alg");
        assert!(courses[0].starred);

        // Overlay is scoped to the class's own term.
        let winter = Bucket::Term("1204".to_string());
        assert!(state.courses_for_bucket(&winter, &catalog, &state.settings()).is_empty());
    }

    #[test]
    fn overlay_skips_courses_already_planned() {
        let catalog = test_catalog();
        let mut state = PlannerState::default();
        let autumn = Bucket::Term("1202".to_string());
        state.apply(PlannerCommand::AddCourse {
            bucket: autumn.clone(),
            course_id: "c-alg".to_string(),
        });
        state.apply(PlannerCommand::Star("CS 161|8001".to_string()));

        let courses = state.courses_for_bucket(&autumn, &catalog, &state.settings());
        assert_eq!(courses.len(), 1);
        assert!(!courses[0].starred);
    }

    #[test]
    fn overlay_respects_show_starred_setting() {
        let catalog = test_catalog();
        let mut state = PlannerState::default();
        state.apply(PlannerCommand::Star("CS 161|8001".to_string()));
        state.apply(PlannerCommand::SetSettings(PlannerSettingsPatch {
            show_starred: Some(false),
            show_titles: None,
        }));

        let autumn = Bucket::Term("1202".to_string());
        let courses = state.courses_for_bucket(&autumn, &catalog, &state.settings());
        assert!(courses.is_empty());
    }

    #[test]
    fn lecture_and_discussion_count_units_once() {
        let catalog = test_catalog();
        let mut state = PlannerState::default();
        state.apply(PlannerCommand::Star("CS 161|8001".to_string()));
        state.apply(PlannerCommand::Star("CS 161|8002".to_string()));
        state.apply(PlannerCommand::Star("CS 106|9001".to_string()));

        let autumn = Bucket::Term("1202".to_string());
        let units = state.bucket_units(&autumn, &catalog, &state.settings());
        assert_eq!(units, 10.0);

        let classes = state.starred_for_term("1202", &catalog);
        assert_eq!(classes.len(), 2);
        let alg = classes.iter().find(|c| c.number == "CS 161").unwrap();
        assert_eq!(alg.components, ["LEC", "DIS"]);
        assert_eq!(alg.class_ids, ["8001", "8002"]);
        assert_eq!(term_units(&classes), 10.0);
    }

    #[test]
    fn state_loads_from_a_persisted_profile() {
        let mut planner = BTreeMap::new();
        planner.insert("staging".to_string(), vec!["c-alg".to_string()]);
        planner.insert("1204".to_string(), vec!["c-hist".to_string()]);
        let profile = UserProfile {
            email: "jo@example.edu".to_string(),
            name: "jo".to_string(),
            last_login: None,
            first_login: None,
            classes: vec!["CS 161|8001".to_string()],
            planner_start_year: 2022,
            planner_settings: PlannerSettings::default(),
            planner,
        };

        let state = PlannerState::from_profile(&profile);
        assert_eq!(state.start_year(), 2022);
        assert_eq!(state.courses_in(&Bucket::from_key("staging")), ["c-alg"]);
        assert_eq!(state.courses_in(&Bucket::from_key("1204")), ["c-hist"]);
        assert_eq!(state.starred(), ["CS 161|8001"]);
    }

    #[test]
    fn star_toggle_emits_class_deltas() {
        let mut state = PlannerState::default();
        let deltas = state.apply(PlannerCommand::Star("CS 161|8001".to_string()));
        assert_eq!(deltas, vec![ProfileMutation::AddClass("CS 161|8001".to_string())]);

        // Starring twice changes nothing.
        assert!(state.apply(PlannerCommand::Star("CS 161|8001".to_string())).is_empty());

        let deltas = state.apply(PlannerCommand::Unstar("CS 161|8001".to_string()));
        assert_eq!(deltas, vec![ProfileMutation::RemoveClass("CS 161|8001".to_string())]);
        assert!(state.starred().is_empty());
    }
}
