pub mod course;
pub mod profile;
pub mod review;

pub use course::{Course, Instructor, Schedule, Section};
pub use profile::{PlannerSettings, ProfileMutation, ProfileUpdateRequest, UserProfile};
pub use review::{CourseReviews, CourseRollup, RatingGroup, ReviewRecord, TermScore};
