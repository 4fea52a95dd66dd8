//! The two screens of the app.
//!
//! A screen owns its own state and side effects. It renders to plain text lines, and reports navigation requests as [`Navigation`](crate::navigation::Navigation) values

pub mod prayer_times;
pub mod task_list;

pub use prayer_times::{PrayerTimesError, PrayerTimesScreen, PrayerTimesState};
pub use task_list::TaskListScreen;
