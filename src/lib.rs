//! This crate is the core of a small app with two screens: a to-do list stored in a remote document collection, and today's prayer times at the device location.
//!
//! Every external collaborator is reached through a trait, so that it can be replaced by a fake in tests:
//! * a [`TaskStore`](store::TaskStore) holds the tasks. [`FirestoreStore`](store::FirestoreStore) is the real one, an in-memory `MockStore` comes with the `mock_services` feature
//! * a [`LocationProvider`](location::LocationProvider) tells where the device is
//! * a [`PrayerTimesSource`](prayer::PrayerTimesSource) provides the timings of the day. [`AladhanClient`](prayer::AladhanClient) queries the Aladhan API
//!
//! The [`screen`] module holds the screens, and an [`App`] displays one of them at a time, following a [`Navigator`](navigation::Navigator).

pub mod document;
pub use document::{Document, DocumentId, Snapshot};
mod task;
pub use task::{NewTask, Task, TaskId, TaskPatch};

pub mod store;
pub mod location;
pub mod prayer;

pub mod navigation;
pub mod screen;
pub mod app;
pub use app::App;

pub mod config;
#[cfg(feature = "mock_services")]
pub mod mock_behaviour;
