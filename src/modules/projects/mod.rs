pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use controllers::{configure, internal_controller};
pub use models::{Project, ProjectAggregate, ProjectStatus, TimelineEntry, TimelineEventType};
pub use repositories::{InMemoryProjectStore, MySqlProjectStore, ProjectStore, UnitOfWork};
pub use services::ProjectService;
