pub mod aggregate;
pub mod project;
pub mod timeline;

pub use aggregate::ProjectAggregate;
pub use project::{Project, ProjectStatus};
pub use timeline::{TimelineEntry, TimelineEventType};
