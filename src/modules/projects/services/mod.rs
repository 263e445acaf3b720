pub mod access;
pub mod project_service;

pub use project_service::{
    CreateProjectInput, ListProjectsQuery, ProjectInfo, ProjectService, StatusChangeInput,
    TimelineInput, UpdateProjectInput, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
