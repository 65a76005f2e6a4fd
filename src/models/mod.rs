pub mod chapters;
pub mod job;
pub mod project;
