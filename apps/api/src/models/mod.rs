pub mod employee;
pub mod project;

pub use employee::{AvailabilityClass, Employee};
pub use project::Project;
