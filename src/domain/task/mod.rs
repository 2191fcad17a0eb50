//! Follow-up task domain module (task/reminder store collaborator)

mod entity;
mod repository;

pub use entity::*;
pub use repository::*;
