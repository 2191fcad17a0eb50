//! Lead domain module (record store collaborator)

mod entity;
mod repository;

pub use entity::*;
pub use repository::*;
