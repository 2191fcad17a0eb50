//! Infrastructure layer - storage-backed repositories and service implementations

pub mod lead;
pub mod logging;
pub mod messaging;
pub mod services;
pub mod storage;
pub mod task;
pub mod webhook;
pub mod workflow;
