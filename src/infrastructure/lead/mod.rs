//! Lead store implementations

mod storage_repository;

pub use storage_repository::StorageLeadRepository;
