pub mod format;
pub mod manager;
pub mod repository;

#[cfg(not(target_arch = "wasm32"))]
pub mod file_repository;
