pub mod memory;
pub mod project_dir;

#[cfg(target_arch = "wasm32")]
pub mod local_storage;

// Re-exports
pub use memory::MemoryStorage;
pub use project_dir::LocalFs;
