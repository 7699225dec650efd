pub mod dir_cache;
pub mod filter;
pub mod tree;
pub mod watcher;
