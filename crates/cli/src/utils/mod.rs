pub mod file;

pub use file::{describe_entry, find_xcodeprojs, resolve_dir};
