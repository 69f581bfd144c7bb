pub mod common;
pub mod completions;
pub mod list;
pub mod push;
pub mod sync;
