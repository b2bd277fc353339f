pub mod completions;
pub mod get;
pub mod list;
pub mod remove;
pub mod set;
