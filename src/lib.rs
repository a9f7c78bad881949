pub mod config;
pub mod git;
pub mod github;
pub mod http;
pub mod package;
pub mod runtime;
pub mod sync;
