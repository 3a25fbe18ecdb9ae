pub mod backup;
pub mod catalog;
pub mod config;
pub mod conflict;
pub mod detector;
pub mod error;
pub mod frontmatter;
pub mod io;
pub mod keywords;
pub mod paths;
pub mod resolve;
pub mod scanner;
pub mod standard;
pub mod validate;

pub use error::{MarrError, Result};
