pub mod content_type;
pub mod error;
pub mod path_template;

pub use error::*;
