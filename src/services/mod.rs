pub mod client;
pub mod dispatcher;
pub mod file_swap;
pub mod resolver;
pub mod topology;

pub use client::*;
pub use dispatcher::*;
pub use file_swap::*;
pub use resolver::*;
pub use topology::*;
