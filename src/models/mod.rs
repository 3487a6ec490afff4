pub mod component;
pub mod config;
pub mod endpoint;
pub mod param;
pub mod request;

pub use component::*;
pub use config::*;
pub use endpoint::*;
pub use param::*;
pub use request::*;
