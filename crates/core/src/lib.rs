pub mod config;
pub mod error;
pub mod goal;
pub mod user;

pub use config::Config;
pub use error::*;
pub use goal::*;
pub use user::*;
