pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod news;
pub mod pipeline;
pub mod script;
pub mod service;
pub mod stage;
pub mod video;
pub mod voice;

pub use error::{ReelError, Result};
