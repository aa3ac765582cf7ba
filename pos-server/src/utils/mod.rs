pub mod error;
pub mod logger;

pub use error::{AppError, AppResponse, ok};
