pub mod appointment;
pub mod doctor;
pub mod error;
pub mod patient;
pub mod queue;

pub use appointment::*;
pub use doctor::*;
pub use error::AppError;
pub use patient::*;
pub use queue::*;
