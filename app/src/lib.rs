//! FILENAME: app/src/lib.rs
//! Command line front end: picks the fields, runs the pivot, prints it.

pub mod cli;
pub mod error;
pub mod logging;
pub mod render;

pub use error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
