pub mod mailer;
pub mod models;
pub mod repository;
pub mod templates;
pub mod worker;

pub use mailer::*;
pub use models::*;
pub use repository::*;
pub use worker::*;

#[cfg(test)]
mod tests;
