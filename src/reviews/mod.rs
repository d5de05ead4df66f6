pub mod handlers;
pub mod models;
pub mod rating;
pub mod repository;
pub mod service;

pub use models::*;
pub use repository::*;
pub use service::*;

#[cfg(test)]
mod tests;
