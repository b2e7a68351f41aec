pub mod api;
pub mod error;
pub mod health;
#[cfg(test)]
pub(crate) mod test_support;

pub use api::report_routes;
pub use error::ApiError;
