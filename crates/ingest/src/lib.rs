pub mod error;
pub mod http;
pub mod normalize;

pub use http::router;
