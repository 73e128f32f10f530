// Interception layer.
// Decrypts the backend host's traffic and feeds matching responses to the extractors.

pub mod ca;
pub mod handler;
pub mod routes;

pub use handler::{InterceptHandler, InterceptTarget};
pub use routes::{Route, RouteTable};
