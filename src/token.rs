//! Token domain: claims, the HS256 wire codec, persisted records, and the issuing service.

pub mod claims;
pub mod record;
pub mod secret;
pub mod service;

mod jwt;

pub use claims::*;
pub use record::*;
pub use secret::*;
pub use service::*;
