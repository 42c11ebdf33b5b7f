//! Identity primitives: typed identifiers, permission paths, and scope sets.

pub mod id;
pub mod permission;
pub mod scope;

pub use id::*;
pub use permission::*;
pub use scope::*;
