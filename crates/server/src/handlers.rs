//! Request handlers.

pub mod admin;
pub mod health;
pub mod meta;
pub mod predict;

pub use admin::*;
pub use health::*;
pub use meta::*;
pub use predict::*;
