//! Security module - review permissions and input validation

pub mod permission;
pub mod validator;

pub use permission::*;
pub use validator::*;
