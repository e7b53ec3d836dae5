pub mod core_auth;

pub use core_auth::{AuthPredicate, FixedCredentials};
