pub mod identity;

pub use identity::{Caller, Permissions};
