pub mod driver;
pub mod error;
pub mod selector;
pub mod session;
pub mod snapshot;
