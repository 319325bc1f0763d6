pub mod filler;
pub mod geolocation;
pub mod navigator;
pub mod report;
pub mod session;
