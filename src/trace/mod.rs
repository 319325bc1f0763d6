pub mod artifact;
pub mod event;
pub mod logger;
pub mod subscriber;
