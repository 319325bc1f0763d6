pub mod error;
pub mod field_model;
pub mod fingerprint;
pub mod normalize;
