pub mod checkbox;
pub mod context;
pub mod dropdown;
pub mod file;
pub mod job_info;
pub mod label;
pub mod options;
pub mod phone;
pub mod pipeline;
pub mod text;
pub mod textarea;
pub mod vocabulary;
