pub mod dedupe;
pub mod template;
