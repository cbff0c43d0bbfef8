// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    RunOverrides, apply_overrides, load_urls_from_file, load_urls_from_source, parse_choice,
    parse_url_line, write_default_config,
};

// Re-export sweep functionality from clicksweep-core
pub use clicksweep_core::crawl::{SweepOptions, SweepResult, execute_sweep};
