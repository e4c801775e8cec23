pub mod image_fetcher;
pub mod image_store;
pub mod metrics;
pub mod prompts;
pub mod providers;
pub mod studio;

pub use image_store::ImageStore;
pub use studio::Studio;
