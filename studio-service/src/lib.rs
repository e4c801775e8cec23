//! studio-service: HTTP gateway in front of Google's Gemini API for image
//! analysis, generation, editing, composition and text chat.
pub mod catalog;
pub mod config;
pub mod dtos;
pub mod handlers;
pub mod housekeeping;
pub mod imaging;
pub mod services;
pub mod startup;
