//! Report rendering.

pub mod chart;
pub mod generator;

pub use chart::render_chart;
pub use generator::{generate_json_report, generate_markdown_report, generate_text_report};
