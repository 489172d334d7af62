//! Report output: terminal summary, report files, and the Excel workbook.

pub mod console;
pub mod export;
pub mod generator;

pub use console::render_summary;
pub use export::{default_export_path, export_workbook};
pub use generator::{generate_json_report, generate_markdown_report};
