// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// CSV parsing, encoding detection, and content analysis

mod csv_parser;
mod content_analyzer;

pub use csv_parser::CsvParser;
pub use content_analyzer::ContentAnalyzer;
