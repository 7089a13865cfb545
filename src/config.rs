//! Application-level configuration constants.

// Backend endpoint
pub const VALUATE_URL: &str = "/valuate";

// Report area
pub const REPORT_ELEMENT_ID: &str = "valuationReport";
pub const LOADING_MARKUP: &str = r#"<p class="loading-message">Loading data...</p>"#;
pub const EMPTY_REPORT_MARKUP: &str =
    r#"<p class="no-report-message">Fill in the company data and press Valuate.</p>"#;

// PDF export tuning passed to the html2pdf bridge
pub const PDF_MARGIN_MM: u32 = 10;
pub const PDF_CANVAS_SCALE: u32 = 2;
pub const PDF_PAGE_FORMAT: &str = "a4";
pub const PDF_PAGEBREAK_MODE: &str = "avoid-all";
