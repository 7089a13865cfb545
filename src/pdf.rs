//! JavaScript interop for PDF export.
//! Provides Rust bindings to the html2pdf wrapper defined in pdf_helpers.js.

use crate::config;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(module = "/pdf_helpers.js")]
extern "C" {
    #[wasm_bindgen(js_name = exportElementToPdf)]
    fn export_element_to_pdf(
        element_id: &str,
        file_name: &str,
        margin_mm: u32,
        canvas_scale: u32,
        page_format: &str,
        pagebreak_mode: &str,
    );
}

/// Renders the report area into a downloaded PDF with the given file name.
pub fn export_report(file_name: &str) {
    export_element_to_pdf(
        config::REPORT_ELEMENT_ID,
        file_name,
        config::PDF_MARGIN_MM,
        config::PDF_CANVAS_SCALE,
        config::PDF_PAGE_FORMAT,
        config::PDF_PAGEBREAK_MODE,
    );
}
