//! Document page numbers to PDF render indices.
//!
//! Sustainability statements usually sit inside a larger annual report, so
//! the statement's page 1 is some later page of the PDF. The offset is a
//! constant per document.


use super::RankedPage;

/// `document_page_number - document_start_page + 1`.
///
/// `document_start_page` must be at least 1. The result is not checked
/// against the PDF's page count and may be zero or negative; see
/// [`clamp_to_pdf`].
#[inline]
pub fn to_render_index(document_page_number: u32, document_start_page: u32) -> i64 {
    i64::from(document_page_number) - i64::from(document_start_page) + 1
}

/// Render indices for ranked pages, best match first
#[inline]
pub fn render_indices(ranked: &[RankedPage<'_>], document_start_page: u32) -> Vec<i64> {
    ranked
        .iter()
        .map(|hit| to_render_index(hit.page_number(), document_start_page))
        .collect()
}

/// Keep an index only if it names a page of a PDF with `pdf_page_count` pages
#[inline]
pub fn clamp_to_pdf(render_index: i64, pdf_page_count: u32) -> Option<u32> {
    u32::try_from(render_index)
        .ok()
        .filter(|index| (1..=pdf_page_count).contains(index))
}
