//! Scores corpus pages against a query vector and maps hits to PDF pages.

pub mod mapper;
pub mod ranker;

pub use mapper::{clamp_to_pdf, render_indices, to_render_index};
pub use ranker::{RankedPage, Ranker, cosine_similarity};
