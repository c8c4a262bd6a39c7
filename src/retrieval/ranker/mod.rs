#[cfg(test)]
mod tests;

use std::cmp::Ordering;
use tracing::{debug, warn};

use crate::config::RetrievalConfig;
use crate::corpus::Page;

/// A page paired with its relevance to one query.
///
/// Borrows the page, so ranking never copies or mutates corpus content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedPage<'a> {
    pub page: &'a Page,
    pub score: f32,
}

impl RankedPage<'_> {
    #[inline]
    pub fn page_number(&self) -> u32 {
        self.page.page_number()
    }

    #[inline]
    pub fn content(&self) -> &str {
        self.page.content()
    }
}

/// Similarity ranker with a minimum-content rule for boilerplate pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ranker {
    min_content_chars: usize,
}

impl Ranker {
    #[inline]
    pub fn new(min_content_chars: usize) -> Self {
        Self { min_content_chars }
    }

    #[inline]
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self::new(config.min_content_chars)
    }

    #[inline]
    pub fn min_content_chars(&self) -> usize {
        self.min_content_chars
    }

    /// Score a single page against the query.
    ///
    /// Pages whose trimmed content has fewer than `min_content_chars`
    /// characters score 0 whatever their embedding says.
    #[inline]
    pub fn score(&self, query: &[f32], page: &Page) -> f32 {
        if page.content().trim().chars().count() < self.min_content_chars {
            return 0.0;
        }
        cosine_similarity(query, page.embedding())
    }

    /// Return at most `top_k` pages ordered by descending score.
    ///
    /// The sort is stable: equal scores keep their corpus order, so repeated
    /// identical queries return identical rankings. A corpus made only of
    /// short pages still yields `top_k` entries, all scored 0.
    #[inline]
    pub fn rank<'a>(&self, query: &[f32], pages: &'a [Page], top_k: usize) -> Vec<RankedPage<'a>> {
        let mut ranked: Vec<RankedPage<'a>> = pages
            .iter()
            .map(|page| RankedPage {
                page,
                score: self.score(query, page),
            })
            .collect();

        // cosine_similarity never returns NaN, so the order is total
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        ranked.truncate(top_k);

        if !ranked.is_empty() && ranked.iter().all(|hit| hit.score == 0.0) {
            warn!(
                "All {} ranked pages scored 0; results carry no relevance signal",
                ranked.len()
            );
        }

        debug!(
            "Ranked {} pages, kept {} (best score {:?})",
            pages.len(),
            ranked.len(),
            ranked.first().map(|hit| hit.score)
        );

        ranked
    }
}

/// `dot(a, b) / (|a| * |b|)`, in `[-1, 1]`.
///
/// Accumulates in `f64`, so finite `f32` components never overflow the
/// sums. Zero-length vectors, zero vectors, vectors of different length and
/// any non-finite input score 0.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot_product, norm_a, norm_b) = a.iter().zip(b.iter()).fold(
        (0.0_f64, 0.0_f64, 0.0_f64),
        |(dot, na, nb), (&x, &y)| {
            let (x, y) = (f64::from(x), f64::from(y));
            (dot + x * y, na + x * x, nb + y * y)
        },
    );

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator > 0.0 && denominator.is_finite() && dot_product.is_finite() {
        (dot_product / denominator).clamp(-1.0, 1.0) as f32
    } else {
        0.0
    }
}
