use super::*;

const THRESHOLD: usize = 500;

fn page_with_len(page_number: u32, content_len: usize, embedding: Vec<f32>) -> Page {
    Page::new("doc", page_number, "x".repeat(content_len), embedding).expect("page should be valid")
}

fn page_numbers(ranked: &[RankedPage<'_>]) -> Vec<u32> {
    ranked.iter().map(RankedPage::page_number).collect()
}

#[test]
fn cosine_similarity_basics() {
    assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    assert!((cosine_similarity(&[3.0, 4.0], &[6.0, 8.0]) - 1.0).abs() < 1e-6);

    // Magnitude does not matter
    let a = cosine_similarity(&[1.0, 2.0, 3.0], &[2.0, 1.0, 0.5]);
    let b = cosine_similarity(&[10.0, 20.0, 30.0], &[2.0, 1.0, 0.5]);
    assert!((a - b).abs() < 1e-6);
}

#[test]
fn cosine_similarity_degenerate_inputs() {
    assert_eq!(cosine_similarity(&[], &[]), 0.0);
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
}

#[test]
fn cosine_similarity_is_bounded() {
    let vectors: [&[f32]; 4] = [
        &[0.3, -0.7, 0.2],
        &[-0.9, 0.1, 0.4],
        &[1e-3, 5.0, -2.5],
        &[0.577, 0.577, 0.577],
    ];
    for a in vectors {
        for b in vectors {
            let score = cosine_similarity(a, b);
            assert!((-1.0..=1.0).contains(&score), "{score} out of range");
        }
    }
}

#[test]
fn short_pages_score_zero() {
    let ranker = Ranker::new(THRESHOLD);
    let query = [1.0, 0.0];

    let short = page_with_len(1, 499, vec![1.0, 0.0]);
    assert_eq!(ranker.score(&query, &short), 0.0);

    let long = page_with_len(2, 500, vec![1.0, 0.0]);
    assert!((ranker.score(&query, &long) - 1.0).abs() < 1e-6);
}

#[test]
fn length_rule_uses_trimmed_characters() {
    let ranker = Ranker::new(THRESHOLD);
    let query = [1.0, 0.0];

    let padded = Page::new(
        "doc",
        1,
        format!("   {}\n\n\t", "y".repeat(450)),
        vec![1.0, 0.0],
    )
    .expect("valid page");
    assert_eq!(ranker.score(&query, &padded), 0.0);

    // 500 two-byte characters count as 500, not 1000
    let multibyte = Page::new("doc", 2, "ä".repeat(500), vec![1.0, 0.0]).expect("valid page");
    assert!(ranker.score(&query, &multibyte) > 0.99);

    let too_few = Page::new("doc", 3, "ä".repeat(300), vec![1.0, 0.0]).expect("valid page");
    assert_eq!(ranker.score(&query, &too_few), 0.0);
}

#[test]
fn score_matches_cosine_for_long_pages() {
    let ranker = Ranker::new(THRESHOLD);
    let query = [0.2, 0.9, -0.1];
    let page = page_with_len(1, 800, vec![0.5, 0.4, 0.3]);

    let expected = cosine_similarity(&query, page.embedding());
    assert_eq!(ranker.score(&query, &page), expected);
}

#[test]
fn three_page_scenario() {
    let pages = vec![
        page_with_len(1, 10, vec![1.0, 0.0]),
        page_with_len(2, 600, vec![1.0, 0.0]),
        page_with_len(3, 800, vec![0.0, 1.0]),
    ];
    let ranker = Ranker::new(THRESHOLD);

    let ranked = ranker.rank(&[1.0, 0.0], &pages, 2);

    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].page_number(), 2);
    assert!((ranked[0].score - 1.0).abs() < 1e-6);
    assert_eq!(ranked[1].score, 0.0);

    // Page 1 and page 3 tie at 0; corpus order decides
    assert_eq!(page_numbers(&ranked), vec![2, 1]);

    let all = ranker.rank(&[1.0, 0.0], &pages, 3);
    assert_eq!(page_numbers(&all), vec![2, 1, 3]);
}

#[test]
fn ranking_is_sorted_and_stable() {
    let pages = vec![
        page_with_len(1, 600, vec![0.0, 1.0]),
        page_with_len(2, 600, vec![1.0, 1.0]),
        page_with_len(3, 600, vec![1.0, 0.0]),
        page_with_len(4, 600, vec![1.0, 1.0]),
        page_with_len(5, 600, vec![1.0, 0.0]),
    ];
    let ranker = Ranker::new(THRESHOLD);

    let ranked = ranker.rank(&[1.0, 0.0], &pages, 10);

    assert!(ranked.windows(2).all(|pair| pair[0].score >= pair[1].score));
    assert_eq!(page_numbers(&ranked), vec![3, 5, 2, 4, 1]);

    let again = ranker.rank(&[1.0, 0.0], &pages, 10);
    assert_eq!(page_numbers(&ranked), page_numbers(&again));
}

#[test]
fn empty_corpus_yields_empty_ranking() {
    let ranker = Ranker::new(THRESHOLD);
    for top_k in [0, 1, 5] {
        assert!(ranker.rank(&[1.0, 0.0], &[], top_k).is_empty());
    }
}

#[test]
fn ranking_is_truncated_to_top_k() {
    let pages: Vec<Page> = (1..=4)
        .map(|n| page_with_len(n, 600, vec![1.0, n as f32]))
        .collect();
    let ranker = Ranker::new(THRESHOLD);

    for top_k in 0..=6 {
        let ranked = ranker.rank(&[1.0, 0.0], &pages, top_k);
        assert_eq!(ranked.len(), top_k.min(pages.len()));
    }
}

#[test]
fn all_short_pages_keep_corpus_order() {
    let pages: Vec<Page> = (1..=4)
        .map(|n| page_with_len(n, 20, vec![1.0, 0.0]))
        .collect();
    let ranker = Ranker::new(THRESHOLD);

    let ranked = ranker.rank(&[1.0, 0.0], &pages, 3);
    assert_eq!(page_numbers(&ranked), vec![1, 2, 3]);
    assert!(ranked.iter().all(|hit| hit.score == 0.0));
}

#[test]
fn ranking_does_not_touch_pages() {
    let pages = vec![
        page_with_len(1, 600, vec![0.0, 1.0]),
        page_with_len(2, 600, vec![1.0, 0.0]),
    ];
    let before = pages.clone();

    let ranked = Ranker::new(THRESHOLD).rank(&[1.0, 0.0], &pages, 2);
    assert!(std::ptr::eq(ranked[0].page, &pages[1]));
    assert_eq!(pages, before);
}

#[test]
fn ranker_from_config() {
    let config = RetrievalConfig {
        min_content_chars: 120,
        ..RetrievalConfig::default()
    };
    assert_eq!(Ranker::from_config(&config).min_content_chars(), 120);
}

#[test]
fn large_finite_embeddings_stay_in_range() {
    let ranker = Ranker::new(THRESHOLD);
    let large = page_with_len(1, 600, vec![3e19, 3e19]);

    let score = ranker.score(&[3e19, 3e19], &large);
    assert!((score - 1.0).abs() < 1e-6, "got {score}");

    let score = cosine_similarity(&[f32::MAX, f32::MAX], &[f32::MAX, -f32::MAX]);
    assert!(score.abs() < 1e-6, "got {score}");
}

#[test]
fn large_embeddings_are_ranked_by_direction() {
    let pages = vec![
        page_with_len(1, 600, vec![3e19, 3e19]),
        page_with_len(2, 600, vec![0.0, 1.0]),
        page_with_len(3, 600, vec![1.0, 0.0]),
    ];
    let ranked = Ranker::new(THRESHOLD).rank(&[1.0, 1e-3], &pages, 3);

    assert_eq!(page_numbers(&ranked), vec![3, 1, 2]);
    assert!((ranked[1].score - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-2);
}

#[test]
fn non_finite_query_scores_zero() {
    let ranker = Ranker::new(THRESHOLD);
    let page = page_with_len(1, 600, vec![1.0, 0.0]);

    assert_eq!(ranker.score(&[f32::NAN, 1.0], &page), 0.0);
    assert_eq!(ranker.score(&[f32::INFINITY, 0.0], &page), 0.0);
}
