use super::*;
use crate::loader::{Segment, SegmentSource};

fn segment(text: &str) -> Segment {
    Segment {
        text: text.to_string(),
        source: SegmentSource {
            filename: "test.txt".to_string(),
            page: None,
        },
    }
}

/// Longest suffix of `prev` that is a prefix of `next`, in characters.
fn shared_boundary_len(prev: &str, next: &str) -> usize {
    let prev_chars: Vec<char> = prev.chars().collect();
    let next_chars: Vec<char> = next.chars().collect();
    let max = prev_chars.len().min(next_chars.len());

    for len in (1..=max).rev() {
        if prev_chars[prev_chars.len() - len..] == next_chars[..len] {
            return len;
        }
    }
    0
}

#[test]
fn default_config() {
    let config = SplitterConfig::default();
    assert_eq!(config.chunk_size, 1000);
    assert_eq!(config.chunk_overlap, 200);
}

#[test]
fn short_text_is_single_chunk() {
    let config = SplitterConfig::default();
    let chunks = split_text("a short paragraph that easily fits", &config);
    assert_eq!(chunks, vec!["a short paragraph that easily fits"]);
}

#[test]
fn empty_and_whitespace_produce_no_chunks() {
    let config = SplitterConfig::default();
    assert!(split_text("", &config).is_empty());
    assert!(split_text("   \n\n  \t ", &config).is_empty());
}

#[test]
fn chunks_respect_size_cap() {
    let config = SplitterConfig::default();
    let words: Vec<String> = (0..1200).map(|i| format!("word{i:04}")).collect();
    let text = words.join(" ");

    let chunks = split_text(&text, &config);

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(
            chunk.chars().count() <= config.chunk_size,
            "chunk exceeded size cap: {} chars",
            chunk.chars().count()
        );
    }
}

#[test]
fn consecutive_chunks_share_overlap() {
    let config = SplitterConfig::default();
    let words: Vec<String> = (0..1200).map(|i| format!("word{i:04}")).collect();
    let text = words.join(" ");

    let chunks = split_text(&text, &config);
    assert!(chunks.len() > 2);

    for pair in chunks.windows(2) {
        let shared = shared_boundary_len(&pair[0], &pair[1]);
        assert!(
            shared >= config.chunk_overlap,
            "expected at least {} shared chars, found {}",
            config.chunk_overlap,
            shared
        );
    }
}

#[test]
fn unbroken_run_gets_hard_cutoff() {
    let config = SplitterConfig::default();
    let text: String = std::iter::repeat('x').take(2500).collect();

    let chunks = split_text(&text, &config);

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].chars().count(), 1000);
    assert_eq!(chunks[1].chars().count(), 1000);
    assert_eq!(chunks[2].chars().count(), 900);
    for pair in chunks.windows(2) {
        assert!(shared_boundary_len(&pair[0], &pair[1]) >= config.chunk_overlap);
    }
}

#[test]
fn paragraph_boundaries_are_preferred() {
    let config = SplitterConfig::default();
    let para_a: String = std::iter::repeat("alpha ").take(100).collect::<String>();
    let para_a = para_a.trim_end().to_string();
    let para_b: String = std::iter::repeat("bravo ").take(100).collect::<String>();
    let para_b = para_b.trim_end().to_string();
    let text = format!("{para_a}\n\n{para_b}");

    let chunks = split_text(&text, &config);

    // Neither paragraph fits alongside the other, so each stays whole.
    assert_eq!(chunks, vec![para_a, para_b]);
}

#[test]
fn oversized_paragraph_falls_through_the_cascade() {
    let config = SplitterConfig {
        chunk_size: 50,
        chunk_overlap: 10,
    };
    let text = "short intro\n\nthis paragraph is much longer than fifty characters and \
                has to be broken on word boundaries instead";

    let chunks = split_text(&text, &config);

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(chunk.chars().count() <= 50, "oversized chunk: {chunk:?}");
    }
    assert!(chunks[0].contains("short intro"));
}

#[test]
fn segments_split_in_reading_order() {
    let config = SplitterConfig::default();
    let segments = vec![segment("first segment text"), segment("second segment text")];

    let chunks = split_segments(&segments, &config);

    assert_eq!(chunks, vec!["first segment text", "second segment text"]);
}

#[test]
fn empty_segments_are_skipped() {
    let config = SplitterConfig::default();
    let segments = vec![segment(""), segment("only real content"), segment("  \n ")];

    let chunks = split_segments(&segments, &config);
    assert_eq!(chunks, vec!["only real content"]);
}
