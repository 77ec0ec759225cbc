#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::loader::Segment;

/// Separator cascade, evaluated in priority order: paragraph breaks, then
/// line breaks, then whitespace. Text that still exceeds the chunk size after
/// the last separator is cut at a hard character boundary.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Configuration for splitting document text into embedding-ready chunks.
/// Sizes are measured in characters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SplitterConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

impl Default for SplitterConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Split loaded segments into chunks, preserving reading order across
/// segment boundaries.
#[inline]
pub fn split_segments(segments: &[Segment], config: &SplitterConfig) -> Vec<String> {
    let mut chunks = Vec::new();
    for segment in segments {
        chunks.extend(split_text(&segment.text, config));
    }

    debug!(
        "Split {} segments into {} chunks",
        segments.len(),
        chunks.len()
    );

    chunks
}

/// Split a single text into chunks of at most `chunk_size` characters.
///
/// Each chunk after the first starts with at least `chunk_overlap` trailing
/// characters of its predecessor, unless the predecessor was the last chunk
/// of the text or a single split already exceeds the budget.
#[inline]
pub fn split_text(text: &str, config: &SplitterConfig) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    split_recursive(text, &SEPARATORS, config)
        .into_iter()
        .filter(|chunk| !chunk.trim().is_empty())
        .collect()
}

fn split_recursive(text: &str, separators: &[&str], config: &SplitterConfig) -> Vec<String> {
    // First separator that actually occurs in this text wins; when none does,
    // the text is one unbreakable run and gets a hard cutoff.
    let Some(sep_index) = separators.iter().position(|sep| text.contains(sep)) else {
        return hard_split(text, config);
    };
    let separator = separators[sep_index];
    let remaining = &separators[sep_index + 1..];

    let splits: Vec<&str> = text.split(separator).filter(|s| !s.is_empty()).collect();

    let mut chunks = Vec::new();
    let mut fitting: Vec<&str> = Vec::new();

    for split in splits {
        if char_len(split) < config.chunk_size {
            fitting.push(split);
        } else {
            if !fitting.is_empty() {
                chunks.extend(merge_splits(&fitting, separator, config));
                fitting.clear();
            }
            if remaining.is_empty() {
                chunks.extend(hard_split(split, config));
            } else {
                chunks.extend(split_recursive(split, remaining, config));
            }
        }
    }

    if !fitting.is_empty() {
        chunks.extend(merge_splits(&fitting, separator, config));
    }

    chunks
}

/// Accumulate splits into chunks bounded by `chunk_size`, carrying the
/// minimal trailing run of splits totalling at least `chunk_overlap`
/// characters into the next chunk.
fn merge_splits(splits: &[&str], separator: &str, config: &SplitterConfig) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut total = 0usize;

    for &split in splits {
        let len = char_len(split);
        let added = if current.is_empty() { len } else { len + sep_len };

        if total + added > config.chunk_size && !current.is_empty() {
            chunks.push(current.join(separator));

            // Keep the smallest suffix that still satisfies the overlap.
            while let Some(&front) = current.first() {
                let drop = if current.len() > 1 {
                    char_len(front) + sep_len
                } else {
                    char_len(front)
                };
                if total >= drop && total - drop >= config.chunk_overlap {
                    total -= drop;
                    current.remove(0);
                } else {
                    break;
                }
            }

            // The overlap must not crowd out the incoming split.
            while !current.is_empty() && total + len + sep_len > config.chunk_size {
                let front = current[0];
                let drop = if current.len() > 1 {
                    char_len(front) + sep_len
                } else {
                    char_len(front)
                };
                total = total.saturating_sub(drop);
                current.remove(0);
            }
        }

        total += if current.is_empty() { len } else { len + sep_len };
        current.push(split);
    }

    if !current.is_empty() {
        chunks.push(current.join(separator));
    }

    chunks
}

/// Last-resort cutoff for runs with no usable separator: fixed windows of
/// `chunk_size` characters advancing by `chunk_size - chunk_overlap`.
fn hard_split(text: &str, config: &SplitterConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= config.chunk_size {
        return vec![text.to_string()];
    }

    let step = config.chunk_size.saturating_sub(config.chunk_overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + config.chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
