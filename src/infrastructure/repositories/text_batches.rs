use regex::Regex;
use std::sync::OnceLock;

fn sentence_end() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // ASCII and CJK sentence terminators; narration text is frequently Chinese.
    PATTERN.get_or_init(|| Regex::new(r"[.!?。！？]+\s*").expect("valid sentence regex"))
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split text into batches of at most `max_chars` characters, breaking at sentence ends.
///
/// A single sentence longer than the limit is cut on character boundaries.
pub fn split_into_batches(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    if char_len(text) <= max_chars {
        return vec![text.to_string()];
    }

    let mut batches = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    let mut last_end = 0;

    let mut push_piece = |piece: &str, batches: &mut Vec<String>| {
        let piece_len = char_len(piece);

        if !current.is_empty() && current_len + piece_len > max_chars {
            flush(&mut current, batches);
            current_len = 0;
        }

        if piece_len > max_chars {
            let chars: Vec<char> = piece.chars().collect();
            for chunk in chars.chunks(max_chars) {
                let chunk: String = chunk.iter().collect();
                if !chunk.trim().is_empty() {
                    batches.push(chunk.trim().to_string());
                }
            }
        } else {
            current.push_str(piece);
            current_len += piece_len;
        }
    };

    for mat in sentence_end().find_iter(text) {
        push_piece(&text[last_end..mat.end()], &mut batches);
        last_end = mat.end();
    }

    if last_end < text.len() {
        push_piece(&text[last_end..], &mut batches);
    }

    flush(&mut current, &mut batches);
    batches
}

fn flush(current: &mut String, batches: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        batches.push(trimmed.to_string());
    }
    current.clear();
}
