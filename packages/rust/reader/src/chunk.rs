//! Character-window chunking of extracted text.

/// Split text into overlapping windows of at most `chunk_size` characters.
///
/// Consecutive windows share `overlap` characters. Whitespace-only windows
/// are dropped and each window is trimmed.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() || chunk_size == 0 {
        return vec![];
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        if end >= chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(chunk_text("  Pad Thai  ", 100, 20), vec!["Pad Thai"]);
        assert!(chunk_text("   \n ", 100, 20).is_empty());
    }

    #[test]
    fn windows_overlap() {
        let text: String = ('a'..='z').collect();
        let chunks = chunk_text(&text, 10, 4);
        assert_eq!(chunks[0], "abcdefghij");
        assert_eq!(chunks[1], "ghijklmnop");
        assert!(chunks.last().unwrap().ends_with('z'));
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "ผัดไทย".repeat(5);
        let chunks = chunk_text(&text, 12, 0);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 12));
    }

    #[test]
    fn overlap_at_least_size_still_terminates() {
        let chunks = chunk_text(&"x".repeat(30), 10, 10);
        assert_eq!(chunks.len(), 21);
    }
}
