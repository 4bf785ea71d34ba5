use unicode_normalization::UnicodeNormalization;

/// Canonicalize a raw player name into the form both datasets are compared in.
///
/// NFKD-decomposes the input, drops combining marks and any other non-ASCII
/// remainder, turns hyphens into spaces and collapses runs of whitespace.
/// Token order and letter case are preserved. Output is stable under
/// re-normalization, and composed/decomposed Unicode spellings of the same
/// name produce identical output.
pub fn normalize_name(raw: &str) -> String {
    let mut folded = String::with_capacity(raw.len());
    for ch in raw.nfkd() {
        if ch == '-' {
            folded.push(' ');
        } else if ch.is_ascii() {
            folded.push(ch);
        }
        // Combining marks and leftover non-ASCII code points are dropped,
        // matching an ascii-encode with errors ignored.
    }
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace tokens of an already normalized name.
pub fn name_tokens(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}
