//! Outbound line splitting.

/// Maximum payload bytes per physical line on the IRC backend.
pub const MAX_LINE_BYTES: usize = 440;

/// Splits `text` into physical lines.
///
/// Every CR or LF starts a new line, so no line break reaches the wire inside
/// a payload. Empty lines are skipped. Any line longer than `max_bytes` is
/// hard-split on character boundaries.
pub fn split_message(text: &str, max_bytes: usize) -> Vec<String> {
    let max_bytes = max_bytes.max(1);
    let mut out = Vec::new();
    for line in text.split(['\r', '\n']) {
        if !line.is_empty() {
            chunk_line(line, max_bytes, &mut out);
        }
    }
    out
}

fn chunk_line(line: &str, max_bytes: usize, out: &mut Vec<String>) {
    let mut rest = line;
    while rest.len() > max_bytes {
        let mut cut = max_bytes;
        while cut > 0 && !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut == 0 {
            // A single character wider than the limit still has to go out.
            cut = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let (head, tail) = rest.split_at(cut);
        out.push(head.to_string());
        rest = tail;
    }
    if !rest.is_empty() {
        out.push(rest.to_string());
    }
}
