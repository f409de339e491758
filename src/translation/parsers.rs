pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

/// Whether the quote at `idx` opens an `E'...'` escape string: it follows a
/// lone `E` or `e` rather than the tail of a longer word.
pub(super) fn is_escape_string_start(bytes: &[u8], idx: usize) -> bool {
    let Some(prefix_at) = idx.checked_sub(1) else {
        return false;
    };
    matches!(bytes[prefix_at], b'E' | b'e')
        && prefix_at
            .checked_sub(1)
            .is_none_or(|before| !(bytes[before].is_ascii_alphanumeric() || bytes[before] == b'_'))
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// Recognise `$tag$` (or `$$`) at `start`; returns the tag and the index of
/// the closing `$` of the opener.
pub(super) fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 1;
    if bytes.get(idx).is_some_and(u8::is_ascii_digit) {
        // `$1` is a positional parameter, not a tag.
        return None;
    }
    while idx < bytes.len() && bytes[idx] != b'$' {
        let b = bytes[idx];
        if !(b.is_ascii_alphanumeric() || b == b'_') {
            return None;
        }
        idx += 1;
    }

    if idx < bytes.len() && bytes[idx] == b'$' {
        let tag = String::from_utf8(bytes[start + 1..idx].to_vec()).ok()?;
        Some((tag, idx))
    } else {
        None
    }
}

/// Whether the `$` at `idx` starts the closing `$tag$`.
pub(super) fn matches_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    end < bytes.len()
        && bytes[idx + 1..end] == *tag.as_bytes()
        && bytes.get(end) == Some(&b'$')
}
