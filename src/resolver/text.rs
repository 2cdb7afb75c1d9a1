/// Where an error sits within its visual line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineContext<'a> {
    /// Zero-based line number within the element text.
    pub line_index: usize,
    /// Character offset of the first character on the line.
    pub line_start: usize,
    pub text_before_on_line: &'a str,
    pub error_text: &'a str,
}

fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn byte_offset(text: &str, char_offset: usize) -> Option<usize> {
    if char_offset == 0 {
        return Some(0);
    }
    text.char_indices()
        .map(|(idx, _)| idx)
        .chain(std::iter::once(text.len()))
        .nth(char_offset)
}

/// Slice `text` by character offsets. `None` when the range is out of bounds.
pub fn char_slice(text: &str, start: usize, end: usize) -> Option<&str> {
    if end < start {
        return None;
    }
    let from = byte_offset(text, start)?;
    let to = byte_offset(text, end)?;
    Some(&text[from..to])
}

/// Locate the line holding `[start, end)` by scanning backward from `start`
/// for the nearest line break. `\r\n` counts as one break.
pub fn line_context(full_text: &str, start: usize, end: usize) -> Option<LineContext<'_>> {
    let start_byte = byte_offset(full_text, start)?;
    let error_text = char_slice(full_text, start, end)?;
    let before = &full_text[..start_byte];

    let line_start_byte = before
        .char_indices()
        .rev()
        .find(|(_, c)| is_line_break(*c))
        .map(|(idx, c)| idx + c.len_utf8())
        .unwrap_or(0);

    let mut line_index = 0;
    let mut previous = None;
    for c in before.chars() {
        if is_line_break(c) && !(c == '\n' && previous == Some('\r')) {
            line_index += 1;
        }
        previous = Some(c);
    }

    let text_before_on_line = &before[line_start_byte..];
    Some(LineContext {
        line_index,
        line_start: start - text_before_on_line.chars().count(),
        text_before_on_line,
        error_text,
    })
}

#[cfg(test)]
mod tests {
    use super::{char_slice, line_context};

    #[test]
    fn first_line_context_starts_at_element_start() {
        let ctx = line_context("Teh cat sat", 0, 3).expect("in range");
        assert_eq!(ctx.line_index, 0);
        assert_eq!(ctx.text_before_on_line, "");
        assert_eq!(ctx.error_text, "Teh");
    }

    #[test]
    fn scans_back_to_nearest_break_not_element_start() {
        let text = "first line\nsecond lien here";
        let ctx = line_context(text, 18, 22).expect("in range");
        assert_eq!(ctx.line_index, 1);
        assert_eq!(ctx.line_start, 11);
        assert_eq!(ctx.text_before_on_line, "second ");
        assert_eq!(ctx.error_text, "lien");
    }

    #[test]
    fn crlf_counts_once() {
        let text = "a\r\nb\r\nc wrod";
        let ctx = line_context(text, 8, 12).expect("in range");
        assert_eq!(ctx.line_index, 2);
        assert_eq!(ctx.text_before_on_line, "c ");
    }

    #[test]
    fn offsets_are_characters_not_bytes() {
        let text = "héllo wörld";
        assert_eq!(char_slice(text, 6, 11), Some("wörld"));
        let ctx = line_context(text, 6, 11).expect("in range");
        assert_eq!(ctx.text_before_on_line, "héllo ");
    }

    #[test]
    fn out_of_range_error_has_no_context() {
        assert!(line_context("short", 3, 40).is_none());
        assert!(line_context("short", 9, 10).is_none());
    }
}
