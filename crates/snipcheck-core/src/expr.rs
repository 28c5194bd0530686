//! Balanced-parenthesis argument extraction and argument-list splitting.
//!
//! Cutting at the first `)` breaks as soon as an argument contains a call of
//! its own (`print(foo(1, 2))`). The scanner here tracks nesting depth and
//! skips string and character literals, so parentheses inside `"(("` or
//! `')'` never count.

/// Return the text between the `(` at byte index `open` and the `)` that
/// balances it.
///
/// `None` when `open` is not a `(` or the parenthesis is never closed.
/// Literal delimiters are `"`, `'` and `` ` `` with backslash escapes.
pub fn balanced_argument(text: &str, open: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }

    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' | b'`' => quote = Some(b),
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    // Both indices sit on ASCII bytes, so they are char boundaries.
                    return Some(&text[open + 1..i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split an argument list at its top-level commas.
///
/// Commas nested in `()`, `[]` or `{}` or inside literals do not split. Each
/// piece is trimmed; an empty or blank list yields no arguments.
pub fn split_arguments(args: &str) -> Vec<&str> {
    let bytes = args.as_bytes();
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, &b) in bytes.iter().enumerate() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' | b'`' => quote = Some(b),
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                pieces.push(args[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = args[start..].trim();
    // A trailing comma adds no argument.
    if !last.is_empty() {
        pieces.push(last);
    }
    pieces
}
