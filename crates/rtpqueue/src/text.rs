//! Colour-code helpers.
//!
//! Templates use `&` as the colour prefix; hosts usually translate it to `§`
//! before display. Both forms are recognised here.

const PREFIXES: [char; 2] = ['&', '§'];

/// Returns `true` for a character that may follow a colour prefix.
fn is_code(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), '0'..='9' | 'a'..='f' | 'k'..='o' | 'r' | 'x')
}

/// Removes colour and format codes (`&a`, `§l`, ...).
///
/// A prefix not followed by a valid code is kept as-is.
pub fn strip_color(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if PREFIXES.contains(&c) {
            if let Some(&next) = chars.peek() {
                if is_code(next) {
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Case-insensitive comparison of two labels after stripping colour codes.
pub fn same_label(a: &str, b: &str) -> bool {
    strip_color(a).trim().eq_ignore_ascii_case(strip_color(b).trim())
}
