//! Filesystem name sanitizer.
//!
//! Book folders, chapter files, and image files are all named from
//! LLM-produced text, so every name goes through [`sanitize_filename`] first.

/// Normalize arbitrary text into a safe filename/directory component.
///
/// Strips `<>:"/\|?*`, replaces spaces with underscores, drops non-ASCII
/// characters, and truncates to 255 characters. Total: empty input yields
/// empty output.
pub fn sanitize_filename(input: &str) -> String {
    let mut out = String::with_capacity(input.len().min(255));
    for c in input.chars() {
        if out.len() == 255 {
            break;
        }
        match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => {}
            ' ' => out.push('_'),
            c if c.is_ascii() => out.push(c),
            _ => {}
        }
    }
    out
}
