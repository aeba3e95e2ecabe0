/// Characters that end the expression a string literal belongs to.
const EXPRESSION_BOUNDARIES: &[char] = &[';', ',', '(', '[', '{', '}', '=', '?', '!', '&', '|'];

/// Markers that identify an absolute or protocol-relative URL.
const EXTERNAL_MARKERS: &[&str] = &["://", "//"];

/// Return the part of `line_prefix` that belongs to the same expression as the literal after it.
///
/// `line_prefix` is the text between the start of the line and the opening quote. Minified
/// bundles put everything on one line, so the search stops at the nearest expression boundary
/// instead of looking at the whole line.
pub fn preceding_context(line_prefix: &str) -> &str {
    match line_prefix.rfind(EXPRESSION_BOUNDARIES) {
        Some(index) => &line_prefix[index + 1..],
        None => line_prefix,
    }
}

/// Determine whether the text preceding a literal makes it part of an external URL.
///
/// Covers concatenations such as `"https://cdn.example"+"/textures/a.jpg"` and comments.
pub fn is_external_context(context: &str) -> bool {
    EXTERNAL_MARKERS.iter().any(|marker| context.contains(marker))
}
