// src/utils/html.rs

/// Sanitizes author-supplied text (quiz titles, question and option text,
/// feedback) before it is stored.
///
/// Whitelist-based: harmless inline tags survive, `<script>` and friends
/// are removed together with their content, event-handler attributes are
/// stripped. Whitespace around the cleaned result is trimmed.
pub fn clean_text(input: &str) -> String {
    ammonia::clean(input).trim().to_string()
}

/// Like [`clean_text`], mapping blank results to `None`.
pub fn clean_optional(input: Option<&str>) -> Option<String> {
    input.map(clean_text).filter(|s| !s.is_empty())
}
