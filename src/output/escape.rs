/// Escapes `& < > " '` for embedding untrusted text in markup.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Absent input escapes to an empty string.
pub fn escape_opt(value: Option<&str>) -> String {
    value.map(escape_html).unwrap_or_default()
}
