/// Best-effort HTML re-indenter for the source view.
///
/// This is a lexical formatter, not a parser: it only looks at open and
/// close cues, never at tag names, so mismatched markup still produces
/// output. Scraped pages are arbitrary and frequently malformed.

const INDENT_UNIT: &str = "  ";

/// Re-indent `html`, one token per line. Deterministic, never fails.
///
/// Closing tags dedent before they are emitted. Opening tags indent
/// after, unless self-closing (`.../>`) or a declaration (`<!...`).
/// The internal level may go negative on unbalanced input; emitted
/// indentation is clamped at zero and recovers on its own once enough
/// closing tags have passed.
pub fn format_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len() + html.len() / 4);
    let mut indent: i32 = 0;

    for token in tokenize(html) {
        if token.starts_with("</") {
            indent -= 1;
        }
        for _ in 0..indent.max(0) {
            out.push_str(INDENT_UNIT);
        }
        out.push_str(token);
        out.push('\n');
        if token.starts_with('<')
            && !token.starts_with("</")
            && !token.starts_with("<!")
            && !token.ends_with("/>")
        {
            indent += 1;
        }
    }

    out
}

/// Split on `<...>` boundaries, keeping every token: tags, the text
/// between them, and the (possibly empty) text before the first and
/// after the last tag.
fn tokenize(html: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        match rest[open..].find('>') {
            Some(close) => {
                let close = open + close;
                tokens.push(&rest[..open]);
                tokens.push(&rest[open..=close]);
                rest = &rest[close + 1..];
            }
            // Unterminated tag: emit what is left as one text token.
            None => break,
        }
    }
    tokens.push(rest);
    tokens
}
