//! HTML escaping for values interpolated into the post template.

use std::fmt;

/// Markup that is safe to emit verbatim.
///
/// Values only enter this type through [`escape_html`],
/// [`escape_html_with_line_breaks`] or [`HtmlSafe::trusted`], which is
/// reserved for markup and constants owned by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HtmlSafe(String);

impl HtmlSafe {
    pub fn trusted(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HtmlSafe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Escape `& < > " '`, mapping each input character independently.
pub fn escape_html(value: &str) -> HtmlSafe {
    let mut escaped = String::with_capacity(value.len());
    push_escaped(&mut escaped, value);
    HtmlSafe(escaped)
}

/// Escape like [`escape_html`], then turn every `\n` into `<br>`.
pub fn escape_html_with_line_breaks(value: &str) -> HtmlSafe {
    let mut escaped = String::with_capacity(value.len());
    for (index, line) in value.split('\n').enumerate() {
        if index > 0 {
            escaped.push_str("<br>");
        }
        push_escaped(&mut escaped, line);
    }
    HtmlSafe(escaped)
}

fn push_escaped(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
}
