//! HTML escaping.

use std::fmt::Display;

/// Escapes `&`, `<`, `>`, `"` and `'` for safe inclusion in HTML.
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Interpolates `args` into `template`, escaping each argument.
///
/// Every `{}` in the template is replaced by the next argument in order; the
/// template itself is trusted and left as-is. Placeholders without a matching
/// argument become empty.
///
/// ```
/// use storefront_core::utils::html::format_html;
///
/// let html = format_html("<a href=\"{}\">{}</a>", &[&"/admin/?q=a&b", &3]);
/// assert_eq!(html, "<a href=\"/admin/?q=a&amp;b\">3</a>");
/// ```
pub fn format_html(template: &str, args: &[&dyn Display]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut rest = template;
    while let Some(idx) = rest.find("{}") {
        out.push_str(&rest[..idx]);
        if let Some(arg) = args.next() {
            out.push_str(&escape(&arg.to_string()));
        }
        rest = &rest[idx + 2..];
    }
    out.push_str(rest);
    out
}
