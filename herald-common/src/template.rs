//! Placeholder substitution for campaign templates.
//!
//! Rendering is a pure function over the template text: each known
//! placeholder is replaced with its value wrapped in the caller-supplied
//! emphasis markers, then newlines are converted to the style's line-break
//! marker. Placeholders the renderer does not recognise are left verbatim;
//! a typo'd `{foo}` surfaces in the delivered message rather than failing
//! the send.

use crate::campaign::TemplateFields;

/// Presentation style applied while rendering a body template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderStyle {
    /// Opening marker wrapped around every substituted value
    pub emphasis_open: String,
    /// Closing marker wrapped around every substituted value
    pub emphasis_close: String,
    /// Marker `\n` is converted to
    pub line_break: String,
}

impl RenderStyle {
    /// HTML emphasis: substituted values become bold spans in the given
    /// highlight colour, newlines become `<br>`.
    #[must_use]
    pub fn html(highlight: &str) -> Self {
        Self {
            emphasis_open: format!("<span style='color:{highlight};font-weight:bold'>"),
            emphasis_close: "</span>".to_string(),
            line_break: "<br>".to_string(),
        }
    }

    /// No emphasis, newlines kept as-is. Useful for logs and tests.
    #[must_use]
    pub fn plain() -> Self {
        Self {
            emphasis_open: String::new(),
            emphasis_close: String::new(),
            line_break: "\n".to_string(),
        }
    }
}

/// Render a body template for one recipient.
///
/// Substitutes `{event}`, `{date}`, `{location}`, `{count}`,
/// `{first_name}` and `{sender_name}` (every occurrence of each), wrapping
/// each substituted value in the style's emphasis markers, then converts
/// line breaks.
#[must_use]
pub fn render_body(
    template: &str,
    fields: &TemplateFields,
    first_name: &str,
    sender_name: &str,
    style: &RenderStyle,
) -> String {
    let emphasise =
        |value: &str| format!("{}{value}{}", style.emphasis_open, style.emphasis_close);

    template
        .replace("{event}", &emphasise(&fields.event))
        .replace("{date}", &emphasise(&fields.date))
        .replace("{location}", &emphasise(&fields.location))
        .replace("{count}", &emphasise(&fields.count))
        .replace("{first_name}", &emphasise(first_name))
        .replace("{sender_name}", &emphasise(sender_name))
        .replace('\n', &style.line_break)
}

/// Render a subject line. Only `{event}` is substituted, with no emphasis
/// and no line-break conversion.
#[must_use]
pub fn render_subject(template: &str, event: &str) -> String {
    template.replace("{event}", event)
}
