//! Rendered cell content, independent of output format.
//!
//! Formatters build a [`Fragment`]; the renderer turns it into escaped markup
//! or into a plain scalar for export. Every string interpolated into markup
//! passes through [`escape_text`] or [`escape_attr`].

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| {
        Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").unwrap()
    });
static SAFE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:https?://|mailto:|tel:|/[^/\\]|/$|#)").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// No value; renders as the placeholder.
    Empty,
    Text(String),
    /// Text cut at a budget. `shown` carries the ellipsis.
    Truncated { shown: String, full: String },
    Link { href: String, text: String, new_tab: bool },
    Badge { tone: String, text: String },
    Image { src: String, alt: String, size: String },
    Swatch(String),
    Icon { name: &'static str, label: String },
    /// Text with a hover tooltip.
    Tooltip { text: String, title: String },
    /// Struck-through text; omitted from plain output.
    Struck(String),
    Join { parts: Vec<Fragment>, sep: &'static str },
    /// Bounded list: `shown` inline, `hidden` behind an expandable "+N more".
    List { shown: Vec<Fragment>, hidden: Vec<Fragment> },
    /// Different content for markup and plain output.
    Alt { markup: Box<Fragment>, plain: String },
}

impl Fragment {
    pub fn text(s: impl Into<String>) -> Self {
        Fragment::Text(s.into())
    }

    /// Text, or [`Fragment::Empty`] when blank.
    pub fn text_or_empty(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.trim().is_empty() {
            Fragment::Empty
        } else {
            Fragment::Text(s)
        }
    }

    pub fn link(href: impl Into<String>, text: impl Into<String>) -> Self {
        Fragment::Link {
            href: href.into(),
            text: text.into(),
            new_tab: false,
        }
    }

    pub fn badge(tone: impl Into<String>, text: impl Into<String>) -> Self {
        Fragment::Badge {
            tone: tone.into(),
            text: text.into(),
        }
    }

    pub fn alt(markup: Fragment, plain: impl Into<String>) -> Self {
        Fragment::Alt {
            markup: Box::new(markup),
            plain: plain.into(),
        }
    }

    /// Splits `items` into a bounded list of at most `max` visible entries.
    pub fn bounded(mut items: Vec<Fragment>, max: usize) -> Self {
        if items.is_empty() {
            return Fragment::Empty;
        }
        let hidden = if items.len() > max {
            items.split_off(max.max(1))
        } else {
            Vec::new()
        };
        Fragment::List {
            shown: items,
            hidden,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Fragment::Empty => true,
            Fragment::Join { parts, .. } => parts.iter().all(Fragment::is_empty),
            Fragment::List { shown, hidden } => shown.is_empty() && hidden.is_empty(),
            _ => false,
        }
    }

    pub fn to_markup(&self, placeholder: &str) -> String {
        match self {
            Fragment::Empty => format!(
                "<span class=\"tabula-empty\" aria-hidden=\"true\">{}</span>",
                escape_text(placeholder)
            ),
            Fragment::Text(s) => escape_text(s).into_owned(),
            Fragment::Truncated { shown, full } => format!(
                "<span class=\"tabula-truncated\" title=\"{}\">{}</span>",
                escape_attr(full),
                escape_text(shown)
            ),
            Fragment::Link { href, text, new_tab } => {
                if !is_safe_url(href) {
                    return escape_text(text).into_owned();
                }
                let target = if *new_tab {
                    " target=\"_blank\" rel=\"noopener noreferrer\""
                } else {
                    ""
                };
                format!(
                    "<a href=\"{}\"{}>{}</a>",
                    escape_attr(href),
                    target,
                    escape_text(text)
                )
            }
            Fragment::Badge { tone, text } => format!(
                "<span class=\"tabula-badge tabula-badge-{}\">{}</span>",
                css_token(tone),
                escape_text(text)
            ),
            Fragment::Image { src, alt, size } => {
                if !is_safe_url(src) {
                    return escape_text(alt).into_owned();
                }
                format!(
                    "<img class=\"tabula-thumb tabula-thumb-{}\" src=\"{}\" alt=\"{}\" loading=\"lazy\">",
                    css_token(size),
                    escape_attr(src),
                    escape_attr(alt)
                )
            }
            Fragment::Swatch(color) => {
                if HEX_COLOR.is_match(color) {
                    format!(
                        "<span class=\"tabula-swatch\" style=\"background-color:{}\" title=\"{}\"></span>",
                        color, color
                    )
                } else {
                    escape_text(color).into_owned()
                }
            }
            Fragment::Icon { name, label } => format!(
                "<span class=\"tabula-icon tabula-icon-{}\" title=\"{}\" aria-label=\"{}\"></span>",
                name,
                escape_attr(label),
                escape_attr(label)
            ),
            Fragment::Tooltip { text, title } => format!(
                "<span title=\"{}\">{}</span>",
                escape_attr(title),
                escape_text(text)
            ),
            Fragment::Struck(s) => format!("<del>{}</del>", escape_text(s)),
            Fragment::Join { parts, sep } => {
                let rendered: Vec<String> = parts
                    .iter()
                    .filter(|p| !p.is_empty())
                    .map(|p| p.to_markup(placeholder))
                    .collect();
                if rendered.is_empty() {
                    Fragment::Empty.to_markup(placeholder)
                } else {
                    rendered.join(&*escape_text(sep))
                }
            }
            Fragment::List { shown, hidden } => {
                if shown.is_empty() && hidden.is_empty() {
                    return Fragment::Empty.to_markup(placeholder);
                }
                let join = |items: &[Fragment]| {
                    items
                        .iter()
                        .map(|i| i.to_markup(placeholder))
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                let mut out = join(shown);
                if !hidden.is_empty() {
                    out.push_str(&format!(
                        " <details class=\"tabula-more\"><summary>+{} more</summary>{}</details>",
                        hidden.len(),
                        join(hidden)
                    ));
                }
                out
            }
            Fragment::Alt { markup, .. } => markup.to_markup(placeholder),
        }
    }

    /// Markup-free scalar for export. Empty values become "".
    pub fn to_plain(&self) -> String {
        match self {
            Fragment::Empty | Fragment::Struck(_) => String::new(),
            Fragment::Text(s) => s.clone(),
            Fragment::Truncated { full, .. } => full.clone(),
            Fragment::Link { href, text, .. } => {
                if text.trim().is_empty() {
                    href.clone()
                } else {
                    text.clone()
                }
            }
            Fragment::Badge { text, .. } => text.clone(),
            Fragment::Image { src, .. } => src.clone(),
            Fragment::Swatch(color) => color.clone(),
            Fragment::Icon { label, .. } => label.clone(),
            Fragment::Tooltip { text, .. } => text.clone(),
            Fragment::Join { parts, sep } => parts
                .iter()
                .map(Fragment::to_plain)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(*sep),
            Fragment::List { shown, hidden } => shown
                .iter()
                .chain(hidden.iter())
                .map(Fragment::to_plain)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
            Fragment::Alt { plain, .. } => plain.clone(),
        }
    }
}

pub fn escape_text(s: &str) -> Cow<'_, str> {
    html_escape::encode_text(s)
}

pub fn escape_attr(s: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(s)
}

/// Links are emitted only for web, mail, phone, and same-site targets.
pub fn is_safe_url(url: &str) -> bool {
    SAFE_URL.is_match(url.trim())
}

/// Lowercase `[a-z0-9-]` token for class names.
pub fn css_token(raw: &str) -> String {
    let token: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let token = token.trim_matches('-').to_string();
    if token.is_empty() {
        "default".to_string()
    } else {
        token
    }
}
