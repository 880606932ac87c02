//! Formatters for scalar field types.

use super::fragment::Fragment;
use super::text::{format_number, plural, strip_tags, truncate_chars, truncate_words};
use super::RenderContext;
use crate::fields::title_case;
use crate::host::scalar_string;
use crate::settings::coerce_flag;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@<>]+@[^\s@<>]+\.[^\s@<>]+$").unwrap());
static URL_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z][a-z0-9+.-]*://(?:[^@/?#]*@)?([^/:?#]+)").unwrap());

const MASK: &str = "••••••••";
const DEFAULT_MAX_ITEMS: usize = 5;

/// Scalar text of a value; arrays of scalars are joined with ", ".
pub(super) fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar_string).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        other => scalar_string(other),
    }
}

pub(super) fn value_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => crate::query::parse_number(s),
        _ => None,
    }
}

/// Host part of a URL, without a leading "www.".
pub(super) fn url_host(url: &str) -> Option<String> {
    URL_HOST
        .captures(url.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_start_matches("www.").to_lowercase())
}

/// `max_items` from settings, or `default` when the schema has none.
pub(super) fn max_items(ctx: &RenderContext<'_>, default: usize) -> usize {
    match ctx.settings.integer("max_items") {
        0 => default,
        n => n as usize,
    }
}

pub(super) fn text(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let text = value_text(value)?;
    Some(truncate_chars(&text, ctx.settings.integer("truncate") as usize))
}

pub(super) fn long_text(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let stripped = strip_tags(&value_text(value)?);
    Some(match ctx.settings.variant() {
        "full" => Fragment::text_or_empty(stripped),
        "word_count" => {
            let count = stripped.split_whitespace().count();
            Fragment::alt(Fragment::text(plural(count, "word", "words")), count.to_string())
        }
        _ => truncate_words(&stripped, ctx.settings.integer("words") as usize),
    })
}

pub(super) fn number(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let n = value_number(value)?;
    let raw = value_text(value)?.trim().to_string();
    let decimals = ctx.settings.integer("decimals") as usize;
    let shown = match ctx.settings.variant() {
        "formatted" => format_number(n, decimals, true),
        "currency" => {
            let decimals = if decimals == 0 && n.fract() != 0.0 { 2 } else { decimals };
            let number = format_number(n, decimals, true);
            match number.strip_prefix('-') {
                Some(rest) => format!("-{}{}", ctx.options.currency_symbol, rest),
                None => format!("{}{}", ctx.options.currency_symbol, number),
            }
        }
        _ => raw.clone(),
    };
    let decorated = format!(
        "{}{}{}",
        ctx.settings.text("prefix"),
        shown,
        ctx.settings.text("suffix")
    );
    Some(Fragment::alt(Fragment::Text(decorated), raw))
}

pub(super) fn email(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let address = value_text(value)?.trim().to_string();
    if !EMAIL.is_match(&address) {
        return Some(truncate_chars(&address, 60));
    }
    Some(match ctx.settings.variant() {
        "text" => Fragment::Text(address),
        _ => Fragment::link(format!("mailto:{}", address), address),
    })
}

pub(super) fn url(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let url = value_text(value)?.trim().to_string();
    let Some(host) = url_host(&url) else {
        return Some(truncate_chars(&url, 60));
    };
    Some(match ctx.settings.variant() {
        "domain" => Fragment::alt(Fragment::link(url.clone(), host), url),
        "text" => Fragment::Text(url),
        _ => Fragment::link(url.clone(), url),
    })
}

pub(super) fn phone(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let number = value_text(value)?.trim().to_string();
    let dial: String = number
        .chars()
        .enumerate()
        .filter(|(i, c)| c.is_ascii_digit() || (*i == 0 && *c == '+'))
        .map(|(_, c)| c)
        .collect();
    if dial.trim_start_matches('+').is_empty() {
        return Some(Fragment::Text(number));
    }
    Some(match ctx.settings.variant() {
        "text" => Fragment::Text(number),
        _ => Fragment::link(format!("tel:{}", dial), number),
    })
}

pub(super) fn password(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let secret = value_text(value)?;
    Some(match ctx.settings.variant() {
        "length" => Fragment::text(plural(secret.chars().count(), "character", "characters")),
        _ => Fragment::text(MASK),
    })
}

fn provider_name(host: &str) -> String {
    let known = [
        ("youtube.com", "YouTube"),
        ("youtu.be", "YouTube"),
        ("vimeo.com", "Vimeo"),
        ("soundcloud.com", "SoundCloud"),
        ("spotify.com", "Spotify"),
        ("twitter.com", "X"),
        ("x.com", "X"),
        ("instagram.com", "Instagram"),
        ("tiktok.com", "TikTok"),
    ];
    known
        .iter()
        .find(|(domain, _)| host == *domain || host.ends_with(&format!(".{}", domain)))
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| host.to_string())
}

pub(super) fn oembed(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let url = match value {
        Value::Object(obj) => obj.get("url").and_then(Value::as_str)?.to_string(),
        other => value_text(other)?,
    };
    let host = url_host(&url)?;
    Some(match ctx.settings.variant() {
        "provider" => Fragment::alt(Fragment::link(url.clone(), provider_name(&host)), url),
        _ => Fragment::link(url.clone(), url),
    })
}

pub(super) fn link(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let (url, title, target) = match value {
        Value::Object(obj) => (
            obj.get("url").and_then(Value::as_str)?.trim().to_string(),
            obj.get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string(),
            obj.get("target").and_then(Value::as_str).unwrap_or_default(),
        ),
        other => (value_text(other)?.trim().to_string(), String::new(), ""),
    };
    if url.is_empty() {
        return None;
    }
    let new_tab = ctx.settings.flag("new_tab") || target == "_blank";
    let title = if title.is_empty() { url.clone() } else { title };
    let anchor = |text: String| Fragment::Link {
        href: url.clone(),
        text,
        new_tab,
    };
    Some(match ctx.settings.variant() {
        "url" => anchor(url.clone()),
        "both" => Fragment::Join {
            parts: vec![anchor(title), Fragment::Text(format!("({})", url))],
            sep: " ",
        },
        _ => anchor(title),
    })
}

pub(super) fn color(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let hex = value_text(value)?.trim().to_lowercase();
    Some(match ctx.settings.variant() {
        "hex" => Fragment::Text(hex),
        "both" => Fragment::Join {
            parts: vec![Fragment::Swatch(hex.clone()), Fragment::Text(hex)],
            sep: " ",
        },
        _ => Fragment::Swatch(hex),
    })
}

pub(super) fn true_false(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let on = coerce_flag(value)?;
    Some(match ctx.settings.variant() {
        "yes_no" => Fragment::text(if on { "Yes" } else { "No" }),
        "on_off" => Fragment::text(if on { "On" } else { "Off" }),
        _ => Fragment::Icon {
            name: if on { "yes" } else { "no" },
            label: if on { "Yes" } else { "No" }.to_string(),
        },
    })
}

/// Raw choice values: a scalar, an array of scalars, or `{value, label}` objects.
fn choice_values(value: &Value) -> Vec<(String, Option<String>)> {
    let one = |v: &Value| match v {
        Value::Object(obj) => obj.get("value").and_then(scalar_string).map(|value| {
            let label = obj.get("label").and_then(Value::as_str).map(String::from);
            (value, label)
        }),
        other => scalar_string(other).map(|s| (s, None)),
    };
    match value {
        Value::Array(items) => items.iter().filter_map(one).collect(),
        other => one(other).into_iter().collect(),
    }
}

pub(super) fn choice(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let values = choice_values(value);
    if values.is_empty() {
        return None;
    }
    let variant = ctx.settings.variant();
    let definition = ctx.field.definition.as_ref();
    let items: Vec<Fragment> = values
        .into_iter()
        .filter(|(v, _)| !v.trim().is_empty())
        .map(|(v, label)| {
            let label = label
                .or_else(|| definition.and_then(|d| d.choice_label(&v)).map(String::from))
                .unwrap_or_else(|| title_case(&v));
            match variant {
                "value" => Fragment::Text(v),
                "badge" => Fragment::badge(v, label),
                _ => Fragment::Text(label),
            }
        })
        .collect();
    Some(match items.len() {
        0 => Fragment::Empty,
        1 => items.into_iter().next().unwrap_or(Fragment::Empty),
        _ => Fragment::bounded(items, max_items(ctx, DEFAULT_MAX_ITEMS)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_host_strips_www_and_credentials() {
        assert_eq!(url_host("https://www.Example.com/path"), Some("example.com".into()));
        assert_eq!(url_host("http://user:pw@host.example:8080/"), Some("host.example".into()));
        assert_eq!(url_host("not a url"), None);
    }

    #[test]
    fn providers_are_recognized() {
        assert_eq!(provider_name("youtu.be"), "YouTube");
        assert_eq!(provider_name("player.vimeo.com"), "Vimeo");
        assert_eq!(provider_name("media.example"), "media.example");
    }

    #[test]
    fn choice_values_accept_several_shapes() {
        assert_eq!(choice_values(&serde_json::json!("a")), vec![("a".to_string(), None)]);
        assert_eq!(
            choice_values(&serde_json::json!([{"value": "b", "label": "Bee"}, 3])),
            vec![
                ("b".to_string(), Some("Bee".to_string())),
                ("3".to_string(), None)
            ]
        );
        assert!(choice_values(&serde_json::json!({"x": 1})).is_empty());
    }

    #[test]
    fn value_text_joins_arrays() {
        assert_eq!(value_text(&serde_json::json!(["a", 1])), Some("a, 1".into()));
        assert_eq!(value_text(&serde_json::json!([])), None);
        assert_eq!(value_text(&serde_json::json!({})), None);
    }
}
