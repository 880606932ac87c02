//! Formatters for references to other entities, terms, and users.

use super::fragment::Fragment;
use super::scalar::{max_items, url_host};
use super::text::plural;
use super::RenderContext;
use crate::host::{EntityId, User};
use serde_json::Value;

/// Ids referenced by a relational value: a number, a numeric string, an
/// object with `id`/`ID`, or an array of any of those.
pub(super) fn referenced_ids(value: &Value) -> Vec<u64> {
    fn one(value: &Value) -> Option<u64> {
        match value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            Value::Object(obj) => obj.get("id").or_else(|| obj.get("ID")).and_then(one),
            _ => None,
        }
    }
    match value {
        Value::Array(items) => items.iter().filter_map(one).collect(),
        other => one(other).into_iter().collect(),
    }
}

/// Shared display handling for titles/links/count style schemas.
fn listing(ctx: &RenderContext<'_>, items: Vec<(String, String)>, default_max: usize) -> Fragment {
    if items.is_empty() {
        return Fragment::Empty;
    }
    match ctx.settings.variant() {
        "count" => Fragment::alt(
            Fragment::badge("count", plural(items.len(), "item", "items")),
            items.len().to_string(),
        ),
        "links" => {
            let parts = items
                .into_iter()
                .map(|(name, href)| {
                    if href.is_empty() {
                        Fragment::Text(name)
                    } else {
                        Fragment::link(href, name)
                    }
                })
                .collect();
            Fragment::bounded(parts, max_items(ctx, default_max))
        }
        _ => {
            let parts = items.into_iter().map(|(name, _)| Fragment::Text(name)).collect();
            Fragment::bounded(parts, max_items(ctx, default_max))
        }
    }
}

/// Referenced entities; ids the host cannot find are skipped.
pub(super) fn entities(ctx: &RenderContext<'_>, ids: &[EntityId]) -> Fragment {
    let items = ids
        .iter()
        .filter_map(|id| ctx.host.data.entity(*id))
        .map(|e| (e.title, e.permalink))
        .collect();
    listing(ctx, items, 3)
}

pub(super) fn terms(ctx: &RenderContext<'_>, ids: &[u64]) -> Fragment {
    let items = ids
        .iter()
        .filter_map(|id| ctx.host.data.term(*id))
        .map(|t| (t.name, t.link))
        .collect();
    listing(ctx, items, 5)
}

/// One user, by the configured identity.
pub(super) fn user(ctx: &RenderContext<'_>, user: &User) -> Fragment {
    match ctx.settings.variant() {
        "username" => Fragment::text(user.username.clone()),
        "email" if !user.email.is_empty() => {
            Fragment::link(format!("mailto:{}", user.email), user.email.clone())
        }
        "email" => Fragment::Empty,
        _ => Fragment::text(user.name()),
    }
}

pub(super) fn post_object(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let ids = referenced_ids(value);
    if ids.is_empty() {
        return None;
    }
    Some(entities(ctx, &ids))
}

/// Page links may hold entity ids or literal URLs.
pub(super) fn page_link(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let urls: Vec<String> = match value {
        Value::String(s) if url_host(s).is_some() => vec![s.trim().to_string()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| url_host(s).is_some())
            .map(|s| s.trim().to_string())
            .collect(),
        _ => Vec::new(),
    };
    if urls.is_empty() {
        return post_object(ctx, value);
    }
    let items = urls
        .into_iter()
        .map(|u| (url_host(&u).unwrap_or_default(), u))
        .collect();
    Some(listing(ctx, items, 3))
}

pub(super) fn taxonomy(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let ids = referenced_ids(value);
    if ids.is_empty() {
        return None;
    }
    Some(terms(ctx, &ids))
}

pub(super) fn users(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let ids = referenced_ids(value);
    if ids.is_empty() {
        return None;
    }
    let parts: Vec<Fragment> = ids
        .iter()
        .filter_map(|id| ctx.host.data.user(*id))
        .map(|u| user(ctx, &u))
        .filter(|f| !f.is_empty())
        .collect();
    Some(match parts.len() {
        0 => Fragment::Empty,
        1 => parts.into_iter().next().unwrap_or(Fragment::Empty),
        _ => Fragment::bounded(parts, 5),
    })
}
