//! Image, file, and gallery formatters.
//!
//! Media values arrive as attachment ids (numbers or numeric strings), as
//! objects carrying at least a `url`, or as bare URLs. Ids are looked up
//! through the host; the other shapes are used as-is.

use super::fragment::Fragment;
use super::scalar::max_items;
use super::text::{human_size, plural};
use super::RenderContext;
use crate::host::Attachment;
use serde_json::Value;
use std::collections::BTreeMap;

fn basename(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or(path)
        .to_string()
}

fn attachment_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Resolves any supported media shape to an attachment.
pub(super) fn attachment_from(ctx: &RenderContext<'_>, value: &Value) -> Option<Attachment> {
    if let Some(id) = attachment_id(value) {
        return ctx.host.data.attachment(id);
    }
    match value {
        Value::Object(obj) => {
            if let Some(found) = obj
                .get("id")
                .or_else(|| obj.get("ID"))
                .and_then(attachment_id)
                .and_then(|id| ctx.host.data.attachment(id))
            {
                return Some(found);
            }
            let url = obj.get("url").and_then(Value::as_str)?.trim().to_string();
            let filename = obj
                .get("filename")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| basename(&url));
            let sizes: BTreeMap<String, String> = obj
                .get("sizes")
                .and_then(Value::as_object)
                .map(|sizes| {
                    sizes
                        .iter()
                        .filter_map(|(k, v)| v.as_str().map(|u| (k.clone(), u.to_string())))
                        .collect()
                })
                .unwrap_or_default();
            Some(Attachment {
                id: 0,
                filename,
                url,
                size_bytes: obj.get("filesize").and_then(Value::as_u64).unwrap_or(0),
                sizes,
            })
        }
        Value::String(url) if url.contains('/') => Some(Attachment {
            id: 0,
            filename: basename(url),
            url: url.trim().to_string(),
            size_bytes: 0,
            sizes: BTreeMap::new(),
        }),
        _ => None,
    }
}

/// A thumbnail at the named size; exports carry the original URL.
pub(super) fn thumbnail(attachment: &Attachment, size: &str) -> Fragment {
    Fragment::alt(
        Fragment::Image {
            src: attachment.sized_url(size).to_string(),
            alt: attachment.filename.clone(),
            size: size.to_string(),
        },
        attachment.url.clone(),
    )
}

pub(super) fn image(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let attachment = attachment_from(ctx, value)?;
    Some(match ctx.settings.variant() {
        "filename" => Fragment::Text(attachment.filename),
        "url" => Fragment::link(attachment.url.clone(), attachment.url),
        _ => thumbnail(&attachment, ctx.settings.choice("size")),
    })
}

pub(super) fn file(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let attachment = attachment_from(ctx, value)?;
    Some(match ctx.settings.variant() {
        "link" => Fragment::link(attachment.url, attachment.filename),
        "size" if attachment.size_bytes > 0 => Fragment::alt(
            Fragment::text(human_size(attachment.size_bytes)),
            attachment.size_bytes.to_string(),
        ),
        "size" => Fragment::Empty,
        _ => Fragment::Text(attachment.filename),
    })
}

pub(super) fn gallery(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let items = value.as_array()?;
    let attachments: Vec<Attachment> = items
        .iter()
        .filter_map(|item| attachment_from(ctx, item))
        .collect();
    if attachments.is_empty() {
        return Some(Fragment::Empty);
    }
    Some(match ctx.settings.variant() {
        "thumbnails" => {
            let thumbs = attachments.iter().map(|a| thumbnail(a, "small")).collect();
            Fragment::bounded(thumbs, max_items(ctx, 4))
        }
        _ => Fragment::alt(
            Fragment::badge("count", plural(attachments.len(), "image", "images")),
            attachments.len().to_string(),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basename_ignores_query_and_trailing_slash() {
        assert_eq!(basename("https://cdn.example/a/b/photo.jpg?v=2"), "photo.jpg");
        assert_eq!(basename("https://cdn.example/dir/"), "dir");
        assert_eq!(basename("plain"), "plain");
    }

    #[test]
    fn attachment_ids_accept_numeric_strings() {
        assert_eq!(attachment_id(&serde_json::json!(500)), Some(500));
        assert_eq!(attachment_id(&serde_json::json!(" 501 ")), Some(501));
        assert_eq!(attachment_id(&serde_json::json!("x")), None);
    }
}
