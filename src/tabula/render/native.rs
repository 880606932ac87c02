//! Host-native attributes and computed fields.

use super::datetime::{format_datetime, Granularity};
use super::fragment::Fragment;
use super::media::thumbnail;
use super::relational;
use super::text::{strip_tags, truncate_chars, truncate_words, word_count};
use super::RenderContext;
use crate::fields::{title_case, Computed, NativeAttr};
use crate::host::{scalar_strings, PLAN_META_KEY};
use chrono::NaiveDateTime;

/// Reading speed used for the reading-time estimate.
pub const WORDS_PER_MINUTE: usize = 200;

pub fn status_label(status: &str) -> String {
    match status {
        "publish" => "Published".to_string(),
        "draft" => "Draft".to_string(),
        "pending" => "Pending Review".to_string(),
        "private" => "Private".to_string(),
        "future" => "Scheduled".to_string(),
        "trash" => "Trash".to_string(),
        other => title_case(other),
    }
}

fn timestamp(ctx: &RenderContext<'_>, at: Option<NaiveDateTime>) -> Fragment {
    match at {
        Some(at) => {
            let granularity = Granularity::from_setting(ctx.settings.choice("date_format"));
            format_datetime(at, granularity, ctx.options)
        }
        None => Fragment::Empty,
    }
}

pub(super) fn render(ctx: &RenderContext<'_>, attr: &NativeAttr) -> Fragment {
    let entity = ctx.entity;
    match attr {
        NativeAttr::Id => Fragment::text(entity.id.to_string()),
        NativeAttr::Title => {
            truncate_chars(&entity.title, ctx.settings.integer("truncate") as usize)
        }
        NativeAttr::Slug => Fragment::text_or_empty(entity.slug.clone()),
        NativeAttr::Author => entity
            .author
            .and_then(|id| ctx.host.data.user(id))
            .map(|u| relational::user(ctx, &u))
            .unwrap_or(Fragment::Empty),
        NativeAttr::Status => {
            if entity.status.trim().is_empty() {
                return Fragment::Empty;
            }
            let label = status_label(&entity.status);
            match ctx.settings.variant() {
                "badge" => Fragment::badge(entity.status.clone(), label),
                _ => Fragment::Text(label),
            }
        }
        NativeAttr::Date => timestamp(ctx, entity.date),
        NativeAttr::Modified => timestamp(ctx, entity.modified),
        NativeAttr::Excerpt => {
            let source = if entity.excerpt.trim().is_empty() {
                &entity.content
            } else {
                &entity.excerpt
            };
            truncate_words(&strip_tags(source), ctx.settings.integer("words") as usize)
        }
        NativeAttr::CommentCount => Fragment::text(entity.comment_count.to_string()),
        NativeAttr::MenuOrder => Fragment::text(entity.menu_order.to_string()),
        NativeAttr::Parent => match entity.parent {
            Some(parent) => relational::entities(ctx, &[parent]),
            None => Fragment::Empty,
        },
        NativeAttr::FeaturedImage => entity
            .featured_image
            .and_then(|id| ctx.host.data.attachment(id))
            .map(|a| thumbnail(&a, ctx.settings.choice("size")))
            .unwrap_or(Fragment::Empty),
        NativeAttr::Permalink => {
            if entity.permalink.trim().is_empty() {
                return Fragment::Empty;
            }
            match ctx.settings.variant() {
                "text" => Fragment::Text(entity.permalink.clone()),
                _ => Fragment::link(entity.permalink.clone(), entity.permalink.clone()),
            }
        }
        NativeAttr::Plan => {
            let plans: Vec<Fragment> = entity
                .meta(PLAN_META_KEY)
                .map(scalar_strings)
                .unwrap_or_default()
                .into_iter()
                .filter(|p| !p.trim().is_empty())
                .map(|p| Fragment::badge(p.clone(), title_case(&p)))
                .collect();
            Fragment::bounded(plans, 5)
        }
        NativeAttr::Terms(taxonomy) => match entity.terms.get(taxonomy) {
            Some(ids) => relational::terms(ctx, ids),
            None => Fragment::Empty,
        },
    }
}

pub(super) fn computed(ctx: &RenderContext<'_>, computed: Computed) -> Fragment {
    let entity = ctx.entity;
    match computed {
        Computed::WordCount => Fragment::text(word_count(&entity.content).to_string()),
        Computed::ReadingTime => match word_count(&entity.content) {
            0 => Fragment::Empty,
            words => {
                let minutes = words.div_ceil(WORDS_PER_MINUTE);
                Fragment::alt(Fragment::Text(format!("{} min", minutes)), minutes.to_string())
            }
        },
        Computed::ChildCount => Fragment::text(ctx.host.data.child_count(entity.id).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels() {
        assert_eq!(status_label("publish"), "Published");
        assert_eq!(status_label("future"), "Scheduled");
        assert_eq!(status_label("on_hold"), "On Hold");
    }
}
