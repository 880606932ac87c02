//! Field references: what a column's `field_key` points at.

use super::{title_case, Capabilities};
use std::fmt;

/// Prefix marking host-native attributes (`@title`).
pub const NATIVE_SIGIL: char = '@';
/// Prefix marking computed aggregates (`#word_count`).
pub const COMPUTED_SIGIL: char = '#';

/// Attributes the host keeps in its own columns rather than in metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NativeAttr {
    Id,
    Title,
    Slug,
    Author,
    Status,
    Date,
    Modified,
    Excerpt,
    CommentCount,
    MenuOrder,
    Parent,
    FeaturedImage,
    Permalink,
    /// Membership plans the entity is restricted to.
    Plan,
    /// Terms assigned in the named taxonomy.
    Terms(String),
}

impl NativeAttr {
    /// Attributes that exist for every scope. Taxonomy columns are added per scope.
    pub const FIXED: &'static [NativeAttr] = &[
        NativeAttr::Id,
        NativeAttr::Title,
        NativeAttr::Slug,
        NativeAttr::Author,
        NativeAttr::Status,
        NativeAttr::Date,
        NativeAttr::Modified,
        NativeAttr::Excerpt,
        NativeAttr::CommentCount,
        NativeAttr::MenuOrder,
        NativeAttr::Parent,
        NativeAttr::FeaturedImage,
        NativeAttr::Permalink,
        NativeAttr::Plan,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        let attr = match name {
            "id" => NativeAttr::Id,
            "title" => NativeAttr::Title,
            "slug" => NativeAttr::Slug,
            "author" => NativeAttr::Author,
            "status" => NativeAttr::Status,
            "date" => NativeAttr::Date,
            "modified" => NativeAttr::Modified,
            "excerpt" => NativeAttr::Excerpt,
            "comment_count" => NativeAttr::CommentCount,
            "menu_order" => NativeAttr::MenuOrder,
            "parent" => NativeAttr::Parent,
            "featured_image" => NativeAttr::FeaturedImage,
            "permalink" => NativeAttr::Permalink,
            "plan" => NativeAttr::Plan,
            other => {
                let taxonomy = other.strip_prefix("tax:")?;
                if taxonomy.is_empty() {
                    return None;
                }
                NativeAttr::Terms(taxonomy.to_string())
            }
        };
        Some(attr)
    }

    pub fn name(&self) -> String {
        match self {
            NativeAttr::Id => "id".into(),
            NativeAttr::Title => "title".into(),
            NativeAttr::Slug => "slug".into(),
            NativeAttr::Author => "author".into(),
            NativeAttr::Status => "status".into(),
            NativeAttr::Date => "date".into(),
            NativeAttr::Modified => "modified".into(),
            NativeAttr::Excerpt => "excerpt".into(),
            NativeAttr::CommentCount => "comment_count".into(),
            NativeAttr::MenuOrder => "menu_order".into(),
            NativeAttr::Parent => "parent".into(),
            NativeAttr::FeaturedImage => "featured_image".into(),
            NativeAttr::Permalink => "permalink".into(),
            NativeAttr::Plan => "plan".into(),
            NativeAttr::Terms(taxonomy) => format!("tax:{}", taxonomy),
        }
    }

    pub fn label(&self) -> String {
        match self {
            NativeAttr::Id => "ID".into(),
            NativeAttr::Title => "Title".into(),
            NativeAttr::Slug => "Slug".into(),
            NativeAttr::Author => "Author".into(),
            NativeAttr::Status => "Status".into(),
            NativeAttr::Date => "Date".into(),
            NativeAttr::Modified => "Last Modified".into(),
            NativeAttr::Excerpt => "Excerpt".into(),
            NativeAttr::CommentCount => "Comments".into(),
            NativeAttr::MenuOrder => "Order".into(),
            NativeAttr::Parent => "Parent".into(),
            NativeAttr::FeaturedImage => "Featured Image".into(),
            NativeAttr::Permalink => "Permalink".into(),
            NativeAttr::Plan => "Membership Plan".into(),
            NativeAttr::Terms(taxonomy) => title_case(taxonomy),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        let (sortable, filterable, numeric_sort) = match self {
            NativeAttr::Id
            | NativeAttr::CommentCount
            | NativeAttr::MenuOrder
            | NativeAttr::Parent => {
                (true, false, true)
            }
            NativeAttr::Title | NativeAttr::Slug | NativeAttr::Date | NativeAttr::Modified => {
                (true, false, false)
            }
            NativeAttr::Author | NativeAttr::Status => (true, true, false),
            NativeAttr::Plan | NativeAttr::Terms(_) => (false, true, false),
            NativeAttr::Excerpt | NativeAttr::FeaturedImage | NativeAttr::Permalink => {
                (false, false, false)
            }
        };
        Capabilities {
            sortable,
            filterable,
            numeric_sort,
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, NativeAttr::Date | NativeAttr::Modified)
    }
}

/// Aggregates computed from entity data at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Computed {
    WordCount,
    /// Minutes at 200 words per minute, rounded up.
    ReadingTime,
    ChildCount,
}

impl Computed {
    pub const ALL: &'static [Computed] =
        &[Computed::WordCount, Computed::ReadingTime, Computed::ChildCount];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "word_count" => Some(Computed::WordCount),
            "reading_time" => Some(Computed::ReadingTime),
            "child_count" => Some(Computed::ChildCount),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Computed::WordCount => "word_count",
            Computed::ReadingTime => "reading_time",
            Computed::ChildCount => "child_count",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Computed::WordCount => "Word Count",
            Computed::ReadingTime => "Reading Time",
            Computed::ChildCount => "Children",
        }
    }
}

/// Parsed form of a column's `field_key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldRef {
    Native(NativeAttr),
    Stored(String),
    Computed(Computed),
}

impl FieldRef {
    /// Parses a raw field key. Returns `None` for blank keys.
    ///
    /// Sigil-prefixed names that are not recognized are kept as stored keys,
    /// verbatim, so they resolve to "field absent" rather than being lost.
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim();
        if key.is_empty() {
            return None;
        }

        if let Some(name) = key.strip_prefix(NATIVE_SIGIL) {
            if let Some(attr) = NativeAttr::from_name(name) {
                return Some(FieldRef::Native(attr));
            }
        }
        if let Some(name) = key.strip_prefix(COMPUTED_SIGIL) {
            if let Some(computed) = Computed::from_name(name) {
                return Some(FieldRef::Computed(computed));
            }
        }
        Some(FieldRef::Stored(key.to_string()))
    }

    /// Canonical key, the inverse of [`FieldRef::parse`].
    pub fn key(&self) -> String {
        match self {
            FieldRef::Native(attr) => format!("{}{}", NATIVE_SIGIL, attr.name()),
            FieldRef::Computed(c) => format!("{}{}", COMPUTED_SIGIL, c.name()),
            FieldRef::Stored(key) => key.clone(),
        }
    }

    pub fn is_title(&self) -> bool {
        matches!(self, FieldRef::Native(NativeAttr::Title))
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_native_keys() {
        assert_eq!(FieldRef::parse("@title"), Some(FieldRef::Native(NativeAttr::Title)));
        assert_eq!(
            FieldRef::parse("@tax:genre"),
            Some(FieldRef::Native(NativeAttr::Terms("genre".into())))
        );
    }

    #[test]
    fn parse_computed_keys() {
        assert_eq!(
            FieldRef::parse("#word_count"),
            Some(FieldRef::Computed(Computed::WordCount))
        );
    }

    #[test]
    fn parse_stored_and_blank_keys() {
        assert_eq!(FieldRef::parse(" price "), Some(FieldRef::Stored("price".into())));
        assert_eq!(FieldRef::parse(""), None);
        assert_eq!(FieldRef::parse("   "), None);
    }

    #[test]
    fn unknown_sigil_names_stay_stored() {
        assert_eq!(FieldRef::parse("@nope"), Some(FieldRef::Stored("@nope".into())));
        assert_eq!(FieldRef::parse("@tax:"), Some(FieldRef::Stored("@tax:".into())));
        assert_eq!(FieldRef::parse("#nope"), Some(FieldRef::Stored("#nope".into())));
    }

    #[test]
    fn key_round_trips_through_parse() {
        let refs = vec![
            FieldRef::Native(NativeAttr::CommentCount),
            FieldRef::Native(NativeAttr::Terms("venue_type".into())),
            FieldRef::Computed(Computed::ReadingTime),
            FieldRef::Stored("price".into()),
        ];
        for r in refs {
            assert_eq!(FieldRef::parse(&r.key()), Some(r.clone()));
        }
    }

    #[test]
    fn every_fixed_attr_parses_from_its_name() {
        for attr in NativeAttr::FIXED {
            assert_eq!(NativeAttr::from_name(&attr.name()).as_ref(), Some(attr));
        }
    }

    #[test]
    fn taxonomy_label_is_title_cased() {
        assert_eq!(NativeAttr::Terms("venue_type".into()).label(), "Venue Type");
    }
}
