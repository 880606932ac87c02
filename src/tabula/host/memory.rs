use super::{
    decode_structured, scalar_strings, Attachment, DataSource, Entity, EntityId, FieldDefinition,
    FieldProvider, HostContext, ScopeInfo, Term, User, PLAN_META_KEY, STORAGE_DATETIME_FORMAT,
};
use crate::error::Result;
use crate::fields::NativeAttr;
use crate::model::{Scope, SortOrder};
use crate::query::{parse_number, Ordering, Predicate, QueryDescriptor, RawClause, Relation, Target};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Serialized form of a [`MemoryHost`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostFixture {
    #[serde(default)]
    pub scopes: Vec<ScopeInfo>,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub terms: Vec<Term>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Field catalogue per scope name.
    #[serde(default)]
    pub fields: BTreeMap<String, Vec<FieldDefinition>>,
}

/// In-process host: holds all content in memory and evaluates query descriptors.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    data: HostFixture,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(data: HostFixture) -> Self {
        Self { data }
    }

    /// Loads a host from a JSON fixture file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let data: HostFixture = serde_json::from_str(&content)?;
        Ok(Self::from_fixture(data))
    }

    pub fn fixture(&self) -> &HostFixture {
        &self.data
    }

    /// Collaborators backed by this host, with its field catalogue attached.
    pub fn context(&self) -> HostContext<'_> {
        HostContext::new(self).with_fields(self)
    }

    pub fn add_scope(&mut self, scope: &str, label: &str, taxonomies: &[&str]) -> &mut Self {
        self.data.scopes.push(ScopeInfo {
            scope: Scope::from(scope),
            label: label.to_string(),
            taxonomies: taxonomies.iter().map(|t| t.to_string()).collect(),
        });
        self
    }

    pub fn add_entity(&mut self, entity: Entity) -> &mut Self {
        self.data.entities.retain(|e| e.id != entity.id);
        self.data.entities.push(entity);
        self
    }

    pub fn add_user(&mut self, user: User) -> &mut Self {
        self.data.users.push(user);
        self
    }

    pub fn add_term(&mut self, term: Term) -> &mut Self {
        self.data.terms.push(term);
        self
    }

    pub fn add_attachment(&mut self, attachment: Attachment) -> &mut Self {
        self.data.attachments.push(attachment);
        self
    }

    pub fn add_field(&mut self, scope: &str, field: FieldDefinition) -> &mut Self {
        self.data
            .fields
            .entry(scope.to_string())
            .or_default()
            .push(field);
        self
    }

    fn in_scope<'s>(&'s self, scope: &'s Scope) -> impl Iterator<Item = &'s Entity> + 's {
        self.data.entities.iter().filter(move |e| &e.scope == scope)
    }

    fn attribute_values(&self, entity: &Entity, attr: &NativeAttr) -> Vec<String> {
        let datetime = |d: &Option<chrono::NaiveDateTime>| {
            d.map(|d| d.format(STORAGE_DATETIME_FORMAT).to_string())
        };
        let single = |s: String| vec![s];
        match attr {
            NativeAttr::Id => single(entity.id.to_string()),
            NativeAttr::Title => single(entity.title.clone()),
            NativeAttr::Slug => single(entity.slug.clone()),
            NativeAttr::Author => entity.author.map(|a| a.to_string()).into_iter().collect(),
            NativeAttr::Status => single(entity.status.clone()),
            NativeAttr::Date => datetime(&entity.date).into_iter().collect(),
            NativeAttr::Modified => datetime(&entity.modified).into_iter().collect(),
            NativeAttr::Excerpt => single(entity.excerpt.clone()),
            NativeAttr::CommentCount => single(entity.comment_count.to_string()),
            NativeAttr::MenuOrder => single(entity.menu_order.to_string()),
            NativeAttr::Parent => entity.parent.map(|p| p.to_string()).into_iter().collect(),
            NativeAttr::FeaturedImage => entity
                .featured_image
                .map(|i| i.to_string())
                .into_iter()
                .collect(),
            NativeAttr::Permalink => single(entity.permalink.clone()),
            NativeAttr::Plan => entity.meta(PLAN_META_KEY).map(scalar_strings).unwrap_or_default(),
            NativeAttr::Terms(taxonomy) => {
                let ids = entity.terms.get(taxonomy).cloned().unwrap_or_default();
                let mut out: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
                out.extend(ids.iter().filter_map(|id| self.term(*id)).map(|t| t.name));
                out
            }
        }
    }

    fn target_values(&self, entity: &Entity, target: &Target) -> Vec<String> {
        match target {
            Target::Attribute(attr) => self.attribute_values(entity, attr),
            Target::Meta(key) => entity.meta(key).map(scalar_strings).unwrap_or_default(),
        }
    }

    fn matches(&self, entity: &Entity, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::Status(status) => entity.status == *status,
            Predicate::Author(id) => entity.author == Some(*id),
            Predicate::Term { taxonomy, term_id } => entity
                .terms
                .get(taxonomy)
                .is_some_and(|ids| ids.contains(term_id)),
            Predicate::Compare {
                target,
                op,
                value,
                numeric,
            } => op.evaluate(&self.target_values(entity, target), value, *numeric),
        }
    }

    fn compare(
        &self,
        a: &Entity,
        b: &Entity,
        ordering: &Ordering,
        raw: Option<&RawClause>,
    ) -> CmpOrdering {
        let base = match ordering {
            Ordering::Title(_) => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            Ordering::Native { attr, .. } => compare_native(a, b, attr),
            Ordering::Meta { key, numeric, .. } => {
                let first = |e: &Entity| {
                    e.meta(key)
                        .map(scalar_strings)
                        .and_then(|v| v.into_iter().next())
                };
                if *numeric {
                    compare_numbers(
                        first(a).as_deref().and_then(parse_number),
                        first(b).as_deref().and_then(parse_number),
                    )
                } else {
                    let text = |e: &Entity| first(e).unwrap_or_default().to_lowercase();
                    text(a).cmp(&text(b))
                }
            }
            Ordering::Raw(_) => match raw {
                Some(raw) => {
                    let amount = |e: &Entity| {
                        e.meta(&raw.meta_key)
                            .map(decode_structured)
                            .and_then(|v| raw.extract(&v))
                    };
                    compare_numbers(amount(a), amount(b))
                }
                None => CmpOrdering::Equal,
            },
        };
        match ordering.order() {
            SortOrder::Asc => base,
            SortOrder::Desc => base.reverse(),
        }
    }
}

fn compare_native(a: &Entity, b: &Entity, attr: &NativeAttr) -> CmpOrdering {
    match attr {
        NativeAttr::Id => a.id.cmp(&b.id),
        NativeAttr::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        NativeAttr::Slug => a.slug.cmp(&b.slug),
        NativeAttr::Author => a.author.cmp(&b.author),
        NativeAttr::Status => a.status.cmp(&b.status),
        NativeAttr::Date => a.date.cmp(&b.date),
        NativeAttr::Modified => a.modified.cmp(&b.modified),
        NativeAttr::CommentCount => a.comment_count.cmp(&b.comment_count),
        NativeAttr::MenuOrder => a.menu_order.cmp(&b.menu_order),
        NativeAttr::Parent => a.parent.cmp(&b.parent),
        NativeAttr::Excerpt
        | NativeAttr::FeaturedImage
        | NativeAttr::Permalink
        | NativeAttr::Plan
        | NativeAttr::Terms(_) => CmpOrdering::Equal,
    }
}

/// Missing values sort before present ones, like SQL NULLs in ascending order.
fn compare_numbers(a: Option<f64>, b: Option<f64>) -> CmpOrdering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(CmpOrdering::Equal),
        (None, Some(_)) => CmpOrdering::Less,
        (Some(_), None) => CmpOrdering::Greater,
        (None, None) => CmpOrdering::Equal,
    }
}

impl DataSource for MemoryHost {
    fn scopes(&self) -> Vec<ScopeInfo> {
        self.data.scopes.clone()
    }

    fn entity(&self, id: EntityId) -> Option<Entity> {
        self.data.entities.iter().find(|e| e.id == id).cloned()
    }

    fn user(&self, id: u64) -> Option<User> {
        self.data.users.iter().find(|u| u.id == id).cloned()
    }

    fn term(&self, id: u64) -> Option<Term> {
        self.data.terms.iter().find(|t| t.id == id).cloned()
    }

    fn attachment(&self, id: u64) -> Option<Attachment> {
        self.data.attachments.iter().find(|a| a.id == id).cloned()
    }

    fn child_count(&self, id: EntityId) -> u64 {
        self.data
            .entities
            .iter()
            .filter(|e| e.parent == Some(id))
            .count() as u64
    }

    fn meta_keys(&self, scope: &Scope) -> Vec<String> {
        let keys: BTreeSet<&String> = self.in_scope(scope).flat_map(|e| e.meta.keys()).collect();
        keys.into_iter().cloned().collect()
    }

    fn query(&self, query: &QueryDescriptor) -> Vec<EntityId> {
        let mut rows: Vec<&Entity> = self
            .in_scope(&query.scope)
            .filter(|e| match query.relation {
                _ if query.predicates.is_empty() => true,
                Relation::And => query.predicates.iter().all(|p| self.matches(e, p)),
                Relation::Or => query.predicates.iter().any(|p| self.matches(e, p)),
            })
            .collect();

        match &query.order {
            Some(ordering) => rows.sort_by(|a, b| {
                self.compare(a, b, ordering, query.raw.as_ref())
                    .then_with(|| a.id.cmp(&b.id))
            }),
            None => rows.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id))),
        }

        rows.into_iter().map(|e| e.id).collect()
    }

    fn distinct_values(&self, scope: &Scope, target: &Target) -> Vec<String> {
        let mut values = BTreeSet::new();
        for entity in self.in_scope(scope) {
            let found: Vec<String> = match target {
                Target::Attribute(NativeAttr::Terms(taxonomy)) => entity
                    .terms
                    .get(taxonomy)
                    .map(|ids| ids.iter().map(|id| id.to_string()).collect())
                    .unwrap_or_default(),
                other => self.target_values(entity, other),
            };
            values.extend(found.into_iter().filter(|v| !v.trim().is_empty()));
        }
        values.into_iter().collect()
    }
}

impl FieldProvider for MemoryHost {
    fn fields(&self, scope: &Scope) -> Vec<FieldDefinition> {
        self.data
            .fields
            .get(scope.as_str())
            .cloned()
            .unwrap_or_default()
    }
}
