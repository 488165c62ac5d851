//! Cache tag hierarchy.
//!
//! Tags exist purely for bulk invalidation. They form a one-to-three level
//! hierarchy from coarsest to finest: `{context}`, `{context}:{category}`,
//! `{context}:{entity}:{id}`. List and aggregate entries carry the first
//! two levels; single-entity entries carry all three, so invalidating any
//! one tag removes every entry that carries it.
//!
//! By convention the category noun is plural and the entity noun singular:
//! a bowler list is tagged `website:bowlers` while bowler `123`'s entries
//! also carry `website:bowler:123`.

use std::fmt;

use crate::keys::CONTEXT_WEBSITE;

const CATEGORY_DOCS: &str = "docs";
const ENTITY_DOC: &str = "doc";
const CATEGORY_BOWLERS: &str = "bowlers";
const ENTITY_BOWLER: &str = "bowler";
const CATEGORY_TOURNAMENTS: &str = "tournaments";
const ENTITY_TOURNAMENT: &str = "tournament";
const CATEGORY_AWARDS: &str = "awards";
const ENTITY_AWARD: &str = "award";
const CATEGORY_JOBS: &str = "jobs";
const ENTITY_JOB: &str = "job";

/// A bulk-invalidation label attached to cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(String);

impl Tag {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Coarsest level: every entry in a context.
pub fn context_tag(context: &str) -> Tag {
    Tag(context.to_string())
}

/// Middle level: every entry in a category.
pub fn category_tag(context: &str, category: &str) -> Tag {
    Tag(format!("{context}:{category}"))
}

/// Finest level: one entity's entries.
pub fn entity_tag(context: &str, entity: &str, id: &str) -> Tag {
    Tag(format!("{context}:{entity}:{id}"))
}

/// Tags for list and aggregate entries: `[context, context:category]`.
pub fn category_tags(context: &str, category: &str) -> Vec<Tag> {
    vec![context_tag(context), category_tag(context, category)]
}

/// Tags for a single entity's entries, coarsest first.
pub fn entity_tags(context: &str, category: &str, id: &str) -> Vec<Tag> {
    vec![
        context_tag(context),
        category_tag(context, category),
        entity_tag(context, category, id),
    ]
}

fn website_hierarchy(category: &'static str, entity: &'static str, id: &str) -> Vec<Tag> {
    vec![
        context_tag(CONTEXT_WEBSITE),
        category_tag(CONTEXT_WEBSITE, category),
        entity_tag(CONTEXT_WEBSITE, entity, id),
    ]
}

/// Tags for one document's entries.
pub fn doc_tags(slug: &str) -> Vec<Tag> {
    website_hierarchy(CATEGORY_DOCS, ENTITY_DOC, slug)
}

/// Tags for document list entries.
pub fn docs_tags() -> Vec<Tag> {
    category_tags(CONTEXT_WEBSITE, CATEGORY_DOCS)
}

/// Tags for one bowler's entries.
pub fn bowler_tags(bowler_id: &str) -> Vec<Tag> {
    website_hierarchy(CATEGORY_BOWLERS, ENTITY_BOWLER, bowler_id)
}

/// Tags for bowler list entries.
pub fn bowlers_tags() -> Vec<Tag> {
    category_tags(CONTEXT_WEBSITE, CATEGORY_BOWLERS)
}

/// Tags for one tournament's entries.
pub fn tournament_tags(tournament_id: &str) -> Vec<Tag> {
    website_hierarchy(CATEGORY_TOURNAMENTS, ENTITY_TOURNAMENT, tournament_id)
}

/// Tags for tournament list entries.
pub fn tournaments_tags() -> Vec<Tag> {
    category_tags(CONTEXT_WEBSITE, CATEGORY_TOURNAMENTS)
}

/// Tags for one award's entries.
pub fn award_tags(award_id: &str) -> Vec<Tag> {
    website_hierarchy(CATEGORY_AWARDS, ENTITY_AWARD, award_id)
}

/// Tags for award list entries.
pub fn awards_tags() -> Vec<Tag> {
    category_tags(CONTEXT_WEBSITE, CATEGORY_AWARDS)
}

/// Tags for one job's entries.
pub fn job_tags(job: &str) -> Vec<Tag> {
    website_hierarchy(CATEGORY_JOBS, ENTITY_JOB, job)
}

/// Tags for job list entries.
pub fn jobs_tags() -> Vec<Tag> {
    category_tags(CONTEXT_WEBSITE, CATEGORY_JOBS)
}

pub(crate) mod nouns {
    //! Category/entity noun pairs for modules that map domain changes to
    //! tag levels.

    pub(crate) const DOCS: (&str, &str) = (super::CATEGORY_DOCS, super::ENTITY_DOC);
    pub(crate) const BOWLERS: (&str, &str) = (super::CATEGORY_BOWLERS, super::ENTITY_BOWLER);
    pub(crate) const TOURNAMENTS: (&str, &str) =
        (super::CATEGORY_TOURNAMENTS, super::ENTITY_TOURNAMENT);
    pub(crate) const AWARDS: (&str, &str) = (super::CATEGORY_AWARDS, super::ENTITY_AWARD);
    pub(crate) const JOBS: (&str, &str) = (super::CATEGORY_JOBS, super::ENTITY_JOB);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(tags: &[Tag]) -> Vec<&str> {
        tags.iter().map(Tag::as_str).collect()
    }

    #[test]
    fn bowler_hierarchy_is_coarsest_first() {
        assert_eq!(
            raw(&bowler_tags("123")),
            vec!["website", "website:bowlers", "website:bowler:123"]
        );
    }

    #[test]
    fn list_tags_omit_the_entity_level() {
        assert_eq!(raw(&bowlers_tags()), vec!["website", "website:bowlers"]);
        assert_eq!(raw(&docs_tags()), vec!["website", "website:docs"]);
    }

    #[test]
    fn generic_entity_tags_follow_the_formula() {
        assert_eq!(
            raw(&entity_tags("api", "sessions", "abc")),
            vec!["api", "api:sessions", "api:sessions:abc"]
        );
    }

    #[test]
    fn every_domain_builder_shares_the_context_level() {
        for tags in [
            doc_tags("about"),
            bowler_tags("1"),
            tournament_tags("t1"),
            award_tags("a1"),
            job_tags("render"),
        ] {
            assert_eq!(tags[0].as_str(), "website");
            assert_eq!(tags.len(), 3);
        }
    }

    #[test]
    fn entity_level_uses_the_singular_noun() {
        assert_eq!(tournament_tags("9")[2].as_str(), "website:tournament:9");
        assert_eq!(job_tags("render")[2].as_str(), "website:job:render");
    }
}
