//! Descriptor-driven field extraction: one matched container node in, one
//! [`JobRecord`] out.

use crate::dom::{Document, NodeId};
use crate::models::{JobRecord, SearchQuery, job_id, local_timestamp};
use crate::select::{Selector, first_match};
use crate::site::SiteDescriptor;
use crate::text::{clean_text, extract_attr, extract_text};
use crate::urls::normalize_url;

/// Curated skill vocabulary matched against descriptions when a board has
/// no dedicated skills element. Lowercase; matching is case-insensitive
/// substring.
pub const SKILL_VOCABULARY: &[&str] = &[
    "python",
    "java",
    "javascript",
    "typescript",
    "rust",
    "c++",
    "c#",
    "golang",
    "ruby",
    "php",
    "swift",
    "kotlin",
    "scala",
    "sql",
    "nosql",
    "postgresql",
    "mysql",
    "mongodb",
    "redis",
    "react",
    "angular",
    "vue",
    "node.js",
    "django",
    "flask",
    "spring",
    ".net",
    "aws",
    "azure",
    "gcp",
    "docker",
    "kubernetes",
    "terraform",
    "ansible",
    "jenkins",
    "git",
    "ci/cd",
    "linux",
    "bash",
    "machine learning",
    "deep learning",
    "tensorflow",
    "pytorch",
    "spark",
    "kafka",
    "graphql",
    "rest api",
    "microservices",
    "agile",
    "scrum",
];

/// Extract one record from a container subtree.
///
/// First selector match wins for every field (document order). Returns
/// `None` when the container has no title — boards pad result lists with
/// ad and teaser cards, so this is routine, not an error — or when a
/// keyword filter rejects the record.
pub fn extract_record(
    doc: &Document,
    container: NodeId,
    site: &SiteDescriptor,
    query: &SearchQuery,
) -> Option<JobRecord> {
    let fields = &site.fields;

    let title_node = fields
        .title
        .as_ref()
        .and_then(|sel| first_match(doc, container, sel));
    let title = title_node
        .map(|id| clean_text(&extract_text(doc, id)))
        .unwrap_or_default();
    if title.is_empty() {
        return None;
    }

    let company = field_text(doc, container, &fields.company).unwrap_or_default();
    let location = field_text(doc, container, &fields.location)
        .unwrap_or_else(|| query.location.clone());
    let description = field_text(doc, container, &fields.description).unwrap_or_default();
    let posted_date = field_text(doc, container, &fields.date);

    // URL discovery: a dedicated url selector wins, else the title element
    // (itself a link, or its first descendant link), else the container.
    let url = fields
        .url
        .as_ref()
        .and_then(|sel| first_match(doc, container, sel))
        .and_then(|id| discover_url(doc, id, &site.base_url))
        .or_else(|| title_node.and_then(|id| discover_url(doc, id, &site.base_url)))
        .or_else(|| discover_url(doc, container, &site.base_url));
    let source = url.unwrap_or_else(|| site.name.clone());

    let skills = match field_text(doc, container, &fields.skills) {
        Some(text) => skills_from_list(&text),
        None => skills_from_description(&description),
    };

    if !passes_keyword_filter(&title, &description, &query.keywords) {
        tracing::debug!(site = %site.name, title = %title, "record dropped by keyword filter");
        return None;
    }

    Some(JobRecord {
        job_id: job_id(&site.name, &title, &company),
        title,
        company,
        location,
        description,
        source,
        scraped_at: local_timestamp(),
        posted_date,
        skills,
    })
}

/// Cleaned text of the first match for an optional field selector.
fn field_text(doc: &Document, scope: NodeId, selector: &Option<Selector>) -> Option<String> {
    let sel = selector.as_ref()?;
    let node = first_match(doc, scope, sel)?;
    let text = clean_text(&extract_text(doc, node));
    if text.is_empty() { None } else { Some(text) }
}

/// The node's own `href`, else its first descendant link's `href`,
/// normalized against the site's base URL.
fn discover_url(doc: &Document, id: NodeId, base_url: &str) -> Option<String> {
    let href = extract_attr(doc, id, "href");
    if !href.is_empty() {
        return Some(normalize_url(&href, base_url));
    }
    let anchor = first_match(doc, id, &Selector::new("a", ""))?;
    let href = extract_attr(doc, anchor, "href");
    if href.is_empty() {
        None
    } else {
        Some(normalize_url(&href, base_url))
    }
}

/// Tokenize a dedicated skills element: comma-separated, trimmed, empties
/// dropped.
pub fn skills_from_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Match the curated vocabulary against a description. First-seen order,
/// duplicates collapsed by the vocabulary itself being a set.
pub fn skills_from_description(description: &str) -> Vec<String> {
    if description.is_empty() {
        return Vec::new();
    }
    let haystack = description.to_lowercase();
    SKILL_VOCABULARY
        .iter()
        .filter(|skill| haystack.contains(*skill))
        .map(|skill| (*skill).to_string())
        .collect()
}

fn passes_keyword_filter(title: &str, description: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let title = title.to_lowercase();
    let description = description.to_lowercase();
    keywords.iter().any(|kw| {
        let kw = kw.to_lowercase();
        title.contains(&kw) || description.contains(&kw)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::select;
    use crate::site::{FieldSelectors, default_sites};

    fn test_site() -> SiteDescriptor {
        let mut site = default_sites().remove(2); // Dice as a template
        site.name = "TestBoard".to_string();
        site.base_url = "https://jobs.example.com".to_string();
        site.fields = FieldSelectors {
            container: Selector::new("div", "job"),
            title: Some(Selector::new("h2", "title")),
            company: Some(Selector::new("span", "company")),
            location: Some(Selector::new("span", "loc")),
            description: Some(Selector::new("div", "desc")),
            url: None,
            date: Some(Selector::new("time", "")),
            skills: Some(Selector::new("div", "skills")),
        };
        site
    }

    fn container(doc: &Document, site: &SiteDescriptor) -> NodeId {
        first_match(doc, doc.root(), &site.fields.container).unwrap()
    }

    #[test]
    fn extracts_title_company_and_link() {
        let site = test_site();
        let doc = Document::parse(concat!(
            r#"<div class="job">"#,
            r#"<h2 class="title"><a href="/jobs/42">Engineer</a></h2>"#,
            r#"<span class="company">Acme</span>"#,
            r#"</div>"#,
        ))
        .unwrap();

        let rec = extract_record(&doc, container(&doc, &site), &site, &SearchQuery::default())
            .expect("record");
        assert_eq!(rec.title, "Engineer");
        assert_eq!(rec.company, "Acme");
        assert_eq!(rec.source, "https://jobs.example.com/jobs/42");
        assert!(!rec.job_id.is_empty());
    }

    #[test]
    fn empty_title_container_is_skipped_silently() {
        let site = test_site();
        let doc = Document::parse(r#"<div class="job"><span class="company">Acme</span></div>"#)
            .unwrap();
        assert!(
            extract_record(&doc, container(&doc, &site), &site, &SearchQuery::default()).is_none()
        );
    }

    #[test]
    fn location_falls_back_to_search_location() {
        let site = test_site();
        let doc =
            Document::parse(r#"<div class="job"><h2 class="title">Dev</h2></div>"#).unwrap();
        let query = SearchQuery {
            location: "Berlin".to_string(),
            ..SearchQuery::default()
        };
        let rec = extract_record(&doc, container(&doc, &site), &site, &query).unwrap();
        assert_eq!(rec.location, "Berlin");
    }

    #[test]
    fn source_defaults_to_site_name_without_links() {
        let site = test_site();
        let doc =
            Document::parse(r#"<div class="job"><h2 class="title">Dev</h2></div>"#).unwrap();
        let rec =
            extract_record(&doc, container(&doc, &site), &site, &SearchQuery::default()).unwrap();
        assert_eq!(rec.source, "TestBoard");
    }

    #[test]
    fn dedicated_skills_selector_is_tokenized() {
        let site = test_site();
        let doc = Document::parse(concat!(
            r#"<div class="job"><h2 class="title">Dev</h2>"#,
            r#"<div class="skills"> Rust , Tokio ,, SQL </div></div>"#,
        ))
        .unwrap();
        let rec =
            extract_record(&doc, container(&doc, &site), &site, &SearchQuery::default()).unwrap();
        assert_eq!(rec.skills, vec!["Rust", "Tokio", "SQL"]);
    }

    #[test]
    fn skills_fall_back_to_description_vocabulary() {
        let site = test_site();
        let doc = Document::parse(concat!(
            r#"<div class="job"><h2 class="title">Dev</h2>"#,
            r#"<div class="desc">We use Python, Docker and Kubernetes daily.</div></div>"#,
        ))
        .unwrap();
        let rec =
            extract_record(&doc, container(&doc, &site), &site, &SearchQuery::default()).unwrap();
        assert_eq!(rec.skills, vec!["python", "docker", "kubernetes"]);
    }

    #[test]
    fn keyword_filter_drops_non_matching_records() {
        let site = test_site();
        let doc = Document::parse(concat!(
            r#"<div class="job"><h2 class="title">Backend Developer</h2>"#,
            r#"<div class="desc">We need a Java developer</div></div>"#,
        ))
        .unwrap();
        let query = SearchQuery {
            keywords: vec!["python".to_string()],
            ..SearchQuery::default()
        };
        assert!(extract_record(&doc, container(&doc, &site), &site, &query).is_none());
    }

    #[test]
    fn keyword_filter_matches_case_insensitively_in_title() {
        let site = test_site();
        let doc = Document::parse(
            r#"<div class="job"><h2 class="title">Senior PYTHON Engineer</h2></div>"#,
        )
        .unwrap();
        let query = SearchQuery {
            keywords: vec!["python".to_string()],
            ..SearchQuery::default()
        };
        assert!(extract_record(&doc, container(&doc, &site), &site, &query).is_some());
    }

    #[test]
    fn first_match_wins_for_every_field() {
        let site = test_site();
        let doc = Document::parse(concat!(
            r#"<div class="job">"#,
            r#"<h2 class="title">First</h2><h2 class="title">Second</h2>"#,
            r#"</div>"#,
        ))
        .unwrap();
        let rec =
            extract_record(&doc, container(&doc, &site), &site, &SearchQuery::default()).unwrap();
        assert_eq!(rec.title, "First");
    }

    #[test]
    fn title_link_discovery_prefers_own_href() {
        let mut site = test_site();
        site.fields.title = Some(Selector::new("a", "title"));
        let doc = Document::parse(concat!(
            r#"<div class="job">"#,
            r#"<a class="title" href="/direct">Dev</a>"#,
            r#"</div>"#,
        ))
        .unwrap();
        let rec =
            extract_record(&doc, container(&doc, &site), &site, &SearchQuery::default()).unwrap();
        assert_eq!(rec.source, "https://jobs.example.com/direct");
    }

    #[test]
    fn posted_date_is_captured_when_present() {
        let site = test_site();
        let doc = Document::parse(concat!(
            r#"<div class="job"><h2 class="title">Dev</h2>"#,
            r#"<time datetime="2025-06-01">2 days ago</time></div>"#,
        ))
        .unwrap();
        let rec =
            extract_record(&doc, container(&doc, &site), &site, &SearchQuery::default()).unwrap();
        assert_eq!(rec.posted_date.as_deref(), Some("2 days ago"));
    }

    #[test]
    fn nested_containers_each_extract() {
        let site = test_site();
        let doc = Document::parse(concat!(
            r#"<div class="job"><h2 class="title">Outer</h2>"#,
            r#"<div class="job"><h2 class="title">Inner</h2></div>"#,
            r#"</div>"#,
        ))
        .unwrap();
        let titles: Vec<_> = select(&doc, doc.root(), &site.fields.container)
            .filter_map(|c| extract_record(&doc, c, &site, &SearchQuery::default()))
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["Outer", "Inner"]);
    }

    #[test]
    fn skills_list_tokenizer_drops_empties() {
        assert_eq!(skills_from_list("a, b ,, c,"), vec!["a", "b", "c"]);
        assert!(skills_from_list("  ,  ").is_empty());
    }
}
