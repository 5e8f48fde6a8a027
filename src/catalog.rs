//! Chapter catalog: the ordered list of chapters that make up the book
//!
//! The catalog is loaded once at startup and never mutated. Ordering is
//! significant: it defines prev/next adjacency and the order in which the
//! sidebar renders groups.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::fs;

/// Metadata for one navigable chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterDescriptor {
    /// URL-safe slug, unique within the catalog
    pub id: String,
    /// Display title
    pub title: String,
    /// Part name used for sidebar grouping
    pub part: String,
}

/// A part name plus the chapters belonging to it, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterGroup {
    pub part: String,
    pub chapters: Vec<ChapterDescriptor>,
}

/// The immutable, ordered chapter list.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    chapters: Vec<ChapterDescriptor>,
}

impl Catalog {
    pub fn new(chapters: Vec<ChapterDescriptor>) -> Self {
        Self { chapters }
    }

    /// The built-in catalog for the Deep Learning & Transformers book.
    pub fn builtin() -> Self {
        let chapters = BUILTIN_CHAPTERS
            .iter()
            .map(|(id, title, part)| ChapterDescriptor {
                id: (*id).to_string(),
                title: (*title).to_string(),
                part: (*part).to_string(),
            })
            .collect();
        Self { chapters }
    }

    /// Load a catalog from a JSON file (array of `{id, title, part}`).
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, CatalogLoadFailure> {
        let data = fs::read_to_string(path)
            .map_err(|e| CatalogLoadFailure::Io(path.to_string(), e.to_string()))?;
        let chapters: Vec<ChapterDescriptor> =
            serde_json::from_str(&data).map_err(|e| CatalogLoadFailure::Parse(e.to_string()))?;
        Ok(Self { chapters })
    }

    /// Fetch the catalog from the server's `/api/chapters` endpoint.
    ///
    /// Single attempt, no retry. On failure the caller degrades to an empty
    /// sidebar with a visible error state.
    pub async fn fetch(client: &reqwest::Client, base_url: &str) -> Result<Self, CatalogLoadFailure> {
        let url = format!("{}/api/chapters", base_url.trim_end_matches('/'));
        let resp = client
            .get(&url)
            .send()
            .await
            .map_err(|e| CatalogLoadFailure::Io(url.clone(), e.to_string()))?;
        if !resp.status().is_success() {
            return Err(CatalogLoadFailure::Io(url, resp.status().to_string()));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| CatalogLoadFailure::Io(url, e.to_string()))?;
        let chapters: Vec<ChapterDescriptor> =
            serde_json::from_str(&body).map_err(|e| CatalogLoadFailure::Parse(e.to_string()))?;
        Ok(Self { chapters })
    }

    pub fn list(&self) -> &[ChapterDescriptor] {
        &self.chapters
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ChapterDescriptor> {
        self.chapters.get(index)
    }

    /// Position of a chapter id in catalog order.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.chapters.iter().position(|c| c.id == id)
    }
}

/// Failure fetching or parsing the chapter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogLoadFailure {
    /// Source and underlying error text
    Io(String, String),
    Parse(String),
}

impl std::fmt::Display for CatalogLoadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogLoadFailure::Io(src, e) => write!(f, "failed to load catalog from {src}: {e}"),
            CatalogLoadFailure::Parse(e) => write!(f, "failed to parse catalog: {e}"),
        }
    }
}

impl std::error::Error for CatalogLoadFailure {}

/// Whether a chapter id is a URL-safe slug: ASCII alphanumerics, `_`, `-`.
/// Anything else (path separators, `..`, percent escapes) is rejected before
/// the id ever reaches the filesystem.
pub fn is_valid_slug(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Group chapters by part, preserving first-occurrence order of parts and
/// the original ordering within each part. Stable grouping, not sorted.
pub fn group_by_part(chapters: &[ChapterDescriptor]) -> Vec<ChapterGroup> {
    let mut groups: Vec<ChapterGroup> = Vec::new();
    for chapter in chapters {
        match groups.iter_mut().find(|g| g.part == chapter.part) {
            Some(group) => group.chapters.push(chapter.clone()),
            None => groups.push(ChapterGroup {
                part: chapter.part.clone(),
                chapters: vec![chapter.clone()],
            }),
        }
    }
    groups
}

const BUILTIN_CHAPTERS: &[(&str, &str, &str)] = &[
    ("preface", "Preface", "Front Matter"),
    ("notation", "Notation and Conventions", "Front Matter"),
    (
        "chapter01_linear_algebra",
        "Chapter 1: Linear Algebra for Deep Learning",
        "Part I: Mathematical Foundations",
    ),
    (
        "chapter02_calculus_optimization",
        "Chapter 2: Calculus and Optimization",
        "Part I: Mathematical Foundations",
    ),
    (
        "chapter03_probability_information",
        "Chapter 3: Probability and Information Theory",
        "Part I: Mathematical Foundations",
    ),
    (
        "chapter04_feedforward_networks",
        "Chapter 4: Feed-Forward Neural Networks",
        "Part II: Neural Network Fundamentals",
    ),
    (
        "chapter05_convolutional_networks",
        "Chapter 5: Convolutional Neural Networks",
        "Part II: Neural Network Fundamentals",
    ),
    (
        "chapter06_recurrent_networks",
        "Chapter 6: Recurrent Neural Networks",
        "Part II: Neural Network Fundamentals",
    ),
    (
        "chapter07_attention_fundamentals",
        "Chapter 7: Attention Mechanisms: Fundamentals",
        "Part III: Attention Mechanisms",
    ),
    (
        "chapter08_self_attention",
        "Chapter 8: Self-Attention and Multi-Head Attention",
        "Part III: Attention Mechanisms",
    ),
    (
        "chapter09_attention_variants",
        "Chapter 9: Attention Variants and Mechanisms",
        "Part III: Attention Mechanisms",
    ),
    (
        "chapter10_transformer_model",
        "Chapter 10: The Transformer Model",
        "Part IV: Transformer Architecture",
    ),
    (
        "chapter11_training_transformers",
        "Chapter 11: Training Transformers",
        "Part IV: Transformer Architecture",
    ),
    (
        "chapter12_computational_analysis",
        "Chapter 12: Computational Analysis",
        "Part IV: Transformer Architecture",
    ),
    (
        "chapter13_bert",
        "Chapter 13: BERT",
        "Part V: Modern Transformer Variants",
    ),
    (
        "chapter14_gpt",
        "Chapter 14: GPT",
        "Part V: Modern Transformer Variants",
    ),
    (
        "chapter15_t5_bart",
        "Chapter 15: T5 and BART",
        "Part V: Modern Transformer Variants",
    ),
    (
        "chapter16_efficient_transformers",
        "Chapter 16: Efficient Transformers",
        "Part V: Modern Transformer Variants",
    ),
    (
        "chapter17_vision_transformers",
        "Chapter 17: Vision Transformers",
        "Part VI: Advanced Topics",
    ),
    (
        "chapter18_multimodal_transformers",
        "Chapter 18: Multimodal Transformers",
        "Part VI: Advanced Topics",
    ),
    (
        "chapter19_long_context",
        "Chapter 19: Long Context Handling",
        "Part VI: Advanced Topics",
    ),
    (
        "chapter20_pretraining_strategies",
        "Chapter 20: Pretraining Strategies",
        "Part VI: Advanced Topics",
    ),
    (
        "chapter21_pytorch_implementation",
        "Chapter 21: PyTorch Implementation",
        "Part VII: Practical Implementation",
    ),
    (
        "chapter22_hardware_optimization",
        "Chapter 22: From PyTorch to Accelerator Silicon",
        "Part VII: Practical Implementation",
    ),
    (
        "chapter23_best_practices",
        "Chapter 23: Best Practices",
        "Part VII: Practical Implementation",
    ),
    (
        "chapter24_domain_specific_models",
        "Chapter 24: Domain-Specific Models",
        "Part VIII: Domain Applications",
    ),
    (
        "chapter25_enterprise_nlp",
        "Chapter 25: Enterprise NLP",
        "Part VIII: Domain Applications",
    ),
    (
        "chapter26_code_language",
        "Chapter 26: Code and Language Models",
        "Part VIII: Domain Applications",
    ),
    (
        "chapter27_video_visual",
        "Chapter 27: Video and Visual Understanding",
        "Part VIII: Domain Applications",
    ),
    (
        "chapter28_knowledge_graphs",
        "Chapter 28: Knowledge Graphs and Reasoning",
        "Part VIII: Domain Applications",
    ),
    (
        "chapter29_recommendations",
        "Chapter 29: Recommendation Systems",
        "Part VIII: Domain Applications",
    ),
    (
        "chapter30_healthcare",
        "Chapter 30: Healthcare Applications",
        "Part IX: Industry Applications",
    ),
    (
        "chapter31_finance",
        "Chapter 31: Financial Applications",
        "Part IX: Industry Applications",
    ),
    (
        "chapter32_legal",
        "Chapter 32: Legal and Compliance Applications",
        "Part IX: Industry Applications",
    ),
    (
        "chapter33_observability",
        "Chapter 33: Observability and Monitoring",
        "Part X: Production Systems",
    ),
    (
        "chapter34_dsl_agents",
        "Chapter 34: DSL and Agent Systems",
        "Part X: Production Systems",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(id: &str, part: &str) -> ChapterDescriptor {
        ChapterDescriptor {
            id: id.to_string(),
            title: format!("Title of {id}"),
            part: part.to_string(),
        }
    }

    #[test]
    fn builtin_catalog_is_well_formed() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.len(), 36);
        assert_eq!(catalog.get(0).unwrap().id, "preface");
        assert_eq!(catalog.get(35).unwrap().id, "chapter34_dsl_agents");

        // Ids are unique URL-safe slugs
        let mut seen = std::collections::HashSet::new();
        for c in catalog.list() {
            assert!(seen.insert(c.id.clone()), "duplicate id {}", c.id);
            assert!(
                c.id.chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'),
                "id {} is not a URL-safe slug",
                c.id
            );
        }
    }

    #[test]
    fn group_by_part_preserves_first_occurrence_order() {
        let chapters = vec![
            desc("preface", "Front"),
            desc("c1", "PartI"),
            desc("c2", "PartI"),
            desc("appendix", "Back"),
        ];
        let groups = group_by_part(&chapters);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].part, "Front");
        assert_eq!(groups[1].part, "PartI");
        assert_eq!(groups[2].part, "Back");
        assert_eq!(groups[1].chapters[0].id, "c1");
        assert_eq!(groups[1].chapters[1].id, "c2");
    }

    #[test]
    fn group_by_part_concatenation_round_trips() {
        let chapters: Vec<_> = Catalog::builtin().list().to_vec();
        let groups = group_by_part(&chapters);
        let rebuilt: Vec<_> = groups.into_iter().flat_map(|g| g.chapters).collect();
        assert_eq!(rebuilt, chapters);
    }

    #[test]
    fn group_by_part_interleaved_parts_keep_within_part_order() {
        // Parts need not be contiguous in the input; grouping keys on the
        // first occurrence, not on adjacency.
        let chapters = vec![
            desc("a", "X"),
            desc("b", "Y"),
            desc("c", "X"),
            desc("d", "Y"),
        ];
        let groups = group_by_part(&chapters);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].part, "X");
        let ids: Vec<_> = groups[0].chapters.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[test]
    fn index_of_finds_chapters_by_id() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.index_of("preface"), Some(0));
        assert_eq!(catalog.index_of("chapter14_gpt"), Some(15));
        assert_eq!(catalog.index_of("no_such_chapter"), None);
    }

    #[test]
    fn slug_validation_rejects_path_shapes() {
        assert!(is_valid_slug("chapter14_gpt"));
        assert!(is_valid_slug("preface"));
        assert!(is_valid_slug("front-matter"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("../etc/passwd"));
        assert!(!is_valid_slug("a/b"));
        assert!(!is_valid_slug("a\\b"));
        assert!(!is_valid_slug("a%2e%2e"));
        assert!(!is_valid_slug("chapter one"));
    }

    #[test]
    fn descriptor_json_round_trip() {
        let json = r#"[{"id":"preface","title":"Preface","part":"Front Matter"}]"#;
        let chapters: Vec<ChapterDescriptor> = serde_json::from_str(json).unwrap();
        assert_eq!(chapters[0].id, "preface");
        let back = serde_json::to_string(&chapters).unwrap();
        assert!(back.contains(r#""part":"Front Matter""#));
    }
}
