use std::collections::{HashMap, HashSet};

use reqwest::Method;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::error::BlogError;
use crate::models::{BlogCategory, BlogPost, BlogPostView, Recommendation, RecommendationKind};

pub const DEFAULT_RECOMMENDATIONS: usize = 5;

const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "could", "do", "does", "for", "from", "had", "has", "have", "he", "her",
    "his", "how", "if", "in", "into", "is", "it", "its", "just", "me", "more", "most", "my", "no",
    "not", "of", "on", "one", "or", "our", "out", "over", "she", "so", "some", "than", "that",
    "the", "their", "them", "then", "there", "these", "they", "this", "those", "to", "too", "up",
    "us", "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "why",
    "will", "with", "would", "you", "your",
];

/// Words of two or more characters, minus stop words, plus adjacent bigrams.
fn features(text: &str) -> Vec<String> {
    let words: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| w.chars().count() >= 2 && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect();

    let bigrams: Vec<String> = words.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])).collect();
    words.into_iter().chain(bigrams).collect()
}

type SparseVector = HashMap<String, f64>;

/// L2-normalised tf-idf vectors with smoothed idf `ln((1 + n) / (1 + df)) + 1`.
fn tfidf(documents: &[Vec<String>]) -> Vec<SparseVector> {
    let n = documents.len() as f64;

    let mut document_frequency: HashMap<&str, f64> = HashMap::new();
    for document in documents {
        let unique: HashSet<&str> = document.iter().map(String::as_str).collect();
        for term in unique {
            *document_frequency.entry(term).or_default() += 1.0;
        }
    }

    documents
        .iter()
        .map(|document| {
            let mut vector: SparseVector = HashMap::new();
            for term in document {
                *vector.entry(term.clone()).or_default() += 1.0;
            }
            for (term, weight) in vector.iter_mut() {
                let df = document_frequency.get(term.as_str()).copied().unwrap_or(0.0);
                *weight *= ((1.0 + n) / (1.0 + df)).ln() + 1.0;
            }

            let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
            if norm > 0.0 {
                vector.values_mut().for_each(|w| *w /= norm);
            }
            vector
        })
        .collect()
}

fn cosine(a: &SparseVector, b: &SparseVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(term, weight)| large.get(term).map(|other| weight * other))
        .sum()
}

/// Orders the unliked documents of `corpus` by mean cosine similarity to
/// the liked ones, best first. Empty when nothing in the corpus is liked.
pub fn rank(corpus: &[(Uuid, String)], liked: &HashSet<Uuid>) -> Vec<Uuid> {
    let vectors = tfidf(&corpus.iter().map(|(_, text)| features(text)).collect::<Vec<_>>());

    let liked_vectors: Vec<&SparseVector> = corpus
        .iter()
        .zip(&vectors)
        .filter(|((id, _), _)| liked.contains(id))
        .map(|(_, vector)| vector)
        .collect();
    if liked_vectors.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(Uuid, f64)> = corpus
        .iter()
        .zip(&vectors)
        .filter(|((id, _), _)| !liked.contains(id))
        .map(|((id, _), vector)| {
            let total: f64 = liked_vectors.iter().map(|liked| cosine(vector, liked)).sum();
            (*id, total / liked_vectors.len() as f64)
        })
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.into_iter().map(|(id, _)| id).collect()
}

#[derive(Debug, Deserialize)]
struct CorpusRow {
    id: Uuid,
    title: String,
    excerpt: String,
    #[serde(default)]
    category: BlogCategory,
    #[serde(default)]
    tags: Vec<String>,
}

impl CorpusRow {
    fn text(&self) -> String {
        format!("{} {} {} {}", self.title, self.excerpt, self.category, self.tags.join(" "))
    }
}

#[derive(Debug, Deserialize)]
struct LikedRow {
    blog_post_id: Uuid,
}

pub struct RecommendationService {
    supabase: SupabaseClient,
}

impl RecommendationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn recommend(
        &self,
        user_id: Uuid,
        limit: usize,
        auth_token: &str,
    ) -> Result<Vec<Recommendation>, BlogError> {
        let path = format!("/rest/v1/blog_likes?user_id=eq.{}&select=blog_post_id", user_id);
        let liked: Vec<LikedRow> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        let liked: HashSet<Uuid> = liked.into_iter().map(|row| row.blog_post_id).collect();

        if !liked.is_empty() {
            let personalized = self.personalized(&liked, limit, auth_token).await?;
            if !personalized.is_empty() {
                return Ok(personalized);
            }
        }

        self.trending(limit, auth_token).await
    }

    async fn personalized(
        &self,
        liked: &HashSet<Uuid>,
        limit: usize,
        auth_token: &str,
    ) -> Result<Vec<Recommendation>, BlogError> {
        let corpus: Vec<CorpusRow> = self.supabase.request(
            Method::GET,
            "/rest/v1/published_blog_posts?select=id,title,excerpt,category,tags",
            Some(auth_token),
            None,
        ).await?;

        let documents: Vec<(Uuid, String)> = corpus.iter().map(|row| (row.id, row.text())).collect();
        let ranked: Vec<Uuid> = rank(&documents, liked).into_iter().take(limit).collect();
        debug!("Ranked {} of {} published posts", ranked.len(), documents.len());
        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        let ids = ranked.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",");
        let path = format!("/rest/v1/published_blog_posts?id=in.({})", ids);
        let posts: Vec<BlogPost> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        let mut by_id: HashMap<Uuid, BlogPost> = posts.into_iter().map(|p| (p.id, p)).collect();

        Ok(ranked
            .iter()
            .filter_map(|id| by_id.remove(id))
            .map(|post| Recommendation {
                reason: format!("Similar to posts you liked in {}", post.category.label()),
                blog: BlogPostView::from(post),
                kind: RecommendationKind::Personalized,
            })
            .collect())
    }

    async fn trending(&self, limit: usize, auth_token: &str) -> Result<Vec<Recommendation>, BlogError> {
        let path = format!("/rest/v1/published_blog_posts?order=views_count.desc&limit={}", limit);
        let posts: Vec<BlogPost> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;

        Ok(posts
            .into_iter()
            .map(|post| Recommendation {
                blog: BlogPostView::from(post),
                reason: "Trending on the platform".to_string(),
                kind: RecommendationKind::Trending,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> (Uuid, String) {
        (Uuid::new_v4(), text.to_string())
    }

    #[test]
    fn features_drop_stop_words_and_add_bigrams() {
        assert_eq!(
            features("The panic of a Panic attack"),
            vec!["panic", "panic", "attack", "panic panic", "panic attack"]
        );
    }

    #[test]
    fn similar_posts_rank_first() {
        let liked = doc("Managing panic attacks: breathing exercises for anxiety");
        let close = doc("Breathing exercises that calm anxiety and panic");
        let far = doc("Budgeting for couples therapy sessions");
        let middle = doc("Sleep routines when anxiety keeps you awake");

        let corpus = vec![liked.clone(), far.clone(), middle.clone(), close.clone()];
        let ranked = rank(&corpus, &HashSet::from([liked.0]));

        assert_eq!(ranked, vec![close.0, middle.0, far.0]);
    }

    #[test]
    fn nothing_liked_means_no_ranking() {
        let corpus = vec![doc("anxiety"), doc("depression")];
        assert!(rank(&corpus, &HashSet::new()).is_empty());
        assert!(rank(&corpus, &HashSet::from([Uuid::new_v4()])).is_empty());
    }

    #[test]
    fn vectors_are_unit_length() {
        let vectors = tfidf(&[features("stress at work"), features("work life balance")]);
        for vector in vectors {
            let norm: f64 = vector.values().map(|w| w * w).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }
}
