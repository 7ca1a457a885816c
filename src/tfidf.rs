//! TF-IDF relevance scoring (feature `tfidf`).
//!
//! A worked example of retrieval scoring as a plain [`AttrExpr`]: fit a
//! TF-IDF model over the chunk texts, transform the query with the fitted
//! vocabulary, and score each chunk by cosine similarity. There is no
//! external model and no persistent index; the fit happens per evaluation,
//! which is the right trade for corpora that fit in memory and queries
//! that change every call.
//!
//! The weighting matches the common smooth-idf formulation:
//!
//! | quantity | formula |
//! |----------|---------|
//! | tf(t, d) | raw count of `t` in `d` |
//! | idf(t)   | `ln((1 + n) / (1 + df(t))) + 1` |
//! | vector   | tf·idf, L2-normalized |
//! | score    | `doc · query` |
//!
//! Tokens are Unicode words of at least two characters, lowercased. Query
//! terms absent from every chunk are dropped, exactly as a fitted
//! vectorizer would drop them; a query with no surviving terms scores
//! every chunk 0.

use std::collections::HashMap;

use unicode_segmentation::UnicodeSegmentation;

use crate::error::Result;
use crate::table::Column;
use crate::value::Value;
use crate::{AttrExpr, ChunkSet};

/// Scores each chunk against a fixed query by TF-IDF cosine similarity.
///
/// Wraps a stringifier (any [`AttrExpr`] producing one string per chunk);
/// chunks whose text is null score null rather than zero, so empty chunks
/// stay distinguishable from irrelevant ones.
///
/// ```rust
/// use quarry::{Stringify, Tfidf, TopK};
///
/// # fn main() -> quarry::Result<()> {
/// let corpus = quarry::corpus_from_text(
///     "The quick brown fox. Pack my box with liquor jugs.",
///     "doc",
/// )?;
/// let best = corpus
///     .chunk("sentence")?
///     .enrich(&[("score", &Tfidf::new(Stringify::default(), "liquor box"))])?
///     .filter(&[&TopK::new("score", 1)])?;
/// assert_eq!(best.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct Tfidf {
    source: Box<dyn AttrExpr>,
    query: String,
}

impl Tfidf {
    /// Score the text produced by `source` against `query`.
    #[must_use]
    pub fn new(source: impl AttrExpr + 'static, query: impl Into<String>) -> Self {
        Self {
            source: Box::new(source),
            query: query.into(),
        }
    }
}

impl std::fmt::Debug for Tfidf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tfidf")
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words()
        .filter(|w| w.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

fn counts(tokens: &[String]) -> HashMap<&str, f64> {
    let mut tf: HashMap<&str, f64> = HashMap::new();
    for t in tokens {
        *tf.entry(t.as_str()).or_insert(0.0) += 1.0;
    }
    tf
}

impl AttrExpr for Tfidf {
    fn eval(&self, chunks: &ChunkSet) -> Result<Column> {
        let texts = self.source.eval(chunks)?;
        let docs: Vec<Option<Vec<String>>> = texts
            .iter()
            .map(|v| v.as_str().map(tokenize))
            .collect();

        // document frequency over non-null docs
        let n = docs.iter().flatten().count() as f64;
        let mut df: HashMap<&str, f64> = HashMap::new();
        for tokens in docs.iter().flatten() {
            let tf = counts(tokens);
            for term in tf.keys() {
                *df.entry(term).or_insert(0.0) += 1.0;
            }
        }
        let idf = |term: &str| {
            df.get(term)
                .map(|d| ((1.0 + n) / (1.0 + d)).ln() + 1.0)
        };

        // query vector, restricted to the fitted vocabulary
        let query_tokens = tokenize(&self.query);
        let mut query: HashMap<&str, f64> = HashMap::new();
        for (term, tf) in counts(&query_tokens) {
            if let Some(w) = idf(term) {
                query.insert(term, tf * w);
            }
        }
        let query_norm = query.values().map(|w| w * w).sum::<f64>().sqrt();
        if query_norm > 0.0 {
            for w in query.values_mut() {
                *w /= query_norm;
            }
        }

        let mut out = Vec::with_capacity(docs.len());
        for tokens in &docs {
            let Some(tokens) = tokens else {
                out.push(Value::Null);
                continue;
            };
            let mut dot = 0.0;
            let mut norm_sq = 0.0;
            for (term, tf) in counts(tokens) {
                // every doc term is in the vocabulary it was fitted from
                let w = tf * idf(term).unwrap_or(0.0);
                norm_sq += w * w;
                if let Some(q) = query.get(term) {
                    dot += w * q;
                }
            }
            let score = if norm_sq > 0.0 && query_norm > 0.0 {
                dot / norm_sq.sqrt()
            } else {
                0.0
            };
            out.push(Value::Float(score));
        }
        Ok(Column::from(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use crate::error::Error;
    use crate::stringify::Stringify;
    use crate::table::Table;

    fn corpus_of_two(a: &str, b: &str) -> (Corpus, ChunkSet) {
        let words: Vec<&str> = a.split_whitespace().chain(b.split_whitespace()).collect();
        let split = a.split_whitespace().count() as i64;
        let ids: Vec<i64> = (1..=words.len() as i64).collect();
        let atoms = Table::from_columns([
            ("id", Column::from(ids.clone())),
            ("text", Column::from(words)),
            ("ordinal", Column::from(ids.clone())),
        ])
        .unwrap();
        let corpus = Corpus::new(atoms).unwrap();

        let chunks = Table::from_columns([("id", Column::from(vec![1i64, 2]))]).unwrap();
        let memberships = Table::from_columns([
            (
                "chunk",
                Column::from(
                    ids.iter()
                        .map(|&i| Value::Int(if i <= split { 1 } else { 2 }))
                        .collect::<Vec<_>>(),
                ),
            ),
            (
                "atom",
                Column::from(ids.into_iter().map(Value::Int).collect::<Vec<_>>()),
            ),
        ])
        .unwrap();
        let set = ChunkSet::new(&corpus, chunks, memberships).unwrap();
        (corpus, set)
    }

    #[test]
    fn matches_the_smooth_idf_formulation() {
        // Both docs: "the" twice, "fox" and "dog" shared, five unique terms.
        let (_corpus, set) = corpus_of_two(
            "The (quick) [brown] fox jumps! Over the <lazy> dog",
            "The ~groovy minute! dog bounds UPON the sleepy fox",
        );
        let scores = Tfidf::new(Stringify::default(), "the").eval(&set).unwrap();

        // tf("the") = 2, idf = 1; five unique terms at idf ln(1.5)+1.
        let unique_idf = 1.5f64.ln() + 1.0;
        let expected = 2.0 / (6.0 + 5.0 * unique_idf * unique_idf).sqrt();

        for row in 0..2 {
            let got = scores.get(row).and_then(Value::as_f64).unwrap();
            assert!((got - expected).abs() < 1e-9, "row {row}: {got} vs {expected}");
            assert!((got - 0.5019).abs() < 1e-3);
        }
    }

    #[test]
    fn more_occurrences_score_higher() {
        let (_corpus, set) = corpus_of_two("dog dog dog cat", "dog cat cat cat");
        let scores = Tfidf::new(Stringify::default(), "dog").eval(&set).unwrap();
        let a = scores.get(0).and_then(Value::as_f64).unwrap();
        let b = scores.get(1).and_then(Value::as_f64).unwrap();
        assert!(a > b);
        assert!((a - 3.0 / 10.0f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn query_outside_the_vocabulary_scores_zero() {
        let (_corpus, set) = corpus_of_two("alpha beta", "gamma delta");
        let scores = Tfidf::new(Stringify::default(), "zebra").eval(&set).unwrap();
        assert_eq!(scores.get(0), Some(&Value::Float(0.0)));
        assert_eq!(scores.get(1), Some(&Value::Float(0.0)));
    }

    #[test]
    fn null_text_stays_null() {
        let (corpus, _set) = corpus_of_two("alpha beta", "gamma delta");
        // one chunk with members, one without
        let chunks = Table::from_columns([("id", Column::from(vec![7i64, 8]))]).unwrap();
        let memberships = Table::from_columns([
            ("chunk", Column::from(vec![7i64, 7])),
            ("atom", Column::from(vec![1i64, 2])),
        ])
        .unwrap();
        let set = ChunkSet::new(&corpus, chunks, memberships).unwrap();

        let scores = Tfidf::new(Stringify::default(), "alpha").eval(&set).unwrap();
        assert!(matches!(scores.get(0), Some(Value::Float(_))));
        assert_eq!(scores.get(1), Some(&Value::Null));
    }

    #[test]
    fn stringifier_errors_propagate() {
        let atoms = Table::from_columns([
            ("id", Column::from(vec![1i64])),
            ("ordinal", Column::from(vec![1i64])),
        ])
        .unwrap();
        let corpus = Corpus::new(atoms).unwrap();
        let chunks = Table::from_columns([("id", Column::from(vec![1i64]))]).unwrap();
        let memberships = Table::from_columns([
            ("chunk", Column::from(vec![1i64])),
            ("atom", Column::from(vec![1i64])),
        ])
        .unwrap();
        let set = ChunkSet::new(&corpus, chunks, memberships).unwrap();
        assert!(matches!(
            Tfidf::new(Stringify::default(), "x").eval(&set),
            Err(Error::UnknownAttribute(n)) if n == "text"
        ));
    }
}
