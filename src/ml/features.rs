use crate::dataset::{ColumnData, Table};
use crate::error::{AppError, Result};
use crate::ml::models::FeatureConfig;
use crate::models::VECTORIZE_EXCLUDED;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Runs of two or more word characters
static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?u)\b\w\w+\b").expect("token pattern is a valid regex"));

/// TF-IDF vectorizer for a single text column.
///
/// Vocabulary indices follow alphabetical term order. IDF is smoothed,
/// `ln((1 + n) / (1 + df)) + 1`, and each output row is L2-normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    /// Configuration
    config: FeatureConfig,

    /// Vocabulary mapping (term -> index)
    vocabulary: BTreeMap<String, usize>,

    /// Inverse document frequency per vocabulary index
    idf_values: Vec<f64>,

    /// Is fitted (vocabulary built)
    is_fitted: bool,
}

impl TfidfVectorizer {
    /// Create a new vectorizer
    pub fn new(config: FeatureConfig) -> Self {
        Self {
            config,
            vocabulary: BTreeMap::new(),
            idf_values: Vec::new(),
            is_fitted: false,
        }
    }

    /// Build the vocabulary and IDF weights from `documents`
    pub fn fit(&mut self, documents: &[&str]) -> Result<()> {
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut corpus_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let terms = self.tokenize(doc);
            for term in &terms {
                *corpus_freq.entry(term.clone()).or_insert(0) += 1;
            }
            let unique: HashSet<String> = terms.into_iter().collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let min_df = self.config.min_doc_freq.max(1);
        let mut terms: Vec<String> = doc_freq
            .iter()
            .filter(|(_, df)| **df >= min_df)
            .map(|(term, _)| term.clone())
            .collect();

        if let Some(limit) = self.config.max_features {
            terms.sort_by(|a, b| corpus_freq[b].cmp(&corpus_freq[a]).then_with(|| a.cmp(b)));
            terms.truncate(limit);
        }
        terms.sort();

        let n_docs = documents.len() as f64;
        self.idf_values = terms
            .iter()
            .map(|term| ((1.0 + n_docs) / (1.0 + doc_freq[term] as f64)).ln() + 1.0)
            .collect();
        self.vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(idx, term)| (term, idx))
            .collect();
        self.is_fitted = true;

        Ok(())
    }

    /// Turn each document into a dense, L2-normalized TF-IDF vector
    pub fn transform(&self, documents: &[&str]) -> Result<Vec<Vec<f64>>> {
        if !self.is_fitted {
            return Err(AppError::Processing(
                "TfidfVectorizer must be fitted before transform".to_string(),
            ));
        }

        Ok(documents
            .iter()
            .map(|doc| {
                let mut row = vec![0.0; self.vocabulary.len()];
                for term in self.tokenize(doc) {
                    if let Some(&idx) = self.vocabulary.get(&term) {
                        row[idx] += 1.0;
                    }
                }
                for (value, idf) in row.iter_mut().zip(self.idf_values.iter()) {
                    *value *= idf;
                }
                let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
                if norm > 0.0 {
                    row.iter_mut().for_each(|v| *v /= norm);
                }
                row
            })
            .collect())
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, documents: &[&str]) -> Result<Vec<Vec<f64>>> {
        self.fit(documents)?;
        self.transform(documents)
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        let text = if self.config.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        TOKEN_PATTERN
            .find_iter(&text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Terms in index order
    pub fn feature_names(&self) -> Vec<&str> {
        // BTreeMap iteration is alphabetical, which is index order
        self.vocabulary.keys().map(String::as_str).collect()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|&idx| self.idf_values[idx])
    }

    /// Check if fitted
    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Get vocabulary size
    pub fn vocab_size(&self) -> usize {
        self.vocabulary.len()
    }
}

/// One fitted vectorizer per text column, applied in column order.
///
/// Kept alongside a trained model so new rows are encoded with the vocabulary the
/// model was trained on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeaturePipeline {
    config: FeatureConfig,
    vectorizers: Vec<(String, TfidfVectorizer)>,
}

impl FeaturePipeline {
    pub fn new(config: FeatureConfig) -> Self {
        Self {
            config,
            vectorizers: Vec::new(),
        }
    }

    /// Fit a fresh vectorizer on every text column outside the exclusion list and
    /// replace the column by its vectors.
    pub fn fit_transform(&mut self, mut table: Table) -> Result<Table> {
        let text_columns: Vec<String> = table
            .columns()
            .iter()
            .filter(|c| matches!(c.data, ColumnData::Text(_)))
            .filter(|c| !VECTORIZE_EXCLUDED.contains(&c.name.as_str()))
            .map(|c| c.name.clone())
            .collect();

        self.vectorizers.clear();
        for name in text_columns {
            let mut vectorizer = TfidfVectorizer::new(self.config.clone());
            let vectors = {
                let documents = text_documents(&table, &name)?;
                vectorizer.fit_transform(&documents)?
            };
            table.replace_column(&name, ColumnData::Vector(vectors))?;
            debug!(
                column = %name,
                vocab_size = vectorizer.vocab_size(),
                "vectorized text column"
            );
            self.vectorizers.push((name, vectorizer));
        }

        Ok(table)
    }

    /// Encode text columns with the already fitted vocabularies
    pub fn transform(&self, mut table: Table) -> Result<Table> {
        for (name, vectorizer) in &self.vectorizers {
            let vectors = {
                let documents = text_documents(&table, name)?;
                vectorizer.transform(&documents)?
            };
            table.replace_column(name, ColumnData::Vector(vectors))?;
        }
        Ok(table)
    }

    /// Names of the vectorized columns
    pub fn vectorized_columns(&self) -> Vec<&str> {
        self.vectorizers.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn vectorizer(&self, column: &str) -> Option<&TfidfVectorizer> {
        self.vectorizers
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    /// Total width of all text features
    pub fn n_text_features(&self) -> usize {
        self.vectorizers.iter().map(|(_, v)| v.vocab_size()).sum()
    }
}

/// Vectorize every remaining text column except the excluded ones, returning the
/// fitted pipeline alongside the table.
pub fn vectorize_text_fields(table: Table, config: &FeatureConfig) -> Result<(Table, FeaturePipeline)> {
    let mut pipeline = FeaturePipeline::new(config.clone());
    let table = pipeline.fit_transform(table)?;
    Ok((table, pipeline))
}

/// Column values as documents; missing cells are empty documents
fn text_documents<'a>(table: &'a Table, column: &str) -> Result<Vec<&'a str>> {
    match table.column(column).map(|c| &c.data) {
        Some(ColumnData::Text(values)) => Ok(values
            .iter()
            .map(|v| v.as_deref().unwrap_or(""))
            .collect()),
        Some(_) => Err(AppError::Processing(format!(
            "column {} is not text",
            column
        ))),
        None => Err(AppError::Processing(format!("missing column {}", column))),
    }
}
