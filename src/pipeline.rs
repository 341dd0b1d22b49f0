//! Survey pipeline.
//!
//! Fetch → stop if nothing came back → take the top-K → build the survey.
//! Shared by the CLI and the HTTP front-end.

use crate::arxiv::{ArxivClient, PaperRecord, QueryOptions, SortBy};
use crate::error::{Result, SurveyError};
use crate::llm::{CompletionModel, AVAILABLE_MODELS, DEFAULT_MODEL};
use crate::survey::build_survey;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::{info, warn};

pub const DEFAULT_TOPIC: &str = "Blue light effect on lettuce";
pub const DEFAULT_MAX_RESULTS: u32 = 15;
pub const DEFAULT_TOP_K: usize = 5;

/// Accepted fetch sizes
pub const MAX_RESULTS_RANGE: RangeInclusive<u32> = 5..=50;

/// Accepted top-K values
pub const TOP_K_RANGE: RangeInclusive<usize> = 3..=10;

/// Parameters of one survey request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyParams {
    pub topic: String,
    /// Papers requested from arXiv
    pub max_results: u32,
    /// Papers passed to the model
    pub top_k: usize,
    pub model: String,
    pub sort_by: SortBy,
}

impl Default for SurveyParams {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            top_k: DEFAULT_TOP_K,
            model: DEFAULT_MODEL.to_string(),
            sort_by: SortBy::Relevance,
        }
    }
}

impl SurveyParams {
    /// Check the front-end bounds
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(SurveyError::Validation("topic must not be empty".to_string()));
        }
        if !MAX_RESULTS_RANGE.contains(&self.max_results) {
            return Err(SurveyError::Validation(format!(
                "max_results must be between {} and {}",
                MAX_RESULTS_RANGE.start(),
                MAX_RESULTS_RANGE.end()
            )));
        }
        if !TOP_K_RANGE.contains(&self.top_k) {
            return Err(SurveyError::Validation(format!(
                "top_k must be between {} and {}",
                TOP_K_RANGE.start(),
                TOP_K_RANGE.end()
            )));
        }
        if !AVAILABLE_MODELS.contains(&self.model.as_str()) {
            return Err(SurveyError::Validation(format!(
                "model must be one of {}",
                AVAILABLE_MODELS.join(", ")
            )));
        }
        Ok(())
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            max_results: self.max_results,
            sort_by: self.sort_by,
        }
    }
}

/// Result of a completed survey request
#[derive(Debug, Clone, Serialize)]
pub struct SurveyOutcome {
    /// Everything the fetch returned
    pub papers: Vec<PaperRecord>,
    /// How many of `papers` went into the prompt
    pub summarized: usize,
    pub survey: String,
}

/// First `k` papers, or all of them when fewer were fetched
pub fn select_top_k(papers: &[PaperRecord], k: usize) -> &[PaperRecord] {
    &papers[..k.min(papers.len())]
}

/// Fetch papers for the request; an empty fetch is [`SurveyError::NoPapers`].
pub async fn fetch_papers(fetcher: &ArxivClient, params: &SurveyParams) -> Result<Vec<PaperRecord>> {
    let papers = fetcher.fetch(&params.topic, &params.query_options()).await;
    if papers.is_empty() {
        warn!(topic = %params.topic, "No papers found");
        return Err(SurveyError::NoPapers);
    }
    info!(topic = %params.topic, count = papers.len(), "Retrieved papers");
    Ok(papers)
}

/// Build the survey from the top-K of already fetched papers
pub async fn summarize(
    params: &SurveyParams,
    papers: &[PaperRecord],
    model: &dyn CompletionModel,
) -> Result<String> {
    let selected = select_top_k(papers, params.top_k);
    build_survey(&params.topic, selected, model).await
}

/// Run the whole request
pub async fn run_survey(
    fetcher: &ArxivClient,
    model: &dyn CompletionModel,
    params: &SurveyParams,
) -> Result<SurveyOutcome> {
    let papers = fetch_papers(fetcher, params).await?;
    let survey = summarize(params, &papers, model).await?;
    let summarized = papers.len().min(params.top_k);

    Ok(SurveyOutcome {
        papers,
        summarized,
        survey,
    })
}
