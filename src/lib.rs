//! # litsurvey
//!
//! arXiv Literature Survey Assistant
//!
//! ## Modules
//!
//! - [`arxiv`] - arXiv search client and feed parsing
//! - [`survey`] - Survey draft generation
//! - [`prompts`] - Prompt templates
//! - [`llm`] - Completion model capability and OpenAI-compatible client
//! - [`pipeline`] - Fetch, top-K selection and survey in one call
//! - [`export`] - PDF and Word export
//! - [`config`] - Model credential resolution
//! - [`server`] - HTTP form front-end
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use litsurvey::arxiv::{ArxivClient, QueryOptions};
//! use litsurvey::config::LlmSettings;
//! use litsurvey::llm::OpenAiChat;
//! use litsurvey::survey::build_survey;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let papers = ArxivClient::new()?
//!         .fetch("graphene batteries", &QueryOptions::default())
//!         .await;
//!     let model = OpenAiChat::new(LlmSettings::resolve(None)?, "gpt-3.5-turbo")?;
//!     let survey = build_survey("graphene batteries", &papers[..papers.len().min(5)], &model).await?;
//!     println!("{}", survey);
//!     Ok(())
//! }
//! ```

pub mod arxiv;
pub mod config;
pub mod error;
pub mod export;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod server;
pub mod survey;

pub use error::{Result, SurveyError};
