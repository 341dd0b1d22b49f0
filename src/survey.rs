//! Survey builder.
//!
//! Turns a topic and an already-bounded list of papers into a literature
//! survey draft with one completion call.

use crate::arxiv::PaperRecord;
use crate::error::Result;
use crate::llm::CompletionModel;
use crate::prompts::survey::build_survey_prompt;
use tracing::info;

/// Generate a survey draft for `topic` from `papers`.
///
/// Every paper given is rendered; the caller picks the top-K. The model's
/// text is returned as-is and any model error is passed straight through.
pub async fn build_survey(
    topic: &str,
    papers: &[PaperRecord],
    model: &dyn CompletionModel,
) -> Result<String> {
    let prompt = build_survey_prompt(topic, papers);

    info!(
        topic = topic,
        papers = papers.len(),
        prompt_chars = prompt.len(),
        "Generating survey"
    );

    model.complete(&prompt).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SurveyError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records prompts and answers with a fixed reply
    struct ScriptedModel {
        reply: std::result::Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl CompletionModel for ScriptedModel {
        async fn complete(&self, prompt: &str) -> Result<String> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.to_string());
            }
            self.reply.clone().map_err(|message| SurveyError::Api { code: 429, message })
        }
    }

    fn paper(title: &str, year: i32) -> PaperRecord {
        PaperRecord {
            title: title.to_string(),
            summary: format!("About {}", title),
            link: format!("http://arxiv.org/abs/{}", title),
            published_year: year,
            authors: vec!["Someone".to_string()],
        }
    }

    #[tokio::test]
    async fn test_returns_completion_verbatim() {
        let model = ScriptedModel::replying("  1. Background\n\n...  ");
        let papers = vec![paper("A", 2020), paper("B", 2021)];

        let survey = build_survey("graphene", &papers, &model).await.expect("survey");
        assert_eq!(survey, "  1. Background\n\n...  ");

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(
            "Title: A (2020)\nSummary: About A\n\nTitle: B (2021)\nSummary: About B"
        ));
    }

    #[tokio::test]
    async fn test_empty_papers_still_invokes_model() {
        let model = ScriptedModel::replying("nothing to survey");

        let survey = build_survey("lettuce", &[], &model).await.expect("survey");
        assert_eq!(survey, "nothing to survey");

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Research Topic: lettuce"));
        assert!(!prompts[0].contains("Title:"));
    }

    #[tokio::test]
    async fn test_renders_every_paper_given() {
        let model = ScriptedModel::replying("ok");
        let papers: Vec<PaperRecord> = (0..12).map(|i| paper(&format!("P{}", i), 2000 + i)).collect();

        build_survey("many", &papers, &model).await.expect("survey");
        assert_eq!(model.prompts()[0].matches("Title: ").count(), 12);
    }

    #[tokio::test]
    async fn test_model_error_propagates() {
        let model = ScriptedModel::failing("quota exceeded");

        let err = build_survey("x", &[paper("A", 2020)], &model)
            .await
            .expect_err("model failure must propagate");
        match err {
            SurveyError::Api { code, message } => {
                assert_eq!(code, 429);
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
