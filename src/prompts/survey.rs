//! Literature survey prompt.
//!
//! Renders the fetched papers and the research topic into the single prompt
//! sent to the completion model.

use crate::arxiv::PaperRecord;

/// Survey prompt template
/// Placeholders: {papers}, {topic}
pub const SURVEY_PROMPT_TEMPLATE: &str = r#"
You are an assistant that writes **professional literature survey drafts**.

Organize the information into the following sections:
1. **Background** → Provide a concise overview of the research area.
2. **Key Themes** → Summarize recurring ideas/findings as bullet points.
3. **Research Gaps** → Highlight missing, underexplored, or inconsistent areas.
4. **References** → List titles with year (from the provided metadata). Do not invent references.

Papers:
{papers}

Research Topic: {topic}
"#;

/// Render one paper as its two-line block
pub fn render_paper(paper: &PaperRecord) -> String {
    format!(
        "Title: {} ({})\nSummary: {}",
        paper.title, paper.published_year, paper.summary
    )
}

/// Render all papers, blocks separated by a blank line, input order kept
pub fn render_papers(papers: &[PaperRecord]) -> String {
    papers
        .iter()
        .map(render_paper)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the full survey prompt
pub fn build_survey_prompt(topic: &str, papers: &[PaperRecord]) -> String {
    // {papers} precedes {topic} in the template, so replacing the topic first
    // and then the first {papers} keeps placeholder-like input literal.
    SURVEY_PROMPT_TEMPLATE
        .replacen("{topic}", topic, 1)
        .replacen("{papers}", &render_papers(papers), 1)
}
