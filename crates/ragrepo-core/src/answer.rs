//! Answer composer (C9).
//!
//! Formats retrieved chunks into a numbered context block, calls the LLM
//! through `async-openai`'s OpenAI-compatible client pointed at Groq, and
//! builds deduplicated citation references. Never fails the request: no
//! credential or an LLM error both fall back to a well-formed degraded
//! answer (spec §4.9, §7.5).

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
};
use async_openai::Client;

use crate::config::LlmConfig;
use crate::types::{Answer, Reference, RetrievedChunk, Summary};

const SYSTEM_DIRECTIVE: &str =
    "Answer the user's question using only the numbered context blocks provided. \
     Cite the blocks you draw on inline using their bracketed number, e.g. [1]. \
     If the context does not contain the answer, say so plainly.";

const NO_HITS_ANSWER: &str = "No relevant code found for your question.";

/// Build the numbered context block `"[i] {file_path}:{start}-{end}\n{text}"`
/// joined by blank lines (spec §4.9).
pub(crate) fn format_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, c)| format!("[{}] {}:{}-{}\n{}", i + 1, c.file_path, c.start_line, c.end_line, c.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Deduplicate references by `(file_path, start_line, end_line)`, preserving
/// first-seen order, and attach the citation deep-link URL.
fn build_references(owner: &str, repo: &str, branch: &str, chunks: &[RetrievedChunk]) -> Vec<Reference> {
    let mut seen = std::collections::HashSet::new();
    let mut refs = Vec::new();
    for c in chunks {
        let key = (c.file_path.clone(), c.start_line, c.end_line);
        if !seen.insert(key) {
            continue;
        }
        let url = format!(
            "https://github.com/{owner}/{repo}/blob/{branch}/{}#L{}-L{}",
            c.file_path, c.start_line, c.end_line
        );
        refs.push(Reference { file_path: c.file_path.clone(), start_line: c.start_line, end_line: c.end_line, url });
    }
    refs
}

fn client(config: &LlmConfig, api_key: &str) -> Client<OpenAIConfig> {
    let openai_config = OpenAIConfig::new().with_api_key(api_key).with_api_base(&config.base_url);
    Client::with_config(openai_config)
}

fn system_message(text: &str) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
        content: ChatCompletionRequestSystemMessageContent::Text(text.to_string()),
        name: None,
    })
}

fn user_message(text: String) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
        content: ChatCompletionRequestUserMessageContent::Text(text),
        name: None,
    })
}

async fn complete(config: &LlmConfig, api_key: &str, system: &str, user: String) -> Option<String> {
    let request = CreateChatCompletionRequest {
        model: config.model.clone(),
        messages: vec![system_message(system), user_message(user)],
        ..Default::default()
    };

    match client(config, api_key).chat().create(request).await {
        Ok(response) => response.choices.into_iter().next().and_then(|c| c.message.content),
        Err(e) => {
            tracing::warn!(error = %e, "LLM completion failed, falling back to degraded response");
            None
        }
    }
}

/// Compose an answer for `/query` out of retrieved chunks (spec §4.9).
///
/// Degraded-success: with no retrieval hits, an `Answer` carrying the fixed
/// "no relevant code" text and no references is returned (never an error).
/// With hits but no usable LLM, the raw numbered context becomes the answer
/// text and `degraded` is set.
pub async fn compose_answer(
    config: &LlmConfig,
    owner: &str,
    repo: &str,
    branch: &str,
    question: &str,
    chunks: &[RetrievedChunk],
) -> Answer {
    if chunks.is_empty() {
        return Answer { text: NO_HITS_ANSWER.to_string(), references: Vec::new(), degraded: false };
    }

    let references = build_references(owner, repo, branch, chunks);
    let context = format_context(chunks);

    let Some(api_key) = &config.api_key else {
        return Answer { text: context, references, degraded: true };
    };

    let user_prompt = format!("Context:\n{context}\n\nQuestion: {question}");
    match complete(config, api_key, SYSTEM_DIRECTIVE, user_prompt).await {
        Some(text) => Answer { text, references, degraded: false },
        None => Answer { text: context, references, degraded: true },
    }
}

const SUMMARY_SYSTEM_DIRECTIVE: &str =
    "Write a short, plain-language summary of the given software repository, \
     using the supplied context and README content.";
const PAPER_SYSTEM_DIRECTIVE: &str =
    "Write a comprehensive technical write-up of the given software repository's \
     architecture and structure, using the supplied context and README content.";

/// Compose `/summarize`'s two-part output: a short summary and a longer
/// project paper, each a separate LLM call over the supplied context plus
/// README (spec §4.9 additions, reconstructing `original_source`'s
/// `summarize_repo`).
///
/// No credential configured: returns a fixed "API key not configured"
/// summary with an empty paper. Any LLM failure during either call falls
/// back to a README-only summary built from the same two prompts minus the
/// architecture/structure context -- never a 500.
pub async fn compose_summary(
    config: &LlmConfig,
    owner: &str,
    repo: &str,
    description: &str,
    readme: Option<&str>,
    architecture_context: &str,
    structure_context: &str,
) -> Summary {
    let Some(api_key) = &config.api_key else {
        return Summary { summary: "API key not configured".to_string(), project_paper: String::new() };
    };

    let readme_block = readme.unwrap_or("(no README available)");

    let full_prompt = format!(
        "Repository: {owner}/{repo}\nDescription: {description}\n\nREADME:\n{readme_block}\n\n\
         Architecture context:\n{architecture_context}\n\nStructure context:\n{structure_context}"
    );

    let summary = complete(config, api_key, SUMMARY_SYSTEM_DIRECTIVE, full_prompt.clone()).await;
    let paper = complete(config, api_key, PAPER_SYSTEM_DIRECTIVE, full_prompt).await;

    if let (Some(summary), Some(project_paper)) = (&summary, &paper) {
        return Summary { summary: summary.clone(), project_paper: project_paper.clone() };
    }

    fallback_readme_summary(config, api_key, owner, repo, description, readme_block).await
}

/// README-only fallback when the primary two-call summarize fails.
async fn fallback_readme_summary(
    config: &LlmConfig,
    api_key: &str,
    owner: &str,
    repo: &str,
    description: &str,
    readme_block: &str,
) -> Summary {
    let prompt = format!("Repository: {owner}/{repo}\nDescription: {description}\n\nREADME:\n{readme_block}");

    let summary = complete(config, api_key, SUMMARY_SYSTEM_DIRECTIVE, prompt.clone()).await;
    let paper = complete(config, api_key, PAPER_SYSTEM_DIRECTIVE, prompt).await;

    Summary {
        summary: summary.unwrap_or_else(|| format!("{owner}/{repo}: {description}")),
        project_paper: paper.unwrap_or_else(|| readme_block.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(path: &str, start: u32, end: u32, text: &str) -> RetrievedChunk {
        RetrievedChunk { file_path: path.to_string(), start_line: start, end_line: end, text: text.to_string(), distance: 0.1 }
    }

    #[test]
    fn format_context_numbers_and_joins_with_blank_lines() {
        let chunks = vec![chunk("a.rs", 1, 5, "fn main() {}"), chunk("b.rs", 10, 20, "struct X;")];
        let context = format_context(&chunks);
        assert_eq!(context, "[1] a.rs:1-5\nfn main() {}\n\n[2] b.rs:10-20\nstruct X;");
    }

    #[test]
    fn references_deduplicate_preserving_first_seen_order() {
        let chunks = vec![chunk("a.rs", 1, 5, "x"), chunk("b.rs", 1, 2, "y"), chunk("a.rs", 1, 5, "x again")];
        let refs = build_references("octocat", "hello-world", "main", &chunks);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].file_path, "a.rs");
        assert_eq!(refs[1].file_path, "b.rs");
    }

    #[test]
    fn citation_url_matches_spec_shape() {
        let chunks = vec![chunk("src/lib.rs", 3, 9, "code")];
        let refs = build_references("octocat", "hello-world", "main", &chunks);
        assert_eq!(refs[0].url, "https://github.com/octocat/hello-world/blob/main/src/lib.rs#L3-L9");
    }

    #[tokio::test]
    async fn empty_chunks_yields_fixed_no_hits_answer() {
        let config = LlmConfig { api_key: Some("x".into()), base_url: "http://x".into(), model: "m".into() };
        let answer = compose_answer(&config, "o", "r", "main", "what is this", &[]).await;
        assert_eq!(answer.text, NO_HITS_ANSWER);
        assert!(answer.references.is_empty());
        assert!(!answer.degraded);
    }

    #[tokio::test]
    async fn no_api_key_yields_degraded_context_only_answer() {
        let config = LlmConfig { api_key: None, base_url: "http://x".into(), model: "m".into() };
        let chunks = vec![chunk("a.rs", 1, 5, "fn main() {}")];
        let answer = compose_answer(&config, "o", "r", "main", "what is this", &chunks).await;
        assert!(answer.degraded);
        assert!(answer.text.contains("[1] a.rs:1-5"));
        assert_eq!(answer.references.len(), 1);
    }

    #[tokio::test]
    async fn summarize_without_api_key_is_fixed_fallback() {
        let config = LlmConfig { api_key: None, base_url: "http://x".into(), model: "m".into() };
        let summary = compose_summary(&config, "o", "r", "a repo", Some("# readme"), "", "").await;
        assert_eq!(summary.summary, "API key not configured");
        assert!(summary.project_paper.is_empty());
    }
}
