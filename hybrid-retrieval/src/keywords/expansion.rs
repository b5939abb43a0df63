use std::sync::Arc;

use async_openai::{
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Retry,
};
use tracing::debug;

use common::error::AppError;

const EXPANSION_SYSTEM_MESSAGE: &str = "あなたは社内Wiki検索の支援ツールです。\
ユーザーの質問と抽出済みキーワードを受け取り、検索に有効な追加キーワードを提案してください。\
回答はJSON配列(文字列のみ)で返すこと。例: [\"会員登録\", \"認証\"]";

const MAX_EXPANSION_TERMS: usize = 8;

/// One prompt/response round-trip asking the model for additional search
/// terms. Purely additive: the caller filters and the whole call is fail-soft.
pub async fn expand_keywords(
    client: &Arc<Client<async_openai::config::OpenAIConfig>>,
    model: &str,
    query: &str,
    seed_keywords: &[String],
) -> Result<Vec<String>, AppError> {
    let user_message = format!(
        "質問: {query}\n抽出済みキーワード: {}",
        seed_keywords.join(", ")
    );

    let request = CreateChatCompletionRequestArgs::default()
        .model(model)
        .messages([
            ChatCompletionRequestSystemMessageArgs::default()
                .content(EXPANSION_SYSTEM_MESSAGE)
                .build()?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_message)
                .build()?
                .into(),
        ])
        .build()?;

    let retry_strategy = ExponentialBackoff::from_millis(100).map(jitter).take(2);
    let chat = client.chat();
    let response = Retry::spawn(retry_strategy, || chat.create(request.clone())).await?;

    let content = response
        .choices
        .first()
        .and_then(|choice| choice.message.content.as_deref())
        .ok_or_else(|| AppError::LLMParsing("empty keyword expansion response".into()))?;

    let terms = parse_expansion_terms(content)?;
    debug!(terms = terms.len(), "LLM keyword expansion returned terms");

    Ok(terms)
}

/// The model answers with a JSON string array, possibly wrapped in a code
/// fence.
fn parse_expansion_terms(content: &str) -> Result<Vec<String>, AppError> {
    let trimmed = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let terms: Vec<String> = serde_json::from_str(trimmed)
        .map_err(|err| AppError::LLMParsing(format!("keyword expansion was not a JSON array: {err}")))?;

    Ok(terms
        .into_iter()
        .map(|term| term.trim().to_owned())
        .filter(|term| !term.is_empty())
        .take(MAX_EXPANSION_TERMS)
        .collect())
}
