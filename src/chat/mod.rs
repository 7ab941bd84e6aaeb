//! RAG chat service.
//!
//! Answers a query by retrieving the user's relevant chunks, replaying the
//! conversation history, and asking the language model for a grounded
//! completion. The exchange is persisted afterwards.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::config::DEFAULT_HISTORY_LIMIT;
use crate::core::errors::ApiError;
use crate::history::HistoryStore;
use crate::llm::{ChatMessage, LanguageModel};
use crate::rag::gateway::{RetrievedMatch, VectorStoreGateway};

const SYSTEM_PROMPT: &str = "\
You are an intelligent and thorough assistant with access to the user's document collection.

CRITICAL INSTRUCTIONS:
1. ALWAYS read and analyze the Reference Data provided below FIRST before responding
2. Base your response primarily on the retrieved document content
3. Provide DETAILED and COMPREHENSIVE answers using the information from the documents
4. Structure your response clearly with proper explanations
5. If the Reference Data contains relevant information, explain it thoroughly - don't be overly brief
6. You may supplement with additional context or clarification ONLY if it:
   - Directly supports and aligns with the document content
   - Helps explain or contextualize the retrieved information
   - Is factually accurate and current (not outdated information)
7. If the Reference Data is insufficient or irrelevant to answer the question, clearly state:
   'I don't have enough information in your documents to answer this question accurately.'
8. NEVER make up information that contradicts or isn't supported by the Reference Data
9. When providing additional context, clearly indicate it's supplementary:
   'Based on your documents... Additionally, it's worth noting that...'

Your goal is to provide valuable, detailed, and accurate responses grounded in the user's uploaded documents.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub answer: String,
    pub source_documents: Vec<RetrievedMatch>,
}

pub struct ChatService {
    gateway: Arc<VectorStoreGateway>,
    history: HistoryStore,
    model: Arc<dyn LanguageModel>,
}

impl ChatService {
    pub fn new(
        gateway: Arc<VectorStoreGateway>,
        history: HistoryStore,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            gateway,
            history,
            model,
        }
    }

    pub async fn ask(
        &self,
        user_id: &str,
        query: &str,
        top_k: usize,
    ) -> Result<ChatAnswer, ApiError> {
        tracing::info!("searching for relevant chunks for user {user_id}");
        let retrieved = self.gateway.retrieve(user_id, query, top_k).await?;

        let reference_text = retrieved
            .iter()
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let exchanges = self.history.read(user_id, DEFAULT_HISTORY_LIMIT).await?;

        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
        for exchange in &exchanges {
            messages.push(ChatMessage::human(&exchange.human));
            messages.push(ChatMessage::assistant(&exchange.assistant));
        }
        messages.push(ChatMessage::human(format!(
            "User Question: {query}\n\nReference Data:\n{reference_text}"
        )));

        tracing::info!("calling language model for user {user_id}");
        let answer = self.model.complete(&messages).await?;

        self.history.append(user_id, query, &answer).await?;

        Ok(ChatAnswer {
            answer,
            source_documents: retrieved,
        })
    }
}
