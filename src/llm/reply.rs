//! Customer reply generation: short PT-BR answers grounded in the analysis.
//!
//! The model is optional. Without one, or whenever the call fails, the
//! generator answers with a fixed qualifying question so the webhook flow
//! always has something to send.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::analysis::AnalysisResult;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};

const REPLY_TEMPERATURE: f64 = 0.4;
const REPLY_MAX_TOKENS: u64 = 120;

const SYSTEM_PROMPT: &str = "Você é um atendente comercial educado e objetivo. Responda em PT-BR, \
     tom humano, curto (<= 2 frases). Aja conforme o estágio do funil e intenção do comprador. \
     Se o cliente pedir proposta/demo, avance o próximo passo.";

/// Generates the reply sent back to the customer.
pub struct ReplyGenerator {
    llm: Option<Arc<dyn LlmProvider>>,
}

impl ReplyGenerator {
    pub fn new(llm: Option<Arc<dyn LlmProvider>>) -> Self {
        Self { llm }
    }

    /// Generator that always answers with the fallback template.
    pub fn fallback_only() -> Self {
        Self { llm: None }
    }

    /// Model behind generated replies, if any.
    pub fn model_name(&self) -> Option<&str> {
        self.llm.as_ref().map(|llm| llm.model_name())
    }

    /// Fixed reply used when no model answer is available.
    pub fn fallback_reply(sender_name: &str) -> String {
        let name_part = if sender_name.is_empty() {
            String::new()
        } else {
            format!("{sender_name}, ")
        };
        format!(
            "{name_part}obrigado pela mensagem! Vou te ajudar com isso. \
             Poderia me confirmar rapidamente orçamento, prazo e quem decide?"
        )
    }

    /// Reply to `user_text` using the analysis as CRM context.
    pub async fn generate(
        &self,
        user_text: &str,
        analysis: &AnalysisResult,
        sender_name: &str,
    ) -> String {
        let fallback = Self::fallback_reply(sender_name);
        let Some(llm) = &self.llm else {
            return fallback;
        };

        let context = match serde_json::to_string(analysis) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize analysis for reply prompt");
                return fallback;
            }
        };

        let user_prompt = format!(
            "Contexto do CRM (JSON):\n{context}\n\n\
             Mensagem do cliente:\n{user_text}\n\n\
             Gere uma resposta curta (<= 2 frases), natural e útil."
        );

        let request = CompletionRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(user_prompt),
        ])
        .with_temperature(REPLY_TEMPERATURE)
        .with_max_tokens(REPLY_MAX_TOKENS);

        match llm.complete(request).await {
            Ok(response) => {
                let reply = response.content.trim();
                if reply.is_empty() {
                    debug!(model = llm.model_name(), "Empty completion, using fallback reply");
                    fallback
                } else {
                    reply.to_string()
                }
            }
            Err(e) => {
                warn!(model = llm.model_name(), error = %e, "Reply generation failed, using fallback");
                fallback
            }
        }
    }
}
