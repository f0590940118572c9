//! Token accounting for chat histories and tool observations.
//!
//! Known model families are counted with their tiktoken BPE; anything else
//! degrades to a byte-ratio estimate. Counting never fails: an unknown model
//! gets approximate numbers, not an error.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tiktoken_rs::{get_bpe_from_model, CoreBPE};

use crate::models::message::Message;

/// Framing overhead per chat message (role plus separators) and per reply,
/// matching the OpenAI chat accounting.
const TOKENS_PER_MESSAGE: usize = 4;
const TOKENS_PER_REPLY: usize = 3;

pub struct TokenCounter {
    bpes: Mutex<HashMap<String, Option<Arc<CoreBPE>>>>,
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCounter {
    pub fn new() -> Self {
        TokenCounter {
            bpes: Mutex::new(HashMap::new()),
        }
    }

    fn bpe_for(&self, model: &str) -> Option<Arc<CoreBPE>> {
        let mut cache = self.bpes.lock().unwrap();
        cache
            .entry(model.to_string())
            .or_insert_with(|| get_bpe_from_model(model).ok().map(Arc::new))
            .clone()
    }

    /// Count the tokens of a single string.
    pub fn count_tokens(&self, text: &str, model: &str) -> usize {
        match self.bpe_for(model) {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => approximate_tokens(text),
        }
    }

    /// Count the tokens a message list occupies on a chat completion call,
    /// including per-message framing overhead.
    pub fn count_messages(&self, messages: &[Message], model: &str) -> usize {
        let mut total = TOKENS_PER_REPLY;
        for message in messages {
            total += TOKENS_PER_MESSAGE + self.count_tokens(&message.content, model);
        }
        total
    }

    /// Return a prefix of `text` whose token count does not exceed `limit`.
    /// Text already within the limit is returned unchanged.
    pub fn truncate(&self, text: &str, model: &str, limit: usize) -> String {
        match self.bpe_for(model) {
            Some(bpe) => {
                let tokens = bpe.encode_with_special_tokens(text);
                if tokens.len() <= limit {
                    return text.to_string();
                }
                bpe.decode(tokens[..limit].to_vec())
                    .unwrap_or_else(|_| approximate_truncate(text, limit).to_string())
            }
            None => {
                if approximate_tokens(text) <= limit {
                    text.to_string()
                } else {
                    approximate_truncate(text, limit).to_string()
                }
            }
        }
    }

    /// Trim a history to fit `budget` tokens by dropping messages from the
    /// oldest non-system message forward. The leading system message is
    /// never dropped and messages are never reordered.
    pub fn trim_history(
        &self,
        mut messages: Vec<Message>,
        model: &str,
        budget: usize,
    ) -> Vec<Message> {
        while messages.len() > 1 && self.count_messages(&messages, model) > budget {
            messages.remove(1);
        }
        messages
    }
}

/// Byte-ratio estimate for models without a known tokenizer: roughly four
/// bytes per token for ASCII text, two bytes per token for multi-byte (CJK)
/// text.
fn approximate_tokens(text: &str) -> usize {
    let ascii = text.bytes().filter(u8::is_ascii).count();
    let multibyte = text.len() - ascii;
    ascii.div_ceil(4) + multibyte.div_ceil(2)
}

fn approximate_truncate(text: &str, limit: usize) -> &str {
    let mut end = text.len().min(limit * 4);
    loop {
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        let slice = &text[..end];
        let estimate = approximate_tokens(slice);
        if estimate <= limit || end == 0 {
            return slice;
        }
        end -= (estimate - limit).max(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_model_counts_with_bpe() {
        let counter = TokenCounter::new();
        assert_eq!(counter.count_tokens("hello world", "gpt-4"), 2);
    }

    #[test]
    fn test_unknown_model_never_fails() {
        let counter = TokenCounter::new();
        let count = counter.count_tokens("hello world from kubepilot", "mystery-model-9000");
        assert!(count > 0);
        // 26 ASCII bytes at four bytes per token
        assert_eq!(count, 7);
    }

    #[test]
    fn test_unknown_model_cjk_weighting() {
        // Multi-byte text estimates at two bytes per token, so the same byte
        // count yields more tokens than ASCII.
        let ascii = approximate_tokens("aaaaaaaaaaaa");
        let cjk = approximate_tokens("集群状态");
        assert_eq!(ascii, 3);
        assert_eq!(cjk, 6);
    }

    #[test]
    fn test_truncate_within_limit_is_unchanged() {
        let counter = TokenCounter::new();
        let text = "short observation";
        assert_eq!(counter.truncate(text, "gpt-4", 1024), text);
    }

    #[test]
    fn test_truncate_drops_trailing_tokens() {
        let counter = TokenCounter::new();
        let text = "word ".repeat(500);
        let truncated = counter.truncate(&text, "gpt-4", 100);
        assert!(truncated.len() < text.len());
        assert!(counter.count_tokens(&truncated, "gpt-4") <= 100);
        assert!(text.starts_with(&truncated));
    }

    #[test]
    fn test_truncate_unknown_model() {
        let counter = TokenCounter::new();
        let text = "word ".repeat(500);
        let truncated = counter.truncate(&text, "mystery-model-9000", 50);
        assert!(counter.count_tokens(&truncated, "mystery-model-9000") <= 50);
        assert!(text.starts_with(&truncated));
    }

    #[test]
    fn test_trim_history_preserves_system_message() {
        let counter = TokenCounter::new();
        let mut messages = vec![Message::system("system prompt")];
        for i in 0..20 {
            messages.push(Message::user(format!(
                "observation number {i} with quite a few words in it"
            )));
        }

        let trimmed = counter.trim_history(messages, "gpt-4", 60);
        assert_eq!(trimmed[0], Message::system("system prompt"));
        assert!(counter.count_messages(&trimmed, "gpt-4") <= 60);
        // The newest messages survive
        assert!(trimmed.last().unwrap().content.contains("number 19"));
    }

    #[test]
    fn test_trim_history_keeps_oversized_system_message() {
        let counter = TokenCounter::new();
        let messages = vec![
            Message::system("a ".repeat(200)),
            Message::user("question"),
        ];
        let trimmed = counter.trim_history(messages, "gpt-4", 10);
        assert_eq!(trimmed.len(), 1);
        assert_eq!(trimmed[0].role, crate::models::message::Role::System);
    }

    #[test]
    fn test_trim_history_within_budget_is_unchanged() {
        let counter = TokenCounter::new();
        let messages = vec![Message::system("prompt"), Message::user("question")];
        let trimmed = counter.trim_history(messages.clone(), "gpt-4", 1000);
        assert_eq!(trimmed, messages);
    }
}
