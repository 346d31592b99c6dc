use crate::dto::{ChatReply, ChatRequest};
use crate::error::Result;
use crate::format::escape_html;

pub const WELCOME: &str = "Hello! I'm your CrisisConnect AI Assistant. How can I help you today?";
pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub author: Author,
    pub text: String,
}

impl ChatMessage {
    pub const fn class_name(&self) -> &'static str {
        match self.author {
            Author::User => "floating-chat-message user",
            Author::Assistant => "floating-chat-message assistant",
        }
    }

    pub fn html(&self) -> String {
        format!(
            r#"<div class="message-content">{}</div>"#,
            escape_html(&self.text)
        )
    }
}

/// Transcript of the floating chat. A turn is split in two so the caller
/// can await the backend without holding the session.
#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    is_new_chat: bool,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
            is_new_chat: true,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub const fn is_new_chat(&self) -> bool {
        self.is_new_chat
    }

    /// Greets the user the first time the chat is opened.
    pub fn open(&mut self) -> Option<&ChatMessage> {
        if !self.messages.is_empty() {
            return None;
        }
        self.messages.push(ChatMessage {
            author: Author::Assistant,
            text: WELCOME.to_string(),
        });
        self.messages.last()
    }

    /// Records the user's message and returns the request to send, or
    /// `None` for blank input.
    pub fn begin_turn(&mut self, text: &str) -> Option<ChatRequest> {
        if text.trim().is_empty() {
            return None;
        }
        self.messages.push(ChatMessage {
            author: Author::User,
            text: text.to_string(),
        });
        Some(ChatRequest {
            message: text.to_string(),
            is_new_chat: self.is_new_chat,
        })
    }

    /// Appends the assistant's answer, or the apology if the request failed.
    pub fn complete_turn(&mut self, reply: Result<ChatReply>) -> &ChatMessage {
        let text = match reply {
            Ok(reply) => {
                self.is_new_chat = false;
                reply.response
            }
            Err(error) => {
                log::error!("chat request failed: {error}");
                APOLOGY.to_string()
            }
        };
        self.messages.push(ChatMessage {
            author: Author::Assistant,
            text,
        });
        &self.messages[self.messages.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::backend::Backend;

    #[test]
    fn blank_input_sends_nothing() {
        let mut chat = ChatSession::new();
        assert!(chat.begin_turn("   ").is_none());
        assert!(chat.messages().is_empty());
    }

    #[test]
    fn welcome_only_greets_an_empty_chat() {
        let mut chat = ChatSession::new();
        assert_eq!(chat.open().map(|m| m.text.as_str()), Some(WELCOME));
        assert!(chat.open().is_none());
        assert_eq!(chat.messages().len(), 1);
    }

    #[test]
    fn messages_render_escaped() {
        let message = ChatMessage {
            author: Author::User,
            text: "<img src=x>".into(),
        };
        assert_eq!(message.class_name(), "floating-chat-message user");
        assert!(message.html().contains("&lt;img src=x&gt;"));
    }

    #[tokio::test]
    async fn successful_turn_ends_the_new_chat_flag() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let backend = FakeBackend {
            chat_reply: Some(r#"{"response": "Stay indoors.", "timestamp": "10:00"}"#.into()),
            ..FakeBackend::default()
        };
        let mut chat = ChatSession::new();

        for text in ["Is the bridge open?", "And the tunnel?"] {
            let request = chat.begin_turn(text).ok_or("turn not started")?;
            let reply = backend.post_chat(&request).await;
            chat.complete_turn(reply);
        }

        let sent = backend.chat_requests.borrow();
        assert!(sent[0].is_new_chat);
        assert!(!sent[1].is_new_chat);
        assert_eq!(chat.messages().len(), 4);
        assert_eq!(chat.messages()[1].text, "Stay indoors.");
        Ok(())
    }

    #[tokio::test]
    async fn failed_turn_apologises_and_stays_new() {
        let backend = FakeBackend::default();
        let mut chat = ChatSession::new();

        let request = chat.begin_turn("hello").unwrap();
        let reply = backend.post_chat(&request).await;
        let shown = chat.complete_turn(reply).clone();

        assert_eq!(shown.text, APOLOGY);
        assert_eq!(shown.author, Author::Assistant);
        assert!(chat.is_new_chat());
    }
}
