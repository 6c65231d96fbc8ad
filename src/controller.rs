//! Top-level conversation orchestration, independent of any rendered view.
//!
//! The controller owns the session manager and the generation client. The
//! UI layer feeds it user input and drives the reveal animation; the
//! controller decides what enters the conversation and when it is persisted.

use crate::generate::{GenerateError, Generator};
use crate::session::{Message, SessionManager};

/// Outcome of a successful generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Non-empty response text, ready for the reveal animation.
    Text(String),
    /// Success status but empty text; shown as a notice, never saved.
    Empty,
}

pub struct ConversationController {
    sessions: SessionManager,
    generator: Box<dyn Generator>,
}

impl ConversationController {
    pub fn new(sessions: SessionManager, generator: Box<dyn Generator>) -> Self {
        Self {
            sessions,
            generator,
        }
    }

    /// Append the user message and ask the collaborator for a reply.
    ///
    /// The user message is recorded before the call, so it survives a
    /// failed or empty generation; persistence happens on `commit_reply`
    /// or, for failures, via `persist` from the caller.
    pub async fn submit(&mut self, input: &str) -> Result<Reply, GenerateError> {
        self.sessions.append_message(Message::user(input));
        let text = self.generator.generate(input).await?;
        if text.is_empty() {
            Ok(Reply::Empty)
        } else {
            Ok(Reply::Text(text))
        }
    }

    /// Record the finished assistant reply and persist the session. Called
    /// after the reveal animation completes, never with partial text.
    pub fn commit_reply(&mut self, text: &str) {
        self.sessions.append_message(Message::assistant(text));
        self.sessions.persist_active();
    }

    /// Persist whatever the active session currently holds. Used on the
    /// failure paths where no assistant message was produced.
    pub fn persist(&mut self) {
        self.sessions.persist_active();
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn sessions_mut(&mut self) -> &mut SessionManager {
        &mut self.sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::GenerateError;
    use crate::markup::{self, Block, Inline, ListKind};
    use crate::session::SessionManager;
    use crate::store::{MemoryStore, SessionStore};
    use async_trait::async_trait;

    struct CannedGenerator {
        reply: Result<String, (u16, String)>,
    }

    #[async_trait]
    impl Generator for CannedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerateError> {
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err((status, message)) => Err(GenerateError::Api {
                    status: *status,
                    message: message.clone(),
                }),
            }
        }
    }

    fn controller(reply: Result<String, (u16, String)>) -> ConversationController {
        let sessions = SessionManager::new(SessionStore::new(Box::new(MemoryStore::new())));
        ConversationController::new(sessions, Box::new(CannedGenerator { reply }))
    }

    #[tokio::test]
    async fn hello_scenario_end_to_end() {
        let reply_text = "Here is **bold** and:\n- a\n- b\n";
        let mut ctl = controller(Ok(reply_text.to_string()));

        let reply = ctl.submit("Hello").await.expect("generation succeeds");
        let Reply::Text(text) = reply else {
            panic!("expected text reply");
        };
        ctl.commit_reply(&text);

        let markup = markup::render(&text);
        assert_eq!(
            markup.blocks[0],
            Block::Paragraph(vec![
                Inline::Text("Here is ".into()),
                Inline::Bold("bold".into()),
                Inline::Text(" and:".into()),
            ])
        );
        assert!(matches!(
            &markup.blocks[1],
            Block::List { kind: ListKind::Unordered, items } if items.len() == 2
        ));

        let messages = ctl.sessions().active_messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].is_user);
        assert!(!messages[1].is_user);

        let summary = ctl
            .sessions()
            .list_sessions()
            .next()
            .expect("session was persisted");
        assert_eq!(summary.title, "Hello");
    }

    #[tokio::test]
    async fn empty_response_is_distinct_and_not_saved() {
        let mut ctl = controller(Ok(String::new()));
        let reply = ctl.submit("Hello").await.expect("generation succeeds");
        assert_eq!(reply, Reply::Empty);

        ctl.persist();
        let messages = ctl.sessions().active_messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].is_user);
    }

    #[tokio::test]
    async fn failed_generation_keeps_the_user_message() {
        let mut ctl = controller(Err((500, "Internal Server Error".into())));
        let err = ctl.submit("Hello").await.expect_err("generation fails");
        assert!(err.to_string().contains("500"));

        ctl.persist();
        let messages = ctl.sessions().active_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "Hello");

        let summary = ctl
            .sessions()
            .list_sessions()
            .next()
            .expect("user message persisted despite failure");
        assert_eq!(summary.title, "Hello");
    }
}
