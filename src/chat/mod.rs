use log::{ info, warn };

use crate::companion::{ should_extract_metrics, Companion };
use crate::error::{ CompanionError, Result };
use crate::models::{ Attachment, ChatMode, HealthMetric, Message };
use crate::storage::UserStorage;

/// Replaces the stored conversation with the mode greeting and returns it.
pub fn reset_chat(storage: &UserStorage, email: &str, mode: ChatMode) -> Result<Vec<Message>> {
    let messages = vec![Message::model(mode.greeting())];
    storage.save_chats(email, mode, &messages)?;
    info!("Cleared {} chat for {}", mode, email);
    Ok(messages)
}

/// What one exchange produced.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub reply: Message,
    pub metrics: Vec<HealthMetric>,
}

/// One user's conversation in one chat mode, persisted after every change.
pub struct ChatSession {
    storage: UserStorage,
    companion: Companion,
    email: String,
    mode: ChatMode,
    messages: Vec<Message>,
}

impl ChatSession {
    pub fn open(storage: UserStorage, companion: Companion, email: &str, mode: ChatMode) -> Self {
        let mut messages = storage.user_data(email).chat(mode).to_vec();
        if messages.is_empty() {
            messages.push(Message::model(mode.greeting()));
        }
        Self {
            storage,
            companion,
            email: email.to_string(),
            mode,
            messages,
        }
    }

    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn persist(&self) -> Result<()> {
        self.storage.save_chats(&self.email, self.mode, &self.messages)?;
        Ok(())
    }

    pub async fn send(&mut self, text: &str, attachments: Vec<Attachment>) -> Result<SendOutcome> {
        if text.trim().is_empty() && attachments.is_empty() {
            return Err(CompanionError::EmptyMessage);
        }

        let history_len = self.messages.len();
        let user_message = Message::user(text, attachments);
        self.messages.push(user_message.clone());
        self.persist()?;

        let health = self.storage.health_stats();
        let reply_text = self.companion.send_message(
            &self.messages[..history_len],
            &user_message.text,
            &user_message.attachments,
            health.as_ref(),
            self.mode
        ).await;
        let reply = Message::model(reply_text);
        self.messages.push(reply.clone());
        self.persist()?;

        let mut metrics = Vec::new();
        if should_extract_metrics(&user_message) {
            metrics = self.companion.extract_health_metrics(
                &user_message.text,
                user_message.attachments.first()
            ).await;
            if !metrics.is_empty() {
                if let Err(e) = self.storage.append_metrics(&metrics) {
                    warn!("Could not store extracted metrics: {}", e);
                }
            }
        }

        Ok(SendOutcome { reply, metrics })
    }

    /// Drops the conversation and starts over from the greeting.
    pub fn clear(&mut self) -> Result<()> {
        self.messages = reset_chat(&self.storage, &self.email, self.mode)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::companion::testing::ScriptedClient;
    use crate::companion::IMAGE_ONLY_PROMPT;
    use crate::config::prompt::PromptConfig;
    use crate::llm::LlmError;
    use crate::models::Role;
    use std::sync::Arc;

    fn session(
        replies: Vec<std::result::Result<String, LlmError>>
    ) -> (ChatSession, UserStorage, Arc<ScriptedClient>) {
        let storage = UserStorage::in_memory();
        storage.register_user("a@b.co").unwrap();
        let client = Arc::new(ScriptedClient::new(replies));
        let companion = Companion::new(client.clone(), Arc::new(PromptConfig::default()));
        let session = ChatSession::open(storage.clone(), companion, "a@b.co", ChatMode::Chat);
        (session, storage, client)
    }

    #[test]
    fn new_session_starts_with_greeting() {
        let (session, _, _) = session(vec![]);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::Model);
        assert_eq!(session.messages()[0].text, ChatMode::Chat.greeting());
    }

    #[tokio::test]
    async fn blank_message_is_rejected() {
        let (mut session, _, client) = session(vec![]);
        assert!(matches!(session.send("   ", Vec::new()).await, Err(CompanionError::EmptyMessage)));
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn exchange_is_persisted() {
        let (mut session, storage, client) = session(vec![Ok("Drink water.".into())]);
        let outcome = session.send("I have a headache", Vec::new()).await.unwrap();
        assert_eq!(outcome.reply.text, "Drink water.");
        assert!(outcome.metrics.is_empty());
        assert_eq!(client.request_count(), 1);

        // Greeting is history; the new text is the final turn.
        let req = client.request(0);
        assert_eq!(req.contents.len(), 2);
        assert_eq!(req.contents[1].parts[0].text.as_deref(), Some("I have a headache"));

        let saved = storage.user_data("a@b.co");
        let texts: Vec<_> = saved.chat(ChatMode::Chat).iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec![ChatMode::Chat.greeting(), "I have a headache", "Drink water."]);
    }

    #[tokio::test]
    async fn lab_values_trigger_metric_extraction() {
        let metrics = r#"{"metrics": [{"date": "2024-05-01", "value": 120, "unit": "mg/dL", "type": "Glucose"}]}"#;
        let (mut session, storage, client) = session(vec![Ok("Slightly high.".into()), Ok(metrics.into())]);
        let outcome = session.send("My glucose was 120", Vec::new()).await.unwrap();
        assert_eq!(outcome.metrics.len(), 1);
        assert_eq!(client.request_count(), 2);
        assert_eq!(storage.metrics().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn clear_resets_to_greeting() {
        let (mut session, storage, _) = session(vec![Ok("ok".into())]);
        session.send("hello", Vec::new()).await.unwrap();
        session.clear().unwrap();
        assert_eq!(session.messages().len(), 1);
        assert_eq!(storage.user_data("a@b.co").chat(ChatMode::Chat).len(), 1);
    }

    #[tokio::test]
    async fn image_only_turn_stays_in_later_requests() {
        let (mut session, _, client) = session(
            vec![Ok("A mild rash.".into()), Ok("[]".into()), Ok("Probably not.".into())]
        );
        let photo = Attachment::from_bytes("image/png", b"png", Some("arm.png".into()));
        session.send("", vec![photo]).await.unwrap();
        session.send("is it serious?", Vec::new()).await.unwrap();

        // Chat, metric extraction for the attachment, then chat again.
        assert_eq!(client.request_count(), 3);
        let req = client.request(2);
        let roles: Vec<_> = req.contents.iter().map(|c| c.role.as_str()).collect();
        assert_eq!(roles, vec!["model", "user", "model", "user"]);
        assert_eq!(req.contents[1].parts[0].text.as_deref(), Some(IMAGE_ONLY_PROMPT));
    }

    #[tokio::test]
    async fn user_text_is_stored_as_typed() {
        let (mut session, storage, _) = session(vec![Ok("ok".into())]);
        session.send("  two lines\nof text ", Vec::new()).await.unwrap();
        let saved = storage.user_data("a@b.co");
        assert_eq!(saved.chat(ChatMode::Chat)[1].text, "  two lines\nof text ");
    }
}
