//! Turn-taking between a persona's history and the completion API.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::Mutex;

use crate::completion::CompletionClient;
use crate::error::Result;
use crate::types::{ConversationTurn, Persona, TurnMetrics};

use super::state::ConversationState;

/// Outcome of a successful turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    /// Trimmed assistant text.
    pub text: String,
    pub metrics: TurnMetrics,
    /// History length after the assistant turn was appended.
    pub history_len: usize,
}

/// Owns one persona's conversation and serializes every mutation of it.
///
/// `chat` holds the state lock across the remote call, so overlapping turns on
/// the same persona run one after another and `reset` waits for an in-flight
/// turn to finish.
pub struct ConversationEngine {
    persona: Persona,
    client: Arc<dyn CompletionClient>,
    state: Mutex<ConversationState>,
}

impl ConversationEngine {
    pub fn new(
        persona: Persona,
        context: impl Into<String>,
        client: Arc<dyn CompletionClient>,
    ) -> Self {
        Self {
            persona,
            client,
            state: Mutex::new(ConversationState::new(context, Utc::now())),
        }
    }

    #[must_use]
    pub fn persona(&self) -> Persona {
        self.persona
    }

    /// Send `user_text` as the next user turn and return the model's reply.
    ///
    /// The caller guarantees `user_text` is non-empty. On failure the user turn
    /// is removed again, leaving history as it was before the call.
    ///
    /// # Errors
    ///
    /// Returns the completion client's error when the remote round-trip fails.
    pub async fn chat(&self, user_text: &str) -> Result<ChatReply> {
        self.turn(user_text, false).await
    }

    /// Like [`chat`](Self::chat), but resets the history first without
    /// letting another turn in between.
    ///
    /// # Errors
    ///
    /// Returns the completion client's error when the remote round-trip fails.
    pub async fn chat_fresh(&self, user_text: &str) -> Result<ChatReply> {
        self.turn(user_text, true).await
    }

    async fn turn(&self, user_text: &str, fresh: bool) -> Result<ChatReply> {
        let mut state = self.state.lock().await;
        if fresh {
            self.reset_locked(&mut state, Utc::now());
        }
        let start = Instant::now();

        state.history.push(ConversationTurn::user(user_text));
        info!("[{}] ▼ New message: {user_text}", self.persona);
        debug!(
            "[{}] Sending {} turns to completion API",
            self.persona,
            state.history.len()
        );

        let completion = match self.client.complete(&state.history).await {
            Ok(completion) => completion,
            Err(e) => {
                state.history.pop();
                warn!(
                    "[{}] Completion failed, user turn rolled back: {e}",
                    self.persona
                );
                return Err(e);
            }
        };

        let reply = completion.content.trim().to_string();
        info!("[{}] ▲ Reply: {reply}", self.persona);
        state.history.push(ConversationTurn::assistant(reply.clone()));

        let metrics = TurnMetrics {
            latency: start.elapsed(),
            prompt_tokens: completion.prompt_tokens,
            completion_tokens: completion.completion_tokens,
            total_tokens: completion.total_tokens,
        };
        state.last_activity = Utc::now();
        state.last_metrics = Some(metrics);

        Ok(ChatReply {
            text: reply,
            metrics,
            history_len: state.history.len(),
        })
    }

    /// Replace the history with a fresh system turn.
    ///
    /// Returns the number of turns dropped, not counting the system turn.
    pub async fn reset(&self) -> usize {
        let mut state = self.state.lock().await;
        self.reset_locked(&mut state, Utc::now())
    }

    /// Reset when the persona has been idle longer than `threshold`.
    ///
    /// A persona with a turn in flight is busy, not idle, and is skipped.
    pub fn reset_if_idle(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        let Ok(mut state) = self.state.try_lock() else {
            debug!("[{}] Turn in flight, skipping idle check", self.persona);
            return false;
        };
        if !state.is_idle(now, threshold) {
            return false;
        }
        self.reset_locked(&mut state, now);
        true
    }

    fn reset_locked(&self, state: &mut ConversationState, now: DateTime<Utc>) -> usize {
        let dropped = state.history.len().saturating_sub(1);
        state.reset(now);
        info!("[{}] Context reset ({dropped} turns dropped)", self.persona);
        dropped
    }

    pub async fn context(&self) -> String {
        self.state.lock().await.context().to_string()
    }

    /// Snapshot of the current history.
    #[cfg(test)]
    pub async fn history(&self) -> Vec<ConversationTurn> {
        self.state.lock().await.history().to_vec()
    }

    pub async fn history_len(&self) -> usize {
        self.state.lock().await.history().len()
    }

    pub async fn last_metrics(&self) -> Option<TurnMetrics> {
        self.state.lock().await.last_metrics()
    }

    pub async fn last_activity(&self) -> DateTime<Utc> {
        self.state.lock().await.last_activity()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use chrono::TimeDelta;
    use reqwest::StatusCode;

    use super::*;
    use crate::completion::Completion;
    use crate::error::BotError;
    use crate::types::MessageRole;

    /// Replies with canned text and records every history it was sent.
    struct ScriptedClient {
        reply: Option<String>,
        seen: StdMutex<Vec<Vec<ConversationTurn>>>,
    }

    impl ScriptedClient {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(reply.to_string()),
                seen: StdMutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                seen: StdMutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<Vec<ConversationTurn>> {
            self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, history: &[ConversationTurn]) -> Result<Completion> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(history.to_vec());
            }
            match &self.reply {
                Some(reply) => Ok(Completion {
                    content: reply.clone(),
                    prompt_tokens: 20,
                    completion_tokens: 5,
                    total_tokens: 25,
                }),
                None => Err(BotError::CompletionApi {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "boom".to_string(),
                }),
            }
        }
    }

    fn engine(client: Arc<ScriptedClient>) -> ConversationEngine {
        ConversationEngine::new(Persona::Default, "You are a helper.", client)
    }

    #[tokio::test]
    async fn successful_chat_appends_user_and_assistant() -> Result<()> {
        let client = ScriptedClient::replying("  Hello!\n");
        let engine = engine(client.clone());

        let reply = engine.chat("hi there").await?;

        assert_eq!(reply.text, "Hello!");
        assert_eq!(reply.history_len, 3);
        assert_eq!(
            engine.history().await,
            vec![
                ConversationTurn::system("You are a helper."),
                ConversationTurn::user("hi there"),
                ConversationTurn::assistant("Hello!"),
            ]
        );
        assert_eq!(
            client.requests(),
            vec![vec![
                ConversationTurn::system("You are a helper."),
                ConversationTurn::user("hi there"),
            ]]
        );
        Ok(())
    }

    #[tokio::test]
    async fn each_turn_grows_history_by_two() -> Result<()> {
        let engine = engine(ScriptedClient::replying("sure"));
        for expected in [3, 5, 7] {
            let before = engine.history_len().await;
            engine.chat("tell me more please").await?;
            assert_eq!(engine.history_len().await, before + 2);
            assert_eq!(engine.history_len().await, expected);
        }
        Ok(())
    }

    #[tokio::test]
    async fn records_metrics_after_turn() -> Result<()> {
        let engine = engine(ScriptedClient::replying("ok"));
        assert!(engine.last_metrics().await.is_none());

        let reply = engine.chat("what time is it").await?;
        let metrics = engine.last_metrics().await.ok_or(BotError::Config(
            "metrics missing".to_string(),
        ))?;

        assert_eq!(metrics, reply.metrics);
        assert_eq!(
            (metrics.prompt_tokens, metrics.completion_tokens, metrics.total_tokens),
            (20, 5, 25)
        );
        Ok(())
    }

    #[tokio::test]
    async fn failed_chat_rolls_back_user_turn() {
        let engine = engine(ScriptedClient::failing());
        let before = engine.history().await;

        let result = engine.chat("will this work").await;

        assert!(matches!(result, Err(ref e) if e.is_completion_failure()));
        assert_eq!(engine.history().await, before);
        assert!(engine.last_metrics().await.is_none());
    }

    #[tokio::test]
    async fn reset_restores_system_turn() -> Result<()> {
        let engine = engine(ScriptedClient::replying("ok"));
        engine.chat("first question here").await?;
        engine.chat("second question here").await?;

        let dropped = engine.reset().await;

        assert_eq!(dropped, 4);
        let history = engine.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, MessageRole::System);
        assert_eq!(history[0].content, engine.context().await);
        Ok(())
    }

    #[tokio::test]
    async fn idle_reset_respects_threshold() -> Result<()> {
        let engine = engine(ScriptedClient::replying("ok"));
        engine.chat("hello there friend").await?;
        let t0 = engine.last_activity().await;
        let threshold = Duration::from_secs(30);

        assert!(!engine.reset_if_idle(t0 + TimeDelta::seconds(29), threshold));
        assert_eq!(engine.history_len().await, 3);

        assert!(engine.reset_if_idle(t0 + TimeDelta::seconds(31), threshold));
        assert_eq!(engine.history_len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn fresh_turn_starts_from_system_turn() -> Result<()> {
        let client = ScriptedClient::replying("Hello!");
        let engine = engine(client.clone());
        engine.chat("an earlier unrelated question").await?;

        engine.chat_fresh("hi there").await?;

        let last_request = client.requests().pop().unwrap_or_default();
        assert_eq!(
            last_request,
            vec![
                ConversationTurn::system("You are a helper."),
                ConversationTurn::user("hi there"),
            ]
        );
        assert_eq!(
            engine.history().await,
            vec![
                ConversationTurn::system("You are a helper."),
                ConversationTurn::user("hi there"),
                ConversationTurn::assistant("Hello!"),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_turns_are_serialized() -> Result<()> {
        let client = ScriptedClient::replying("ok");
        let engine = Arc::new(engine(client.clone()));

        let a = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.chat("first concurrent message").await }
        });
        let b = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.chat("second concurrent message").await }
        });
        a.await.map_err(|e| BotError::Config(e.to_string()))??;
        b.await.map_err(|e| BotError::Config(e.to_string()))??;

        let history = engine.history().await;
        assert_eq!(history.len(), 5);
        let roles: Vec<MessageRole> = history.iter().map(|turn| turn.role).collect();
        assert_eq!(
            roles,
            [
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User,
                MessageRole::Assistant,
            ]
        );
        // The second request saw the first turn's reply.
        let requests = client.requests();
        assert_eq!(requests[0].len(), 2);
        assert_eq!(requests[1].len(), 4);
        Ok(())
    }
}
