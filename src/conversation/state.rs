//! Conversation buffer data.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::types::{ConversationTurn, TurnMetrics};

/// Ordered turns for one persona plus bookkeeping for idle reset.
///
/// `history` always starts with exactly one system turn holding `context`.
#[derive(Debug, Clone)]
pub struct ConversationState {
    context: String,
    pub(super) history: Vec<ConversationTurn>,
    pub(super) last_activity: DateTime<Utc>,
    pub(super) last_metrics: Option<TurnMetrics>,
}

impl ConversationState {
    pub fn new(context: impl Into<String>, now: DateTime<Utc>) -> Self {
        let context = context.into();
        Self {
            history: vec![ConversationTurn::system(context.clone())],
            context,
            last_activity: now,
            last_metrics: None,
        }
    }

    #[must_use]
    pub fn context(&self) -> &str {
        &self.context
    }

    #[must_use]
    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    #[must_use]
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    #[must_use]
    pub fn last_metrics(&self) -> Option<TurnMetrics> {
        self.last_metrics
    }

    /// Drop everything but a fresh system turn.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.history = vec![ConversationTurn::system(self.context.clone())];
        self.last_activity = now;
    }

    /// True when there is something to clear and the persona has been quiet
    /// for strictly longer than `threshold`.
    #[must_use]
    pub fn is_idle(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        if self.history.len() <= 1 {
            return false;
        }
        // A clock that went backwards reads as no time elapsed.
        let elapsed = (now - self.last_activity).to_std().unwrap_or_default();
        elapsed > threshold
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::types::MessageRole;

    fn busy_state(t0: DateTime<Utc>) -> ConversationState {
        let mut state = ConversationState::new("You are a helper.", t0);
        state.history.push(ConversationTurn::user("hello there friend"));
        state.history.push(ConversationTurn::assistant("Hi!"));
        state
    }

    #[test]
    fn starts_with_single_system_turn() {
        let state = ConversationState::new("You are a helper.", Utc::now());
        assert_eq!(state.history(), [ConversationTurn::system("You are a helper.")]);
        assert!(state.last_metrics().is_none());
    }

    #[test]
    fn reset_keeps_only_context() {
        let t0 = Utc::now();
        let mut state = busy_state(t0);
        let later = t0 + TimeDelta::seconds(5);

        state.reset(later);

        assert_eq!(state.history().len(), 1);
        assert_eq!(state.history()[0].role, MessageRole::System);
        assert_eq!(state.history()[0].content, state.context());
        assert_eq!(state.last_activity(), later);
    }

    #[test]
    fn idle_only_after_threshold_passes() {
        let t0 = Utc::now();
        let state = busy_state(t0);
        let threshold = Duration::from_secs(60);
        let epsilon = TimeDelta::milliseconds(10);

        assert!(!state.is_idle(t0 + TimeDelta::seconds(60) - epsilon, threshold));
        assert!(!state.is_idle(t0 + TimeDelta::seconds(60), threshold));
        assert!(state.is_idle(t0 + TimeDelta::seconds(60) + epsilon, threshold));
    }

    #[test]
    fn fresh_history_is_never_idle() {
        let t0 = Utc::now();
        let state = ConversationState::new("You are a helper.", t0);
        assert!(!state.is_idle(t0 + TimeDelta::days(1), Duration::from_secs(1)));
    }

    #[test]
    fn clock_going_backwards_is_not_idle() {
        let t0 = Utc::now();
        let state = busy_state(t0);
        assert!(!state.is_idle(t0 - TimeDelta::seconds(30), Duration::ZERO));
    }
}
