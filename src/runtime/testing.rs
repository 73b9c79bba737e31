//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use super::{StoreHandle, StoreRuntime, StoreUpdate};
use crate::catalog::{Mood, Persona};
use crate::generation::{FragmentStream, GenerationClient, GenerationError};
use crate::store::state::ChatMessage;
use crate::store::{AppState, PersistedSnapshot, StoreContext};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

// ============================================================================
// Mock Generation Client
// ============================================================================

/// How a queued reply stream behaves
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Yield each fragment, then end
    Fragments(Vec<String>),
    /// Fail before any fragment
    FailOpen(GenerationError),
    /// Yield fragments, then fail mid-stream
    FailAfter(Vec<String>, GenerationError),
    /// Yield fragments, then never finish
    Hang(Vec<String>),
}

impl ScriptedReply {
    pub fn fragments(parts: &[&str]) -> Self {
        Self::Fragments(parts.iter().map(ToString::to_string).collect())
    }
}

/// Sets its flag when the owning stream is dropped
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Mock generation client that returns queued results
#[allow(dead_code)]
pub struct MockGenerationClient {
    replies: Mutex<VecDeque<ScriptedReply>>,
    welcomes: Mutex<VecDeque<Result<String, GenerationError>>>,
    summaries: Mutex<VecDeque<Result<String, GenerationError>>>,
    challenges: Mutex<VecDeque<Result<String, GenerationError>>>,
    /// History passed to each reply request
    pub reply_requests: Mutex<Vec<Vec<ChatMessage>>>,
    /// Set once a reply stream has been dropped
    pub stream_dropped: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl MockGenerationClient {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            welcomes: Mutex::new(VecDeque::new()),
            summaries: Mutex::new(VecDeque::new()),
            challenges: Mutex::new(VecDeque::new()),
            reply_requests: Mutex::new(Vec::new()),
            stream_dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn queue_reply(&self, reply: ScriptedReply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn queue_welcome(&self, result: Result<String, GenerationError>) {
        self.welcomes.lock().unwrap().push_back(result);
    }

    pub fn queue_summary(&self, result: Result<String, GenerationError>) {
        self.summaries.lock().unwrap().push_back(result);
    }

    pub fn queue_challenge(&self, result: Result<String, GenerationError>) {
        self.challenges.lock().unwrap().push_back(result);
    }

    pub fn recorded_reply_requests(&self) -> Vec<Vec<ChatMessage>> {
        self.reply_requests.lock().unwrap().clone()
    }

    fn pop(
        queue: &Mutex<VecDeque<Result<String, GenerationError>>>,
    ) -> Result<String, GenerationError> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::network("No mock response queued")))
    }
}

impl Default for MockGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationClient for MockGenerationClient {
    async fn stream_reply(
        &self,
        _persona: &Persona,
        _mood: Option<&Mood>,
        history: &[ChatMessage],
    ) -> Result<FragmentStream, GenerationError> {
        self.reply_requests.lock().unwrap().push(history.to_vec());
        let script = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                ScriptedReply::FailOpen(GenerationError::network("No mock reply queued"))
            });

        let guard = DropFlag(self.stream_dropped.clone());
        let stream: FragmentStream = match script {
            ScriptedReply::Fragments(parts) => {
                futures::stream::iter(parts.into_iter().map(Ok)).boxed()
            }
            ScriptedReply::FailOpen(e) => return Err(e),
            ScriptedReply::FailAfter(parts, e) => futures::stream::iter(
                parts.into_iter().map(Ok).chain(std::iter::once(Err(e))),
            )
            .boxed(),
            ScriptedReply::Hang(parts) => futures::stream::iter(parts.into_iter().map(Ok))
                .chain(futures::stream::pending())
                .boxed(),
        };
        Ok(stream
            .map(move |item| {
                let _guard = &guard;
                item
            })
            .boxed())
    }

    async fn welcome_message(
        &self,
        _persona: &Persona,
        _mood: &Mood,
    ) -> Result<String, GenerationError> {
        Self::pop(&self.welcomes)
    }

    async fn chat_summary(
        &self,
        _persona_name: &str,
        _history: &[ChatMessage],
    ) -> Result<String, GenerationError> {
        Self::pop(&self.summaries)
    }

    async fn daily_challenge(&self) -> Result<String, GenerationError> {
        Self::pop(&self.challenges)
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

// ============================================================================
// In-Memory Snapshot Store
// ============================================================================

/// Snapshot store that keeps the last write in memory
#[derive(Default)]
pub struct InMemorySnapshotStore {
    snapshot: Mutex<Option<PersistedSnapshot>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
    fail_loads: AtomicBool,
    set_aside: Mutex<Vec<PersistedSnapshot>>,
}

#[allow(dead_code)]
impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<PersistedSnapshot> {
        self.snapshot.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every later save fail
    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }

    /// Make loads fail until the snapshot is set aside
    pub fn fail_loads(&self) {
        self.fail_loads.store(true, Ordering::SeqCst);
    }

    pub fn seed(&self, snapshot: PersistedSnapshot) {
        *self.snapshot.lock().unwrap() = Some(snapshot);
    }

    pub fn set_aside_count(&self) -> usize {
        self.set_aside.lock().unwrap().len()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, snapshot: &PersistedSnapshot) -> Result<(), String> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err("disk full".to_string());
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.snapshot.lock().unwrap() = Some(snapshot.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<PersistedSnapshot>, String> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err("Snapshot serialization error: expected value".to_string());
        }
        Ok(self.last())
    }

    async fn set_aside(&self) -> Result<(), String> {
        if let Some(snapshot) = self.snapshot.lock().unwrap().take() {
            self.set_aside.lock().unwrap().push(snapshot);
        }
        self.fail_loads.store(false, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Fixed Clock
// ============================================================================

/// Clock that only moves when told to
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

#[allow(dead_code)]
impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance_days(&self, days: i64) {
        let mut now = self.now.lock().unwrap();
        *now += ChronoDuration::days(days);
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::new(Utc.with_ymd_and_hms(2026, 4, 2, 10, 0, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// ============================================================================
// Test Store Builder
// ============================================================================

/// Helper for building test stores with minimal boilerplate
pub struct TestStore {
    pub handle: StoreHandle,
    pub generation: Arc<MockGenerationClient>,
    pub snapshots: Arc<InMemorySnapshotStore>,
    pub clock: Arc<FixedClock>,
    pub updates: broadcast::Receiver<StoreUpdate>,
    _runtime_handle: tokio::task::JoinHandle<()>,
}

impl TestStore {
    pub fn builder() -> TestStoreBuilder {
        TestStoreBuilder::default()
    }
}

#[derive(Default)]
pub struct TestStoreBuilder {
    state: Option<AppState>,
    generation: Option<MockGenerationClient>,
}

impl TestStoreBuilder {
    pub fn state(mut self, state: AppState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn generation(mut self, generation: MockGenerationClient) -> Self {
        self.generation = Some(generation);
        self
    }

    pub fn build(self) -> TestStore {
        let generation = Arc::new(self.generation.unwrap_or_default());
        let snapshots = Arc::new(InMemorySnapshotStore::new());
        let clock = Arc::new(FixedClock::default());

        let (runtime, handle) = StoreRuntime::new(
            StoreContext::default(),
            self.state.unwrap_or_default(),
            generation.clone(),
            snapshots.clone(),
            clock.clone(),
        );
        let updates = handle.subscribe();
        let runtime_handle = tokio::spawn(async move {
            runtime.run().await;
        });

        TestStore {
            handle,
            generation,
            snapshots,
            clock,
            updates,
            _runtime_handle: runtime_handle,
        }
    }
}

#[allow(dead_code)]
impl TestStore {
    /// Dispatch an action that must be accepted
    pub async fn act(&self, action: crate::store::Action) {
        self.handle
            .dispatch(action)
            .await
            .expect("action should be accepted");
    }

    /// Wait until the latest state satisfies `predicate`
    pub async fn wait_for(
        &self,
        predicate: impl Fn(&AppState) -> bool,
        timeout: Duration,
    ) -> bool {
        let mut rx = self.handle.watch();
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let current = Arc::clone(&rx.borrow_and_update());
            if predicate(current.as_ref()) {
                return true;
            }
            match tokio::time::timeout_at(deadline, rx.changed()).await {
                Ok(Ok(())) => continue,
                _ => return false,
            }
        }
    }

    /// Wait for an achievement notification
    pub async fn wait_for_unlock(&mut self, achievement_id: &str, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.updates.recv()).await {
                Ok(Ok(StoreUpdate::AchievementUnlocked { achievement_id: id }))
                    if id == achievement_id =>
                {
                    return true
                }
                _ => continue,
            }
        }
        false
    }

    /// Walk from the welcome screen into a chat
    pub async fn open_chat(&self, persona_id: &str, mood_id: Option<&str>) {
        use crate::store::Action;
        self.act(Action::GoToSelectionScreen).await;
        self.act(Action::SelectPersona {
            persona_id: persona_id.to_string(),
        })
        .await;
        self.act(Action::StartChatting {
            mood_id: mood_id.map(String::from),
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GenerationErrorKind;
    use crate::runtime::StoreError;
    use crate::store::state::{MessageStatus, Screen, Sender};
    use crate::store::{Action, TransitionError, SUMMARY_FALLBACK};

    const WAIT: Duration = Duration::from_secs(2);

    fn send(text: &str) -> Action {
        Action::SendMessage {
            text: text.to_string(),
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_mock_generation_client() {
        let mock = MockGenerationClient::new();
        mock.queue_reply(ScriptedReply::fragments(&["a", "b"]));
        let persona = crate::catalog::persona("noor").unwrap();

        let stream = mock.stream_reply(persona, None, &[]).await.unwrap();
        let parts: Vec<_> = stream.collect().await;
        assert_eq!(parts, vec![Ok("a".to_string()), Ok("b".to_string())]);
        assert!(mock.stream_dropped.load(Ordering::SeqCst));

        // Nothing queued: opening fails
        assert!(mock.stream_reply(persona, None, &[]).await.is_err());
        assert_eq!(mock.recorded_reply_requests().len(), 2);
    }

    /// Integration test: a streamed reply lands as one AI message
    #[tokio::test]
    async fn test_streamed_reply() {
        let generation = MockGenerationClient::new();
        generation.queue_reply(ScriptedReply::fragments(&["Hi ", "there"]));
        let store = TestStore::builder().generation(generation).build();

        store.open_chat("noor", None).await;
        store.act(send("hello")).await;

        assert!(
            store
                .wait_for(|s| !s.is_loading && s.chat_history.len() == 3, WAIT)
                .await
        );
        let state = store.handle.snapshot();
        let reply = state.chat_history.last().unwrap();
        assert_eq!(reply.sender, Sender::Ai);
        assert_eq!(reply.text, "Hi there");
        assert!(!reply.is_streaming);

        // The request carried the welcome and the new message
        let requests = store.generation.recorded_reply_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].len(), 2);
        assert_eq!(requests[0][1].text, "hello");

        // Write-through: the last persisted snapshot holds the finished reply
        let persisted = store.snapshots.last().unwrap();
        assert_eq!(persisted.chat_history.last().unwrap().text, "Hi there");
        assert!(persisted.chat_history.iter().all(|m| !m.is_streaming));
    }

    /// Integration test: failure before the first fragment
    #[tokio::test]
    async fn test_reply_failure_marks_message() {
        let generation = MockGenerationClient::new();
        generation.queue_reply(ScriptedReply::FailOpen(GenerationError::from_status(
            503,
            "overloaded",
        )));
        let store = TestStore::builder().generation(generation).build();

        store.open_chat("salma", None).await;
        store.act(send("are you there?")).await;

        assert!(
            store
                .wait_for(
                    |s| !s.is_loading
                        && s.chat_history
                            .last()
                            .is_some_and(|m| m.status == Some(MessageStatus::Failed)),
                    WAIT
                )
                .await
        );
        assert_eq!(store.handle.snapshot().chat_history.len(), 2);
    }

    /// Integration test: a stream that ends without text is a failure
    #[tokio::test]
    async fn test_empty_reply_stream_marks_message() {
        let generation = MockGenerationClient::new();
        generation.queue_reply(ScriptedReply::Fragments(vec![]));
        let store = TestStore::builder().generation(generation).build();

        store.open_chat("noor", None).await;
        store.act(send("hello")).await;

        assert!(
            store
                .wait_for(
                    |s| !s.is_loading && s.chat_history.last().is_some_and(|m| m.is_failed()),
                    WAIT
                )
                .await
        );
        let state = store.handle.snapshot();
        assert_eq!(state.chat_history.len(), 2);
        let origin = state.chat_history.last().unwrap();
        assert_eq!(origin.sender, Sender::User);
        assert_eq!(origin.text, "hello");
        // Only the welcome is from the persona
        let ai_count = state
            .chat_history
            .iter()
            .filter(|m| m.sender == Sender::Ai)
            .count();
        assert_eq!(ai_count, 1);
        assert!(state.in_flight.is_none());
    }

    /// Integration test: a broken stream drops the partial reply, retry recovers
    #[tokio::test]
    async fn test_mid_stream_failure_then_retry() {
        let generation = MockGenerationClient::new();
        generation.queue_reply(ScriptedReply::FailAfter(
            vec!["par".to_string()],
            GenerationError::stream("reset"),
        ));
        generation.queue_reply(ScriptedReply::fragments(&["whole reply"]));
        let store = TestStore::builder().generation(generation).build();

        store.open_chat("noor", None).await;
        store.act(send("hello")).await;
        assert!(
            store
                .wait_for(|s| !s.is_loading && s.chat_history.iter().any(|m| m.is_failed()), WAIT)
                .await
        );
        let state = store.handle.snapshot();
        assert!(state.chat_history.iter().all(|m| m.text != "par"));
        let failed_id = state.chat_history.last().unwrap().id.clone();

        store
            .act(Action::RetryMessage {
                message_id: failed_id.clone(),
            })
            .await;
        assert!(
            store
                .wait_for(
                    |s| !s.is_loading && s.chat_history.last().is_some_and(|m| m.text == "whole reply"),
                    WAIT
                )
                .await
        );
        let state = store.handle.snapshot();
        assert_eq!(
            state.chat_history.iter().filter(|m| m.id == failed_id).count(),
            1
        );
        assert!(state.chat_history.iter().all(|m| !m.is_failed()));
    }

    /// Integration test: leaving the chat mid-stream cancels generation
    #[tokio::test]
    async fn test_go_back_cancels_stream() {
        let generation = MockGenerationClient::new();
        generation.queue_reply(ScriptedReply::Hang(vec!["Hel".to_string()]));
        let store = TestStore::builder().generation(generation).build();

        store.open_chat("hana", None).await;
        store.act(send("hello")).await;
        assert!(
            store
                .wait_for(|s| s.chat_history.last().is_some_and(|m| m.is_streaming), WAIT)
                .await
        );

        store.act(Action::GoBack).await;
        let state = store.handle.snapshot();
        assert_eq!(state.screen, Screen::Selection);
        assert!(state.chat_history.is_empty());
        assert!(!state.is_loading);

        // The generation task observes the token and drops its stream
        let deadline = tokio::time::Instant::now() + WAIT;
        while !store.generation.stream_dropped.load(Ordering::SeqCst) {
            assert!(tokio::time::Instant::now() < deadline, "stream was never dropped");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(store.handle.snapshot().chat_history.is_empty());
    }

    #[tokio::test]
    async fn test_send_while_streaming_is_rejected() {
        let generation = MockGenerationClient::new();
        generation.queue_reply(ScriptedReply::Hang(vec![]));
        let mut store = TestStore::builder().generation(generation).build();

        store.open_chat("noor", None).await;
        store.act(send("one")).await;
        let err = store.handle.dispatch(send("two")).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(TransitionError::Busy)));

        // Subscribers hear about the rejection too
        let mut saw_rejection = false;
        while let Ok(update) = store.updates.try_recv() {
            saw_rejection |= matches!(update, StoreUpdate::Rejected { .. });
        }
        assert!(saw_rejection);
    }

    #[tokio::test]
    async fn test_mood_welcome_and_fallback() {
        let generation = MockGenerationClient::new();
        generation.queue_welcome(Ok("I'm glad you came, let's slow down together.".to_string()));
        generation.queue_welcome(Err(GenerationError::new(
            GenerationErrorKind::Auth,
            "bad key",
        )));
        let store = TestStore::builder().generation(generation).build();

        store.open_chat("noor", Some("anxious")).await;
        assert!(
            store
                .wait_for(|s| !s.is_loading && s.chat_history.len() == 1, WAIT)
                .await
        );
        assert_eq!(
            store.handle.snapshot().chat_history[0].text,
            "I'm glad you came, let's slow down together."
        );

        store.act(Action::GoBack).await;
        store
            .act(Action::SelectPersona {
                persona_id: "layla".to_string(),
            })
            .await;
        store
            .act(Action::StartChatting {
                mood_id: Some("tired".to_string()),
            })
            .await;
        assert!(
            store
                .wait_for(|s| !s.is_loading && s.chat_history.len() == 1, WAIT)
                .await
        );
        assert_eq!(
            store.handle.snapshot().chat_history[0].text,
            crate::catalog::persona("layla").unwrap().welcome_message
        );
    }

    #[tokio::test]
    async fn test_save_chat_with_fallback_summary() {
        let generation = MockGenerationClient::new();
        generation.queue_reply(ScriptedReply::fragments(&["I hear you."]));
        generation.queue_summary(Err(GenerationError::network("offline")));
        let mut store = TestStore::builder().generation(generation).build();

        store.open_chat("noor", None).await;
        store.act(send("rough day")).await;
        assert!(store.wait_for(|s| !s.is_loading, WAIT).await);

        store.act(Action::SaveCurrentChat).await;
        assert!(store.wait_for(|s| s.saved_chats.len() == 1, WAIT).await);
        let state = store.handle.snapshot();
        assert_eq!(state.saved_chats[0].summary, SUMMARY_FALLBACK);
        assert_eq!(state.saved_chats[0].chat_history.len(), 3);
        assert!(!state.is_loading);
        assert!(store.wait_for_unlock("chat_1", WAIT).await);
    }

    #[tokio::test]
    async fn test_login_streak_and_challenge() {
        let generation = MockGenerationClient::new();
        generation.queue_challenge(Ok("Take a five minute walk.".to_string()));
        generation.queue_challenge(Ok("Write down one kind thought.".to_string()));
        let store = TestStore::builder().generation(generation).build();

        store.act(Action::Login).await;
        assert!(
            store
                .wait_for(|s| s.daily_challenge.is_some(), WAIT)
                .await
        );
        let state = store.handle.snapshot();
        assert!(state.is_authenticated);
        assert_eq!(state.daily_streak.count, 1);
        assert_eq!(
            state.daily_challenge.as_ref().unwrap().text,
            "Take a five minute walk."
        );

        store.act(Action::CompleteDailyChallenge).await;
        store.clock.advance_days(1);
        store.act(Action::Login).await;
        assert!(
            store
                .wait_for(
                    |s| s
                        .daily_challenge
                        .as_ref()
                        .is_some_and(|c| c.text == "Write down one kind thought."),
                    WAIT
                )
                .await
        );
        let state = store.handle.snapshot();
        assert_eq!(state.daily_streak.count, 2);
        assert!(!state.daily_challenge.as_ref().unwrap().completed);
        assert_eq!(state.completed_challenge_dates.len(), 1);
    }

    #[tokio::test]
    async fn test_persistence_failure_is_not_fatal() {
        let store = TestStore::builder().build();
        store.snapshots.fail_saves();

        store.act(Action::CompleteOnboarding).await;
        store
            .act(Action::AddJournalEntry {
                title: "Today".to_string(),
                content: "Better than yesterday".to_string(),
            })
            .await;

        let state = store.handle.snapshot();
        assert!(state.onboarding_completed);
        assert_eq!(state.journal_entries.len(), 1);
        assert_eq!(store.snapshots.save_count(), 0);
    }

    #[tokio::test]
    async fn test_restored_snapshot_resumes_ids() {
        let mut previous = AppState {
            screen: Screen::Chat,
            selected_persona: Some("noor".to_string()),
            ..AppState::default()
        };
        for text in ["one", "two"] {
            let id = previous.allocate_id("user");
            previous
                .chat_history
                .push(ChatMessage::user(id, text, None));
        }
        let restored = PersistedSnapshot::from(&previous).into_state();

        let generation = MockGenerationClient::new();
        generation.queue_reply(ScriptedReply::fragments(&["ok"]));
        let store = TestStore::builder()
            .state(restored)
            .generation(generation)
            .build();

        store.act(send("three")).await;
        assert!(store.wait_for(|s| !s.is_loading, WAIT).await);
        let state = store.handle.snapshot();
        let mut ids: Vec<&str> = state.chat_history.iter().map(|m| m.id.as_str()).collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
        assert_eq!(total, 4);
    }

    #[tokio::test]
    async fn test_runtime_stops_when_handles_are_dropped() {
        let generation = MockGenerationClient::new();
        generation.queue_reply(ScriptedReply::Hang(vec![]));
        let (runtime, handle) = StoreRuntime::new(
            StoreContext::default(),
            AppState::default(),
            generation,
            InMemorySnapshotStore::new(),
            FixedClock::default(),
        );
        let task = tokio::spawn(runtime.run());

        // A reply still streaming holds the channel only until it is cancelled
        handle.dispatch(Action::GoToSelectionScreen).await.unwrap();
        handle
            .dispatch(Action::SelectPersona {
                persona_id: "noor".to_string(),
            })
            .await
            .unwrap();
        handle
            .dispatch(Action::StartChatting { mood_id: None })
            .await
            .unwrap();
        handle.dispatch(send("hello")).await.unwrap();
        handle.dispatch(Action::GoBack).await.unwrap();
        drop(handle);

        let stopped = tokio::time::timeout(WAIT, task).await;
        assert!(matches!(stopped, Ok(Ok(()))));
    }
}
