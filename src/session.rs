//! Per-session navigation state.
//!
//! Every user action becomes an [`Action`]; [`SessionState::apply`] is the
//! only place state changes happen. No I/O in here, which keeps the whole
//! page flow unit-testable: build a state, apply actions, assert.
//!
//! Sessions live in an in-memory token map and expire after
//! [`SESSION_TTL_HOURS`]; nothing about a session is persisted.

use crate::chatbot;
use crate::models::ChatMessage;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const SESSION_TTL_HOURS: i64 = 24;

/// The four screens of the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Registration,
    Doctor,
    Appointment,
    Availability,
}

/// Everything a user action can do to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Dispatched only after the store insert succeeded.
    RegistrationSucceeded,
    SelectDoctor(String),
    ConfirmAppointment { date: NaiveDate, slot: String },
    SelectHospital(String),
    GoToRegistration,
    GoToDoctors,
    GoToAvailability,
    ToggleChat,
    ChatSubmitted(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub page: Page,
    pub selected_doctor: Option<String>,
    pub selected_hospital: Option<String>,
    pub selected_date: Option<NaiveDate>,
    pub selected_time: Option<String>,
    pub chat_history: Vec<ChatMessage>,
    pub chat_open: bool,
    /// One-shot success banner, consumed by the next render.
    pub notice: Option<String>,
    /// One-shot validation/store errors, consumed by the next render.
    pub errors: Vec<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            page: Page::Registration,
            selected_doctor: None,
            selected_hospital: None,
            selected_date: None,
            selected_time: None,
            chat_history: Vec::new(),
            chat_open: false,
            notice: None,
            errors: Vec::new(),
        }
    }
}

impl SessionState {
    /// The navigation transition function. Exhaustive over [`Action`], so a
    /// new action cannot be forgotten here, and over [`Page`] where pages
    /// matter, so an unknown page cannot exist.
    pub fn apply(&mut self, action: Action) {
        match action {
            Action::RegistrationSucceeded => {
                self.page = Page::Doctor;
                self.notice =
                    Some("Registration successful! Thank you for registering.".to_string());
            }
            Action::SelectDoctor(name) => {
                self.selected_doctor = Some(name);
                self.page = Page::Appointment;
            }
            Action::ConfirmAppointment { date, slot } => {
                // Stays on the appointment page; nothing is persisted.
                let doctor = self.selected_doctor.as_deref().unwrap_or("our doctors");
                self.notice = Some(format!(
                    "Appointment scheduled with {} on {} at {}.",
                    doctor,
                    date.format("%Y-%m-%d"),
                    slot
                ));
                self.selected_date = Some(date);
                self.selected_time = Some(slot);
            }
            Action::SelectHospital(name) => {
                // Expands that hospital's card on the availability page.
                self.selected_hospital = Some(name);
            }
            Action::GoToRegistration => self.page = Page::Registration,
            Action::GoToDoctors => self.page = Page::Doctor,
            Action::GoToAvailability => self.page = Page::Availability,
            Action::ToggleChat => self.chat_open = !self.chat_open,
            Action::ChatSubmitted(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return;
                }
                let reply = chatbot::respond(text);
                self.chat_history.push(ChatMessage::user(text));
                self.chat_history.push(ChatMessage::bot(reply));
            }
        }
    }

    pub fn push_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub fn push_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Removes and returns the pending render feedback.
    pub fn take_feedback(&mut self) -> (Option<String>, Vec<String>) {
        (self.notice.take(), std::mem::take(&mut self.errors))
    }
}

struct Session {
    /// Stable id for log lines; the token is the lookup key.
    id: String,
    state: SessionState,
    created_at: DateTime<Utc>,
}

/// Token-keyed in-memory session map shared across handlers.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Creates a fresh session on the registration page; returns its token.
    pub fn create(&self) -> String {
        let token = generate_token();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            state: SessionState::default(),
            created_at: Utc::now(),
        };
        log::info!("[SESSION] created id={}", session.id);

        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(token.clone(), session);
        }
        token
    }

    /// Runs `f` against the session's state. Returns `None` when the token
    /// is unknown or the session has expired (expired entries are dropped).
    pub fn with_state<T>(&self, token: &str, f: impl FnOnce(&mut SessionState) -> T) -> Option<T> {
        let mut sessions = self.sessions.lock().ok()?;
        let expired = match sessions.get(token) {
            Some(session) => {
                Utc::now()
                    .signed_duration_since(session.created_at)
                    .num_hours()
                    >= SESSION_TTL_HOURS
            }
            None => return None,
        };
        if expired {
            if let Some(session) = sessions.remove(token) {
                log::info!("[SESSION] expired id={}", session.id);
            }
            return None;
        }
        sessions.get_mut(token).map(|session| f(&mut session.state))
    }

    /// Clone of the session state for rendering.
    pub fn snapshot(&self, token: &str) -> Option<SessionState> {
        self.with_state(token, |state| state.clone())
    }

    /// Applies one action; `false` when the session is unknown/expired.
    pub fn apply(&self, token: &str, action: Action) -> bool {
        self.with_state(token, |state| state.apply(action)).is_some()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_token() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..32)
        .map(|_| {
            let idx = rng.gen_range(0..36);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_starts_on_registration() {
        let state = SessionState::default();
        assert_eq!(state.page, Page::Registration);
        assert!(state.chat_history.is_empty());
        assert!(!state.chat_open);
    }

    #[test]
    fn test_full_booking_flow() {
        let mut state = SessionState::default();

        state.apply(Action::RegistrationSucceeded);
        assert_eq!(state.page, Page::Doctor);

        state.apply(Action::SelectDoctor("Dr. AK Verma".to_string()));
        assert_eq!(state.page, Page::Appointment);
        assert_eq!(state.selected_doctor.as_deref(), Some("Dr. AK Verma"));

        let date = NaiveDate::from_ymd_opt(2026, 8, 10).unwrap();
        state.apply(Action::ConfirmAppointment {
            date,
            slot: "11:00 AM".to_string(),
        });
        // Confirm stays on the appointment page.
        assert_eq!(state.page, Page::Appointment);
        assert_eq!(state.selected_date, Some(date));
        assert_eq!(state.selected_time.as_deref(), Some("11:00 AM"));
        let (notice, _) = state.take_feedback();
        assert_eq!(
            notice.as_deref(),
            Some("Appointment scheduled with Dr. AK Verma on 2026-08-10 at 11:00 AM.")
        );
    }

    #[test]
    fn test_back_navigation_keeps_selections() {
        let mut state = SessionState::default();
        state.apply(Action::RegistrationSucceeded);
        state.apply(Action::SelectDoctor("Dr. Ashi".to_string()));
        state.apply(Action::GoToDoctors);
        assert_eq!(state.page, Page::Doctor);
        assert_eq!(state.selected_doctor.as_deref(), Some("Dr. Ashi"));

        state.apply(Action::GoToAvailability);
        assert_eq!(state.page, Page::Availability);
        state.apply(Action::GoToRegistration);
        assert_eq!(state.page, Page::Registration);
    }

    #[test]
    fn test_select_hospital_stays_on_availability() {
        let mut state = SessionState::default();
        state.apply(Action::GoToAvailability);
        state.apply(Action::SelectHospital("VERMA Hospital".to_string()));
        assert_eq!(state.page, Page::Availability);
        assert_eq!(state.selected_hospital.as_deref(), Some("VERMA Hospital"));
    }

    #[test]
    fn test_chat_appends_user_message_then_reply() {
        let mut state = SessionState::default();
        state.apply(Action::ToggleChat);
        assert!(state.chat_open);

        state.apply(Action::ChatSubmitted("hello".to_string()));
        assert_eq!(state.chat_history.len(), 2);
        assert!(state.chat_history[0].is_user);
        assert_eq!(state.chat_history[0].text, "hello");
        assert!(!state.chat_history[1].is_user);
        assert_eq!(state.chat_history[1].text, crate::chatbot::GREETING_REPLY);

        // Blank input is ignored; transcript is append-only otherwise.
        state.apply(Action::ChatSubmitted("   ".to_string()));
        assert_eq!(state.chat_history.len(), 2);
    }

    #[test]
    fn test_feedback_is_one_shot() {
        let mut state = SessionState::default();
        state.push_error("Full name is required.");
        state.push_notice("done");

        let (notice, errors) = state.take_feedback();
        assert_eq!(notice.as_deref(), Some("done"));
        assert_eq!(errors, vec!["Full name is required.".to_string()]);

        let (notice, errors) = state.take_feedback();
        assert!(notice.is_none());
        assert!(errors.is_empty());
    }

    #[test]
    fn test_store_create_and_lookup() {
        let store = SessionStore::new();
        let token = store.create();

        assert!(store.apply(&token, Action::RegistrationSucceeded));
        let state = store.snapshot(&token).unwrap();
        assert_eq!(state.page, Page::Doctor);

        assert!(store.snapshot("no-such-token").is_none());
        assert!(!store.apply("no-such-token", Action::GoToDoctors));
    }
}
