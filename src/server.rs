//! HTTP host (axum).
//!
//! Serves the four portal pages and the chat widget. Every user action is a
//! POST that resolves the session, validates input, applies an action and/or
//! calls the patient store, then redirects back to `/` for a fresh render.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use chrono::{NaiveDate, Utc};
use rust_embed::Embed;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};

use crate::catalog::{Catalog, Doctor, Hospital};
use crate::db::PatientStore;
use crate::error::AppError;
use crate::models::{Gender, NewPatient};
use crate::session::{Action, Page, SessionState, SessionStore};

/// Embedded static files (stylesheet, portraits).
#[derive(Embed)]
#[folder = "static/"]
struct StaticAssets;

/// Appointment slots offered on the scheduling page.
pub const TIME_SLOTS: [&str; 5] = ["09:00 AM", "11:00 AM", "01:00 PM", "03:00 PM", "05:00 PM"];

/// Scheduling window: today plus the following six days.
const APPOINTMENT_WINDOW_DAYS: i64 = 7;

/// Server state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PatientStore>,
    pub catalog: Arc<Catalog>,
    pub sessions: SessionStore,
    /// One-time store bootstrap notice, consumed by the first page render.
    store_notice: Arc<Mutex<Option<String>>>,
}

impl AppState {
    pub fn new(store: PatientStore, catalog: Catalog) -> Self {
        Self {
            store: Arc::new(store),
            catalog: Arc::new(catalog),
            sessions: SessionStore::new(),
            store_notice: Arc::new(Mutex::new(None)),
        }
    }

    pub fn set_store_notice(&self, notice: impl Into<String>) {
        if let Ok(mut pending) = self.store_notice.lock() {
            *pending = Some(notice.into());
        }
    }

    fn take_store_notice(&self) -> Option<String> {
        self.store_notice.lock().ok().and_then(|mut n| n.take())
    }
}

/// Build the router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/", get(index_handler))
        // form actions
        .route("/register", post(register_handler))
        .route("/navigate", post(navigate_handler))
        .route("/doctors/select", post(select_doctor_handler))
        .route("/appointment/confirm", post(confirm_appointment_handler))
        .route("/hospitals/select", post(select_hospital_handler))
        .route("/hospitals/directions", post(directions_handler))
        // chat widget
        .route("/chat/send", post(chat_send_handler))
        .route("/chat/toggle", post(chat_toggle_handler))
        // static assets
        .route("/static/{*path}", get(static_handler))
        .with_state(state)
}

/// Bind and serve until shutdown.
pub async fn start_server(port: u16, state: AppState) -> crate::error::AppResult<()> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state).layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    log::info!("[SERVER] listening on http://0.0.0.0:{}", port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Custom(format!("Server bind error: {}", e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Custom(format!("Server error: {}", e)))?;

    Ok(())
}

// ============ handlers ============

/// Health check (no store access).
async fn health_handler() -> &'static str {
    "OK"
}

#[derive(Deserialize)]
struct SessionQuery {
    session: Option<String>,
}

/// Resolve the session and render whichever page it is on. First contact
/// (or an expired token) creates a fresh session and redirects to it.
async fn index_handler(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Response {
    let token = query.session.unwrap_or_default();
    let Some((view, feedback)) = state.sessions.with_state(&token, |session| {
        let (notice, errors) = session.take_feedback();
        (session.clone(), (notice, errors))
    }) else {
        let token = state.sessions.create();
        return Redirect::to(&format!("/?session={}", token)).into_response();
    };

    let (notice, errors) = feedback;
    let mut notices: Vec<String> = Vec::new();
    if let Some(bootstrap) = state.take_store_notice() {
        notices.push(bootstrap);
    }
    notices.extend(notice);

    let page = match view.page {
        Page::Registration => render_registration_page(&state, &token, &view, &notices, &errors),
        Page::Doctor => render_doctor_page(&state.catalog, &token, &view, &notices, &errors),
        Page::Appointment => render_appointment_page(&token, &view, &notices, &errors),
        Page::Availability => {
            render_availability_page(&state.catalog, &token, &view, &notices, &errors)
        }
    };
    Html(page).into_response()
}

#[derive(Deserialize)]
struct RegisterForm {
    session: String,
    name: String,
    age: String,
    gender: String,
    locality: String,
}

/// Registration submit. Validation errors and store failures both leave the
/// session on the registration page; only a successful insert transitions.
async fn register_handler(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Response {
    let token = form.session.clone();
    if state.sessions.snapshot(&token).is_none() {
        return Redirect::to("/").into_response();
    }

    match validate_registration(&form) {
        Ok(patient) => match state.store.insert_patient(&patient) {
            Ok(_) => {
                state.sessions.apply(&token, Action::RegistrationSucceeded);
            }
            Err(e) => {
                log::error!("[SERVER] patient insert failed: {}", e);
                state.sessions.with_state(&token, |session| {
                    session.push_error("Registration failed. Please try again.")
                });
            }
        },
        Err(errors) => {
            state.sessions.with_state(&token, |session| {
                for error in errors {
                    session.push_error(error);
                }
            });
        }
    }

    Redirect::to(&format!("/?session={}", token)).into_response()
}

fn validate_registration(form: &RegisterForm) -> Result<NewPatient, Vec<String>> {
    let mut errors = Vec::new();

    let name = form.name.trim();
    if name.is_empty() {
        errors.push("Full name is required.".to_string());
    } else if name.len() > 100 {
        errors.push("Full name must be at most 100 characters.".to_string());
    }

    let age = match form.age.trim().parse::<i64>() {
        Ok(age) if (0..=120).contains(&age) => Some(age),
        Ok(_) => {
            errors.push("Age must be between 0 and 120.".to_string());
            None
        }
        Err(_) => {
            errors.push("Age is required.".to_string());
            None
        }
    };

    let gender = Gender::parse(&form.gender);
    if gender.is_none() {
        errors.push("Please select a valid gender.".to_string());
    }

    let locality = form.locality.trim();
    if locality.is_empty() {
        errors.push("Locality is required.".to_string());
    } else if locality.len() > 100 {
        errors.push("Locality must be at most 100 characters.".to_string());
    }

    match (age, gender) {
        (Some(age), Some(gender)) if errors.is_empty() => Ok(NewPatient {
            name: name.to_string(),
            age,
            gender,
            locality: locality.to_string(),
        }),
        _ => Err(errors),
    }
}

#[derive(Deserialize)]
struct NavigateForm {
    session: String,
    target: String,
}

/// Back/cross navigation buttons. The target set is closed; anything else
/// is rejected rather than silently rendering nothing.
async fn navigate_handler(
    State(state): State<AppState>,
    Form(form): Form<NavigateForm>,
) -> Response {
    let action = match form.target.as_str() {
        "registration" => Action::GoToRegistration,
        "doctors" => Action::GoToDoctors,
        "availability" => Action::GoToAvailability,
        other => {
            log::warn!("[SERVER] unknown navigation target '{}'", other);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    apply_or_restart(&state, &form.session, action)
}

#[derive(Deserialize)]
struct SelectDoctorForm {
    session: String,
    doctor: String,
}

async fn select_doctor_handler(
    State(state): State<AppState>,
    Form(form): Form<SelectDoctorForm>,
) -> Response {
    if state.catalog.doctor(&form.doctor).is_none() {
        log::warn!("[SERVER] unknown doctor '{}'", form.doctor);
        return StatusCode::BAD_REQUEST.into_response();
    }
    apply_or_restart(&state, &form.session, Action::SelectDoctor(form.doctor))
}

#[derive(Deserialize)]
struct ConfirmAppointmentForm {
    session: String,
    date: String,
    slot: String,
}

async fn confirm_appointment_handler(
    State(state): State<AppState>,
    Form(form): Form<ConfirmAppointmentForm>,
) -> Response {
    let Ok(date) = NaiveDate::parse_from_str(&form.date, "%Y-%m-%d") else {
        log::warn!("[SERVER] bad appointment date '{}'", form.date);
        return StatusCode::BAD_REQUEST.into_response();
    };
    if !TIME_SLOTS.contains(&form.slot.as_str()) {
        log::warn!("[SERVER] unknown time slot '{}'", form.slot);
        return StatusCode::BAD_REQUEST.into_response();
    }
    apply_or_restart(
        &state,
        &form.session,
        Action::ConfirmAppointment {
            date,
            slot: form.slot,
        },
    )
}

#[derive(Deserialize)]
struct SelectHospitalForm {
    session: String,
    hospital: String,
}

async fn select_hospital_handler(
    State(state): State<AppState>,
    Form(form): Form<SelectHospitalForm>,
) -> Response {
    if state.catalog.hospital(&form.hospital).is_none() {
        log::warn!("[SERVER] unknown hospital '{}'", form.hospital);
        return StatusCode::BAD_REQUEST.into_response();
    }
    apply_or_restart(&state, &form.session, Action::SelectHospital(form.hospital))
}

/// "Get Directions" stub: queues a notice for the next render.
async fn directions_handler(
    State(state): State<AppState>,
    Form(form): Form<SelectHospitalForm>,
) -> Response {
    if state.catalog.hospital(&form.hospital).is_none() {
        return StatusCode::BAD_REQUEST.into_response();
    }
    let applied = state.sessions.with_state(&form.session, |session| {
        session.push_notice(format!(
            "Opening directions to {} in your map application...",
            form.hospital
        ))
    });
    if applied.is_none() {
        return Redirect::to("/").into_response();
    }
    Redirect::to(&format!("/?session={}", form.session)).into_response()
}

#[derive(Deserialize)]
struct ChatSendForm {
    session: String,
    message: String,
}

async fn chat_send_handler(
    State(state): State<AppState>,
    Form(form): Form<ChatSendForm>,
) -> Response {
    apply_or_restart(&state, &form.session, Action::ChatSubmitted(form.message))
}

#[derive(Deserialize)]
struct ChatToggleForm {
    session: String,
}

async fn chat_toggle_handler(
    State(state): State<AppState>,
    Form(form): Form<ChatToggleForm>,
) -> Response {
    apply_or_restart(&state, &form.session, Action::ToggleChat)
}

/// Apply an action and redirect for a fresh render; an unknown or expired
/// session restarts at `/`.
fn apply_or_restart(state: &AppState, token: &str, action: Action) -> Response {
    if !state.sessions.apply(token, action) {
        return Redirect::to("/").into_response();
    }
    Redirect::to(&format!("/?session={}", token)).into_response()
}

/// Embedded static file handler.
async fn static_handler(Path(path): Path<String>) -> impl IntoResponse {
    match StaticAssets::get(&path) {
        Some(content) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref())], content.data.into_owned()).into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

// ============ page rendering ============

fn render_registration_page(
    state: &AppState,
    token: &str,
    view: &SessionState,
    notices: &[String],
    errors: &[String],
) -> String {
    let gender_options: String = Gender::ALL
        .iter()
        .map(|g| format!(r#"<option value="{0}">{0}</option>"#, g.as_str()))
        .collect();

    // Best-effort footer line; a store hiccup here must not block the form.
    let count_line = match state.store.count_patients() {
        Ok(count) => format!(r#"<p class="muted">{} patients registered so far.</p>"#, count),
        Err(e) => {
            log::warn!("[SERVER] patient count unavailable: {}", e);
            String::new()
        }
    };

    let body = format!(
        r#"<div class="content-box">
            <form method="post" action="/register">
                <input type="hidden" name="session" value="{token}">
                <div class="form-group">
                    <label for="name">Full Name</label>
                    <input type="text" id="name" name="name" placeholder="Enter your full name">
                </div>
                <div class="form-group">
                    <label for="age">Age</label>
                    <input type="number" id="age" name="age" min="0" max="120" step="1" placeholder="Enter your age">
                </div>
                <div class="form-group">
                    <label for="gender">Gender</label>
                    <select id="gender" name="gender">{gender_options}</select>
                </div>
                <div class="form-group">
                    <label for="locality">Locality</label>
                    <input type="text" id="locality" name="locality" placeholder="Enter your locality">
                </div>
                <button type="submit" class="btn">Register</button>
            </form>
            {count_line}
        </div>"#
    );

    page_shell(
        "Patient Registration",
        "Patient Registration Form",
        "Please fill out the form below to register.",
        &format!("{}{}", feedback_html(notices, errors), body),
        &chat_widget(token, view),
    )
}

fn render_doctor_page(
    catalog: &Catalog,
    token: &str,
    view: &SessionState,
    notices: &[String],
    errors: &[String],
) -> String {
    let mut body = feedback_html(notices, errors);
    for doctor in &catalog.doctors {
        body.push_str(&doctor_card(token, doctor));
    }
    body.push_str(&nav_buttons(
        token,
        &[
            ("registration", "Back to Registration"),
            ("availability", "Check Hospital Availability"),
        ],
    ));

    page_shell(
        "Doctor Information",
        "Our Expert Doctors",
        "Meet our team of experienced healthcare professionals",
        &body,
        &chat_widget(token, view),
    )
}

fn doctor_card(token: &str, doctor: &Doctor) -> String {
    let name = escape_html(&doctor.name);
    format!(
        r#"<div class="listing">
            {image}
            <div class="doctor-box">
                <h3>{name}</h3>
                <p><strong>Specialty:</strong> {specialty}</p>
                <p><strong>About:</strong> {description}</p>
                <form method="post" action="/doctors/select">
                    <input type="hidden" name="session" value="{token}">
                    <input type="hidden" name="doctor" value="{name}">
                    <button type="submit" class="btn">Schedule with {name}</button>
                </form>
            </div>
        </div>"#,
        image = image_html(&doctor.image, &doctor.name, "🧑‍⚕️"),
        specialty = escape_html(&doctor.specialty),
        description = escape_html(&doctor.description),
    )
}

fn render_appointment_page(
    token: &str,
    view: &SessionState,
    notices: &[String],
    errors: &[String],
) -> String {
    let doctor_box = match view.selected_doctor.as_deref() {
        Some(doctor) => format!(
            r#"<div class="content-box"><h3>Appointment with {}</h3></div>"#,
            escape_html(doctor)
        ),
        None => String::new(),
    };

    let date_options: String = appointment_dates()
        .iter()
        .map(|d| format!(r#"<option value="{0}">{0}</option>"#, d.format("%Y-%m-%d")))
        .collect();
    let slot_options: String = TIME_SLOTS
        .iter()
        .map(|slot| format!(r#"<option value="{0}">{0}</option>"#, slot))
        .collect();

    let body = format!(
        r#"{feedback}{doctor_box}
        <div class="content-box">
            <form method="post" action="/appointment/confirm">
                <input type="hidden" name="session" value="{token}">
                <div class="form-group">
                    <label for="date">Choose a date</label>
                    <select id="date" name="date">{date_options}</select>
                </div>
                <div class="form-group">
                    <label for="slot">Choose a time slot</label>
                    <select id="slot" name="slot">{slot_options}</select>
                </div>
                <button type="submit" class="btn">Confirm Appointment</button>
            </form>
        </div>
        {nav}"#,
        feedback = feedback_html(notices, errors),
        nav = nav_buttons(
            token,
            &[
                ("doctors", "Back to Doctors"),
                ("availability", "Check Hospital Availability"),
            ],
        ),
    );

    page_shell(
        "Doctor Appointment",
        "Doctor Appointment Scheduling",
        "Please select a date and time to schedule your appointment.",
        &body,
        &chat_widget(token, view),
    )
}

fn render_availability_page(
    catalog: &Catalog,
    token: &str,
    view: &SessionState,
    notices: &[String],
    errors: &[String],
) -> String {
    let schedule_line = match (&view.selected_date, &view.selected_time) {
        (Some(date), Some(time)) => format!(
            "Checking availability for {} at {}...",
            date.format("%Y-%m-%d"),
            escape_html(time)
        ),
        _ => "No appointment scheduled yet. Please schedule an appointment first.".to_string(),
    };

    let mut body = format!(
        r#"{}<div class="content-box">
            <h3>Hospital Availability Status</h3>
            <p>Real-time availability of our network hospitals</p>
            <p>{}</p>
        </div>"#,
        feedback_html(notices, errors),
        schedule_line
    );
    for hospital in &catalog.hospitals {
        let expanded = view.selected_hospital.as_deref() == Some(hospital.name.as_str());
        body.push_str(&hospital_card(token, hospital, expanded));
    }
    body.push_str(&nav_buttons(
        token,
        &[
            ("doctors", "Back to Doctors"),
            ("registration", "Back to Registration"),
        ],
    ));

    page_shell(
        "Hospital Availability",
        "Hospital Availability",
        "Check hospital availability and nearby options",
        &body,
        &chat_widget(token, view),
    )
}

fn hospital_card(token: &str, hospital: &Hospital, expanded: bool) -> String {
    let name = escape_html(&hospital.name);
    let (status, badge_class, box_class) = if hospital.available {
        ("Available", "available-badge", "available")
    } else {
        ("Not Available", "not-available-badge", "not-available")
    };
    let beds = if hospital.available { hospital.beds } else { 0 };
    let details = if expanded {
        format!(
            r#"<p class="details-note">Contact the front desk at {} to confirm bed availability.</p>"#,
            escape_html(&hospital.phone)
        )
    } else {
        String::new()
    };

    format!(
        r#"<div class="listing">
            {image}
            <div class="hospital-box {box_class}">
                <h3>{name} <span class="badge {badge_class}">{status}</span></h3>
                <p><strong>Address:</strong> {address}</p>
                <p><strong>Phone:</strong> {phone}</p>
                <p><strong>Available Beds:</strong> {beds}</p>
                <p><strong>Specialties:</strong> {specialties}</p>
                {details}
                <div class="card-actions">
                    <form method="post" action="/hospitals/select">
                        <input type="hidden" name="session" value="{token}">
                        <input type="hidden" name="hospital" value="{name}">
                        <button type="submit" class="btn">View Details</button>
                    </form>
                    <form method="post" action="/hospitals/directions">
                        <input type="hidden" name="session" value="{token}">
                        <input type="hidden" name="hospital" value="{name}">
                        <button type="submit" class="btn secondary">Get Directions</button>
                    </form>
                </div>
            </div>
        </div>"#,
        image = image_html(&hospital.image, &hospital.name, "🏥"),
        address = escape_html(&hospital.address),
        phone = escape_html(&hospital.phone),
        specialties = escape_html(&hospital.specialties.join(", ")),
    )
}

// ============ rendering helpers ============

fn page_shell(title: &str, heading: &str, subtitle: &str, body: &str, chat: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="/static/style.css">
</head>
<body>
    <div class="container">
        <div class="heading-box">
            <h1>{heading}</h1>
            <p>{subtitle}</p>
        </div>
        {body}
    </div>
    {chat}
</body>
</html>"#
    )
}

fn feedback_html(notices: &[String], errors: &[String]) -> String {
    let mut out = String::new();
    for notice in notices {
        out.push_str(&format!(
            r#"<div class="banner success">{}</div>"#,
            escape_html(notice)
        ));
    }
    for error in errors {
        out.push_str(&format!(
            r#"<div class="banner error">{}</div>"#,
            escape_html(error)
        ));
    }
    out
}

fn nav_buttons(token: &str, targets: &[(&str, &str)]) -> String {
    let buttons: String = targets
        .iter()
        .map(|(target, label)| {
            format!(
                r#"<form method="post" action="/navigate">
                    <input type="hidden" name="session" value="{token}">
                    <input type="hidden" name="target" value="{target}">
                    <button type="submit" class="btn secondary">{label}</button>
                </form>"#
            )
        })
        .collect();
    format!(r#"<div class="nav-row">{}</div>"#, buttons)
}

/// Image pass-through with per-item degradation: a missing asset logs a
/// warning and renders a placeholder instead of failing the page.
fn image_html(path: &str, alt: &str, placeholder: &str) -> String {
    if StaticAssets::get(path).is_some() {
        format!(
            r#"<img class="portrait" src="/static/{path}" alt="{alt}" width="150">"#,
            alt = escape_html(alt)
        )
    } else {
        log::warn!("[SERVER] could not load image {}", path);
        format!(r#"<div class="portrait placeholder">{placeholder}</div>"#)
    }
}

fn chat_widget(token: &str, view: &SessionState) -> String {
    if !view.chat_open {
        return format!(
            r#"<form class="chat-toggle" method="post" action="/chat/toggle">
                <input type="hidden" name="session" value="{token}">
                <button type="submit" title="Healthcare Assistant">💬</button>
            </form>"#
        );
    }

    let messages: String = view
        .chat_history
        .iter()
        .map(|msg| {
            let class = if msg.is_user { "user-message" } else { "bot-message" };
            format!(
                r#"<div class="message-container"><div class="{}">{}</div></div>"#,
                class,
                escape_html(&msg.text).replace('\n', "<br>")
            )
        })
        .collect();

    format!(
        r#"<div class="chatbot-container">
            <div class="chatbot-header">
                <span>Healthcare Assistant</span>
                <form method="post" action="/chat/toggle">
                    <input type="hidden" name="session" value="{token}">
                    <button type="submit" class="chat-close">×</button>
                </form>
            </div>
            <div class="chatbot-messages">{messages}</div>
            <form class="chatbot-input" method="post" action="/chat/send">
                <input type="hidden" name="session" value="{token}">
                <input type="text" name="message" placeholder="Type your message..." autocomplete="off">
                <button type="submit" class="btn">Send</button>
            </form>
        </div>"#
    )
}

fn appointment_dates() -> Vec<NaiveDate> {
    let today = Utc::now().date_naive();
    (0..APPOINTMENT_WINDOW_DAYS)
        .map(|offset| today + chrono::Duration::days(offset))
        .collect()
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
