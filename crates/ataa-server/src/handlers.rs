use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    auth::{unauthorized, AuthClaims},
    store::model::{
        self, AboutContent, ContactContent, DonateContent, HeroSlide, Initiative, Message,
        Program, VisionMission, VolunteerContent,
    },
    token, AppState,
};

const MAX_FIELD_LEN: usize = 2_000;
const MAX_MESSAGE_LEN: usize = 10_000;

// ── Health ────────────────────────────────────────────────────────────────────

pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

// ── Auth ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Exchange the administrator credential for a bearer token. Wrong username
/// and wrong password produce the identical generic response.
pub async fn login(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> Response {
    let doc = match state.store.load() {
        Ok(doc) => doc,
        Err(e) => return internal_error(e),
    };

    // The password derivation runs unconditionally so a bad username costs
    // the same time as a bad password.
    let password_ok = token::verify_password(&body.password, &doc.credential.password_hash);
    if !password_ok || body.username != doc.credential.username {
        warn!(username = %body.username, "failed dashboard login");
        return unauthorized();
    }

    let mut claims = token::Claims::new();
    claims.insert("username".to_owned(), body.username.clone().into());
    let token = state.tokens.issue(&claims, state.token_ttl_secs);

    info!(username = %body.username, "dashboard login");
    Json(json!({"token": token, "expiresIn": state.token_ttl_secs})).into_response()
}

/// Authenticated no-op the dashboard calls on load to validate a stored token.
pub async fn verify_session(Extension(claims): Extension<AuthClaims>) -> Response {
    let username = claims.0.get("username").cloned().unwrap_or_default();
    Json(json!({"ok": true, "username": username})).into_response()
}

// ── Public content ───────────────────────────────────────────────────────────

/// The whole document minus the credential, for the public site.
pub async fn get_content(State(state): State<AppState>) -> Response {
    match state.store.load() {
        Ok(doc) => Json(doc.public_view()).into_response(),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Contact-form submission — the one unauthenticated mutation.
pub async fn create_message(
    State(state): State<AppState>,
    Json(body): Json<CreateMessageRequest>,
) -> Response {
    if body.message.trim().is_empty() {
        return bad_request("message must not be empty");
    }
    if body.name.len() > MAX_FIELD_LEN
        || body.email.len() > MAX_FIELD_LEN
        || body.message.len() > MAX_MESSAGE_LEN
    {
        return bad_request("message too long");
    }

    let result = state.store.update(|doc| {
        let id = model::allocate_id(doc.messages.iter().map(|m| m.id));
        let msg = Message::new(id, body.name.clone(), body.email.clone(), body.message.clone());
        doc.messages.push(msg.clone());
        msg
    });

    match result {
        Ok(msg) => {
            info!(id = msg.id, "contact message received");
            (StatusCode::CREATED, Json(msg)).into_response()
        }
        Err(e) => internal_error(e),
    }
}

// ── Singleton sections ───────────────────────────────────────────────────────

pub async fn get_about(State(state): State<AppState>) -> Response {
    section(&state, |doc| Json(doc.about).into_response())
}

pub async fn put_about(State(state): State<AppState>, Json(body): Json<AboutContent>) -> Response {
    match state.store.update(|doc| doc.about = body.clone()) {
        Ok(()) => Json(body).into_response(),
        Err(e) => internal_error(e),
    }
}

pub async fn get_contact(State(state): State<AppState>) -> Response {
    section(&state, |doc| Json(doc.contact).into_response())
}

pub async fn put_contact(
    State(state): State<AppState>,
    Json(body): Json<ContactContent>,
) -> Response {
    match state.store.update(|doc| doc.contact = body.clone()) {
        Ok(()) => Json(body).into_response(),
        Err(e) => internal_error(e),
    }
}

pub async fn get_vision(State(state): State<AppState>) -> Response {
    section(&state, |doc| Json(doc.vision).into_response())
}

pub async fn put_vision(
    State(state): State<AppState>,
    Json(body): Json<VisionMission>,
) -> Response {
    match state.store.update(|doc| doc.vision = body.clone()) {
        Ok(()) => Json(body).into_response(),
        Err(e) => internal_error(e),
    }
}

pub async fn get_mission(State(state): State<AppState>) -> Response {
    section(&state, |doc| Json(doc.mission).into_response())
}

pub async fn put_mission(
    State(state): State<AppState>,
    Json(body): Json<VisionMission>,
) -> Response {
    match state.store.update(|doc| doc.mission = body.clone()) {
        Ok(()) => Json(body).into_response(),
        Err(e) => internal_error(e),
    }
}

pub async fn get_donate(State(state): State<AppState>) -> Response {
    section(&state, |doc| Json(doc.donate).into_response())
}

pub async fn put_donate(
    State(state): State<AppState>,
    Json(body): Json<DonateContent>,
) -> Response {
    match state.store.update(|doc| doc.donate = body.clone()) {
        Ok(()) => Json(body).into_response(),
        Err(e) => internal_error(e),
    }
}

pub async fn get_volunteer(State(state): State<AppState>) -> Response {
    section(&state, |doc| Json(doc.volunteer).into_response())
}

pub async fn put_volunteer(
    State(state): State<AppState>,
    Json(body): Json<VolunteerContent>,
) -> Response {
    match state.store.update(|doc| doc.volunteer = body.clone()) {
        Ok(()) => Json(body).into_response(),
        Err(e) => internal_error(e),
    }
}

/// Load the document and project one section out of it.
fn section(
    state: &AppState,
    project: impl FnOnce(crate::store::ContentDocument) -> Response,
) -> Response {
    match state.store.load() {
        Ok(doc) => project(doc),
        Err(e) => internal_error(e),
    }
}

// ── Hero slides ──────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeroSlidePayload {
    pub title: String,
    pub subtitle: String,
    pub src: String,
    pub href: String,
}

pub async fn list_hero(State(state): State<AppState>) -> Response {
    section(&state, |doc| Json(doc.hero_slides).into_response())
}

pub async fn create_hero(
    State(state): State<AppState>,
    Json(body): Json<HeroSlidePayload>,
) -> Response {
    if body.title.trim().is_empty() {
        return bad_request("title is required");
    }

    let result = state.store.update(|doc| {
        let slide = HeroSlide {
            id: model::allocate_id(doc.hero_slides.iter().map(|s| s.id)),
            title: body.title.clone(),
            subtitle: body.subtitle.clone(),
            src: body.src.clone(),
            href: body.href.clone(),
        };
        doc.hero_slides.push(slide.clone());
        slide
    });

    match result {
        Ok(slide) => {
            info!(id = slide.id, "hero slide created");
            (StatusCode::CREATED, Json(slide)).into_response()
        }
        Err(e) => internal_error(e),
    }
}

pub async fn update_hero(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<HeroSlidePayload>,
) -> Response {
    let result = state.store.update(|doc| {
        doc.hero_slides.iter_mut().find(|s| s.id == id).map(|s| {
            s.title = body.title.clone();
            s.subtitle = body.subtitle.clone();
            s.src = body.src.clone();
            s.href = body.href.clone();
            s.clone()
        })
    });

    match result {
        Ok(Some(slide)) => Json(slide).into_response(),
        Ok(None) => not_found(),
        Err(e) => internal_error(e),
    }
}

pub async fn delete_hero(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    delete_by_id(&state, id, |doc, id| {
        let before = doc.hero_slides.len();
        doc.hero_slides.retain(|s| s.id != id);
        doc.hero_slides.len() < before
    })
}

// ── Initiatives ──────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitiativePayload {
    pub title: String,
    pub desc: String,
    pub tag: String,
    pub amount: String,
    pub image: String,
    pub link: String,
}

pub async fn list_initiatives(State(state): State<AppState>) -> Response {
    section(&state, |doc| Json(doc.initiatives).into_response())
}

pub async fn create_initiative(
    State(state): State<AppState>,
    Json(body): Json<InitiativePayload>,
) -> Response {
    if body.title.trim().is_empty() {
        return bad_request("title is required");
    }

    let result = state.store.update(|doc| {
        let item = Initiative {
            id: model::allocate_id(doc.initiatives.iter().map(|i| i.id)),
            title: body.title.clone(),
            desc: body.desc.clone(),
            tag: body.tag.clone(),
            amount: body.amount.clone(),
            image: body.image.clone(),
            link: body.link.clone(),
        };
        doc.initiatives.push(item.clone());
        item
    });

    match result {
        Ok(item) => {
            info!(id = item.id, "initiative created");
            (StatusCode::CREATED, Json(item)).into_response()
        }
        Err(e) => internal_error(e),
    }
}

pub async fn update_initiative(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<InitiativePayload>,
) -> Response {
    let result = state.store.update(|doc| {
        doc.initiatives.iter_mut().find(|i| i.id == id).map(|i| {
            i.title = body.title.clone();
            i.desc = body.desc.clone();
            i.tag = body.tag.clone();
            i.amount = body.amount.clone();
            i.image = body.image.clone();
            i.link = body.link.clone();
            i.clone()
        })
    });

    match result {
        Ok(Some(item)) => Json(item).into_response(),
        Ok(None) => not_found(),
        Err(e) => internal_error(e),
    }
}

pub async fn delete_initiative(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    delete_by_id(&state, id, |doc, id| {
        let before = doc.initiatives.len();
        doc.initiatives.retain(|i| i.id != id);
        doc.initiatives.len() < before
    })
}

// ── Programs ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgramPayload {
    pub title: String,
    pub desc: String,
    pub icon: String,
    pub image: String,
    pub link: String,
}

pub async fn list_programs(State(state): State<AppState>) -> Response {
    section(&state, |doc| Json(doc.programs).into_response())
}

pub async fn create_program(
    State(state): State<AppState>,
    Json(body): Json<ProgramPayload>,
) -> Response {
    if body.title.trim().is_empty() {
        return bad_request("title is required");
    }

    let result = state.store.update(|doc| {
        let item = Program {
            id: model::allocate_id(doc.programs.iter().map(|p| p.id)),
            title: body.title.clone(),
            desc: body.desc.clone(),
            icon: body.icon.clone(),
            image: body.image.clone(),
            link: body.link.clone(),
        };
        doc.programs.push(item.clone());
        item
    });

    match result {
        Ok(item) => {
            info!(id = item.id, "program created");
            (StatusCode::CREATED, Json(item)).into_response()
        }
        Err(e) => internal_error(e),
    }
}

pub async fn update_program(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ProgramPayload>,
) -> Response {
    let result = state.store.update(|doc| {
        doc.programs.iter_mut().find(|p| p.id == id).map(|p| {
            p.title = body.title.clone();
            p.desc = body.desc.clone();
            p.icon = body.icon.clone();
            p.image = body.image.clone();
            p.link = body.link.clone();
            p.clone()
        })
    });

    match result {
        Ok(Some(item)) => Json(item).into_response(),
        Ok(None) => not_found(),
        Err(e) => internal_error(e),
    }
}

pub async fn delete_program(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    delete_by_id(&state, id, |doc, id| {
        let before = doc.programs.len();
        doc.programs.retain(|p| p.id != id);
        doc.programs.len() < before
    })
}

// ── Messages (dashboard) ─────────────────────────────────────────────────────

pub async fn list_messages(State(state): State<AppState>) -> Response {
    section(&state, |doc| Json(doc.messages).into_response())
}

pub async fn delete_message(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    delete_by_id(&state, id, |doc, id| {
        let before = doc.messages.len();
        doc.messages.retain(|m| m.id != id);
        doc.messages.len() < before
    })
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn delete_by_id(
    state: &AppState,
    id: i64,
    remove: impl FnOnce(&mut crate::store::ContentDocument, i64) -> bool,
) -> Response {
    match state.store.update(|doc| remove(doc, id)) {
        Ok(true) => {
            info!(id, "record deleted");
            Json(json!({"deleted": true})).into_response()
        }
        Ok(false) => not_found(),
        Err(e) => internal_error(e),
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response()
}

fn bad_request(msg: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"error": msg}))).into_response()
}

fn internal_error(e: anyhow::Error) -> Response {
    tracing::error!(error = %e, "internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "internal server error"})),
    )
        .into_response()
}
