//! Character sheet endpoints

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::{AppState, ErrorResponse};
use crate::character::{
    AbilitySet, CharacterError, CharacterInit, ProficiencySet, ServiceError, SpecialAbility,
};
use crate::images::PortraitError;

/// Build the character router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/character", post(create_character))
        .route("/characters", get(list_characters))
        .route(
            "/characters/{name}",
            get(get_character).delete(delete_character),
        )
        .route("/characters/{name}/image", get(character_image))
        .route("/characters/{name}/damage", post(damage))
        .route("/characters/{name}/heal", post(heal))
        .route("/characters/{name}/abilities", post(add_ability))
        .route(
            "/characters/{name}/abilities/{ability}",
            delete(remove_ability),
        )
        .route(
            "/characters/{name}/proficiency-bonus",
            put(update_proficiency_bonus),
        )
        .route("/characters/{name}/stats", put(update_stats))
        .route("/characters/{name}/randomize", post(randomize))
        .route("/characters/{name}/move", post(move_character))
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::Character(CharacterError::MissingAbilityData(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => {
                error!("Character operation failed: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_response(status, self)
    }
}

impl IntoResponse for PortraitError {
    fn into_response(self) -> Response {
        let status = match &self {
            PortraitError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            PortraitError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            _ => {
                warn!("Portrait generation failed: {}", self);
                StatusCode::BAD_GATEWAY
            }
        };
        error_response(status, self)
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CharacterList {
    pub characters: Vec<String>,
}

/// Hit point change
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProficiencyBonusRequest {
    pub proficiency_bonus: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsRequest {
    pub stats: AbilitySet,
    #[serde(default, alias = "proficiencies")]
    pub skill_proficiencies: Option<ProficiencySet>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RandomizeRequest {
    #[serde(alias = "proficiencies")]
    pub skill_proficiencies: Option<ProficiencySet>,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub distance: i32,
}

/// Create (or re-initialize) a character
async fn create_character(
    State(state): State<AppState>,
    Json(init): Json<CharacterInit>,
) -> Result<impl IntoResponse, ServiceError> {
    state.characters.create(init).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Character created successfully".to_string(),
        }),
    ))
}

async fn list_characters(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let characters = state.characters.list().await?;
    Ok(Json(CharacterList { characters }))
}

async fn get_character(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.characters.get(&name).await?))
}

async fn delete_character(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    state.characters.delete(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Generate a portrait from the character's description
async fn character_image(Path(name): Path<String>, State(state): State<AppState>) -> Response {
    let prompt = match state.characters.portrait_prompt(&name).await {
        Ok(prompt) => prompt,
        Err(e) => return e.into_response(),
    };

    match state.portraits.generate(&name, &prompt).await {
        Ok(image) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, image.mime_type)],
            image.data,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn damage(
    Path(name): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<AmountRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.characters.damage(&name, req.amount).await?))
}

async fn heal(
    Path(name): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<AmountRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.characters.heal(&name, req.amount).await?))
}

async fn add_ability(
    Path(name): Path<String>,
    State(state): State<AppState>,
    Json(ability): Json<SpecialAbility>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.characters.add_ability(&name, ability).await?))
}

async fn remove_ability(
    Path((name, ability)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.characters.remove_ability(&name, &ability).await?))
}

async fn update_proficiency_bonus(
    Path(name): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<ProficiencyBonusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(
        state
            .characters
            .update_proficiency_bonus(&name, req.proficiency_bonus)
            .await?,
    ))
}

async fn update_stats(
    Path(name): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<StatsRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(
        state
            .characters
            .update_stats(&name, req.stats, req.skill_proficiencies)
            .await?,
    ))
}

async fn randomize(
    Path(name): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<RandomizeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(
        state
            .characters
            .randomize_stats(&name, req.skill_proficiencies)
            .await?,
    ))
}

async fn move_character(
    Path(name): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<MoveRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let message = state.characters.move_by(&name, req.distance).await?;
    Ok(Json(MessageResponse { message }))
}
