//! Room management calls: the facilitator toggle and AI participants.
//!
//! Each successful call is mirrored into the conversation store right away.
//! The server also pushes the authoritative values on later events, which
//! overwrite whatever was applied here.

use room_protocol::{AiParticipantAdded, AiParticipantRemoved, FacilitatorToggle};
use tracing::{debug, info};

use crate::endpoints::{Endpoints, failure_reason};
use crate::error::ControlError;
use crate::store::ConversationStore;

#[derive(Clone)]
pub struct RoomControls {
    http: reqwest::Client,
    endpoints: Endpoints,
    store: ConversationStore,
}

impl RoomControls {
    pub fn new(http: reqwest::Client, endpoints: Endpoints, store: ConversationStore) -> Self {
        Self {
            http,
            endpoints,
            store,
        }
    }

    /// Enable or disable the facilitator. Returns the server's resulting flag.
    pub async fn toggle_facilitator(&self, room_id: &str, enable: bool) -> Result<bool, ControlError> {
        require_room(room_id)?;
        let url = self.endpoints.facilitator_url(room_id, enable);
        debug!(room_id, enable, "toggling facilitator");

        let response = self.http.post(url).send().await?;
        if !response.status().is_success() {
            let (status, reason) = failure_reason(response).await;
            return Err(ControlError::Rejected {
                action: "facilitator toggle",
                status,
                reason,
            });
        }
        let body: FacilitatorToggle = response.json().await?;
        self.store
            .update(|s| s.set_facilitator(body.facilitator_enabled));
        info!(room_id, enabled = body.facilitator_enabled, "facilitator toggled");
        Ok(body.facilitator_enabled)
    }

    /// Invite an AI participant. Returns the name the server registered.
    pub async fn add_ai_participant(&self, room_id: &str, ai_name: &str) -> Result<String, ControlError> {
        require_room(room_id)?;
        let ai_name = require_name(ai_name)?;
        let url = self.endpoints.ai_participant_url(room_id, ai_name);

        let response = self.http.post(url).send().await?;
        if !response.status().is_success() {
            let (status, reason) = failure_reason(response).await;
            return Err(ControlError::Rejected {
                action: "adding AI participant",
                status,
                reason,
            });
        }
        let body: AiParticipantAdded = response.json().await?;
        let added = body
            .ai_participant_added
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| ai_name.to_string());
        self.store.update(|s| {
            s.add_ai_participant(added.clone());
        });
        info!(room_id, ai = %added, "AI participant added");
        Ok(added)
    }

    /// Remove an AI participant. Returns the name the server removed.
    pub async fn remove_ai_participant(
        &self,
        room_id: &str,
        ai_name: &str,
    ) -> Result<String, ControlError> {
        require_room(room_id)?;
        let ai_name = require_name(ai_name)?;
        let url = self.endpoints.ai_participant_url(room_id, ai_name);

        let response = self.http.delete(url).send().await?;
        if !response.status().is_success() {
            let (status, reason) = failure_reason(response).await;
            return Err(ControlError::Rejected {
                action: "removing AI participant",
                status,
                reason,
            });
        }
        let body: AiParticipantRemoved = response.json().await?;
        let removed = body
            .ai_participant_removed
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| ai_name.to_string());
        self.store.update(|s| {
            s.remove_ai_participant(&removed);
        });
        info!(room_id, ai = %removed, "AI participant removed");
        Ok(removed)
    }
}

fn require_room(room_id: &str) -> Result<(), ControlError> {
    if room_id.is_empty() {
        return Err(ControlError::MissingRoom);
    }
    Ok(())
}

fn require_name(ai_name: &str) -> Result<&str, ControlError> {
    let trimmed = ai_name.trim();
    if trimmed.is_empty() {
        return Err(ControlError::EmptyName);
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::{Path, Query},
        http::StatusCode,
        routing::post,
    };
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Enable {
        enable: bool,
    }

    fn backend() -> Router {
        Router::new()
            .route(
                "/room/{room_id}/facilitator",
                post(
                    |Path(room_id): Path<String>, Query(q): Query<Enable>| async move {
                        Json(json!({ "room_id": room_id, "facilitator_enabled": q.enable }))
                    },
                ),
            )
            .route(
                "/room/{room_id}/ai_participant/{ai_name}",
                post(|Path((_room, name)): Path<(String, String)>| async move {
                    if name == "Nobody" {
                        return (StatusCode::NOT_FOUND, Json(json!({ "detail": "unknown AI" })));
                    }
                    (StatusCode::OK, Json(json!({ "ai_participant_added": name })))
                })
                .delete(|Path((_room, name)): Path<(String, String)>| async move {
                    Json(json!({ "ai_participant_removed": name }))
                }),
            )
    }

    async fn controls() -> (RoomControls, ConversationStore, tokio::sync::oneshot::Sender<()>) {
        let (port, shutdown) = crate::test_support::spawn_server(backend()).await;
        let endpoints = Endpoints::parse(&format!("http://127.0.0.1:{port}"), None).unwrap();
        let store = ConversationStore::new();
        let controls = RoomControls::new(reqwest::Client::new(), endpoints, store.clone());
        (controls, store, shutdown)
    }

    #[tokio::test]
    async fn facilitator_toggle_updates_store() {
        let (controls, store, _shutdown) = controls().await;

        assert!(controls.toggle_facilitator("demo", true).await.unwrap());
        assert!(store.read(|s| s.facilitator_enabled()));

        assert!(!controls.toggle_facilitator("demo", false).await.unwrap());
        assert!(!store.read(|s| s.facilitator_enabled()));
    }

    #[tokio::test]
    async fn ai_participants_added_and_removed() {
        let (controls, store, _shutdown) = controls().await;

        assert_eq!(controls.add_ai_participant("demo", " Sage ").await.unwrap(), "Sage");
        controls.add_ai_participant("demo", "Sage").await.unwrap();
        controls.add_ai_participant("demo", "Kai").await.unwrap();
        assert_eq!(store.read(|s| s.ai_participants().to_vec()), ["Sage", "Kai"]);

        controls.remove_ai_participant("demo", "Sage").await.unwrap();
        assert_eq!(store.read(|s| s.ai_participants().to_vec()), ["Kai"]);
    }

    #[tokio::test]
    async fn server_rejection_leaves_store_untouched() {
        let (controls, store, _shutdown) = controls().await;

        let err = controls.add_ai_participant("demo", "Nobody").await.unwrap_err();
        assert_eq!(err.to_string(), "adding AI participant failed (404): unknown AI");
        assert!(store.read(|s| s.ai_participants().is_empty()));
    }

    #[tokio::test]
    async fn local_validation() {
        let (controls, _store, _shutdown) = controls().await;

        assert!(matches!(
            controls.add_ai_participant("demo", "   ").await,
            Err(ControlError::EmptyName)
        ));
        assert!(matches!(
            controls.toggle_facilitator("", true).await,
            Err(ControlError::MissingRoom)
        ));
    }
}
