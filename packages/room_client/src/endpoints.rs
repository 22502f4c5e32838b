//! URLs of the room backend.

use reqwest::Url;
use room_protocol::ErrorBody;

use crate::error::EndpointError;

/// Base URLs of the HTTP API and the websocket endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    api_base: Url,
    ws_base: Url,
}

impl Endpoints {
    /// Parse both bases. When `ws_url` is `None` it is derived from `api_url`
    /// (`http` becomes `ws`, `https` becomes `wss`).
    pub fn parse(api_url: &str, ws_url: Option<&str>) -> Result<Self, EndpointError> {
        let api_base = parse_url("server.api_url", api_url)?;
        match api_base.scheme() {
            "http" | "https" => {}
            other => {
                return Err(EndpointError::UnsupportedScheme {
                    field: "server.api_url",
                    scheme: other.to_string(),
                });
            }
        }

        let ws_base = match ws_url {
            Some(raw) => parse_url("server.ws_url", raw)?,
            None => derive_ws(&api_base)?,
        };
        match ws_base.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(EndpointError::UnsupportedScheme {
                    field: "server.ws_url",
                    scheme: other.to_string(),
                });
            }
        }

        Ok(Self { api_base, ws_base })
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    pub fn ws_base(&self) -> &Url {
        &self.ws_base
    }

    /// `{api}/api/token`
    pub fn token_url(&self) -> Url {
        join(&self.api_base, &["api", "token"])
    }

    /// `{ws}/ws/{room_id}?token={token}`
    pub fn room_socket_url(&self, room_id: &str, token: &str) -> Url {
        let mut url = join(&self.ws_base, &["ws", room_id]);
        url.query_pairs_mut().append_pair("token", token);
        url
    }

    /// `{api}/room/{room_id}/facilitator?enable={enable}`
    pub fn facilitator_url(&self, room_id: &str, enable: bool) -> Url {
        let mut url = join(&self.api_base, &["room", room_id, "facilitator"]);
        url.query_pairs_mut()
            .append_pair("enable", if enable { "true" } else { "false" });
        url
    }

    /// `{api}/room/{room_id}/ai_participant/{ai_name}`
    pub fn ai_participant_url(&self, room_id: &str, ai_name: &str) -> Url {
        join(&self.api_base, &["room", room_id, "ai_participant", ai_name])
    }
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, EndpointError> {
    Url::parse(raw).map_err(|e| EndpointError::Invalid {
        field,
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

fn derive_ws(api_base: &Url) -> Result<Url, EndpointError> {
    let scheme = if api_base.scheme() == "https" { "wss" } else { "ws" };
    let mut ws = api_base.clone();
    ws.set_scheme(scheme)
        .map_err(|()| EndpointError::UnsupportedScheme {
            field: "server.ws_url",
            scheme: scheme.to_string(),
        })?;
    Ok(ws)
}

/// Append percent-encoded path segments to `base`, keeping any base path.
fn join(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Status code and best human-readable reason of a failed response.
pub(crate) async fn failure_reason(response: reqwest::Response) -> (u16, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let reason = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.reason().map(str::to_string))
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| status.to_string());
    (status.as_u16(), reason)
}
