//! Readiness probe run before the event stream is opened.

use serde_json::Value;
use tracing::{debug, info};

use super::client::{PeerClient, RequestOptions};
use super::state::PeerInfo;
use crate::error::{ConnectionError, ConnectionResult};
use crate::traits::HttpError;

pub const UUID_PATH: &str = "/rest/uuid";
pub const ROOT_PATH: &str = "/rest/";

/// Probe the peer.
///
/// The uuid endpoint must answer with a success status. The root document is
/// optional: peers that answer 404 or omit `runtimeInfo` use the legacy topic
/// layout.
pub async fn probe(client: &PeerClient, expect_success: bool) -> ConnectionResult<PeerInfo> {
    let response = client
        .get(
            UUID_PATH,
            RequestOptions::new()
                .quiet_missing()
                .expect_success(expect_success),
        )
        .await?;
    if response.status >= 300 {
        return Err(ConnectionError::NotReady {
            method: "GET",
            path: UUID_PATH.to_string(),
            status: response.status,
        });
    }
    let uuid = response.text().unwrap_or_default().trim().to_string();
    debug!("Peer uuid: {}", uuid);

    let response = client
        .get(ROOT_PATH, RequestOptions::new().quiet_missing())
        .await?;
    if response.status == 404 {
        return Ok(PeerInfo {
            uuid,
            version: None,
            build: None,
            legacy: true,
        });
    }
    if response.status >= 300 {
        return Err(ConnectionError::NotReady {
            method: "GET",
            path: ROOT_PATH.to_string(),
            status: response.status,
        });
    }

    let root: Value = response.json().map_err(|e| {
        ConnectionError::Transport(HttpError::Other(format!("invalid root document: {}", e)))
    })?;
    let info = match root.get("runtimeInfo") {
        Some(runtime) => PeerInfo {
            uuid,
            version: runtime
                .get("version")
                .and_then(Value::as_str)
                .map(str::to_string),
            build: runtime
                .get("buildString")
                .and_then(Value::as_str)
                .map(str::to_string),
            legacy: false,
        },
        None => PeerInfo {
            uuid,
            version: None,
            build: None,
            legacy: true,
        },
    };
    if info.legacy {
        info!("Peer has no runtime info, using legacy event topics");
    }
    Ok(info)
}
