//! Matrix client-server API: unencrypted room messages and password login.

use std::time::Duration;

use rand::Rng;
use reqwest::blocking::{Client, Response};
use reqwest::Url;
use serde::Deserialize;

use crate::deliver::Deliver;
use crate::error::{Mail2MatrixError, Result};

/// Request timeout for every homeserver call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts `m.text` messages with an access token.
#[derive(Debug, Clone)]
pub struct MatrixClient {
    client: Client,
    server: Url,
    token: String,
}

impl MatrixClient {
    pub fn new(server: &str, token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            server: parse_server(server)?,
            token: token.into(),
        })
    }

    /// URL of one send request. The room ID becomes a single, percent-encoded
    /// path segment.
    fn send_url(&self, room: &str, txn: &str) -> Result<Url> {
        endpoint(
            &self.server,
            &[
                "_matrix",
                "client",
                "v3",
                "rooms",
                room,
                "send",
                "m.room.message",
                txn,
            ],
        )
    }
}

impl Deliver for MatrixClient {
    fn send(&self, room: &str, message: &str) -> Result<()> {
        let txn = transaction_id();
        let url = self.send_url(room, &txn)?;

        let body = serde_json::json!({
            "body": message,
            "msgtype": "m.text",
        });
        let resp = self
            .client
            .put(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()?;
        check_status(resp, "send")?;

        tracing::info!(room, txn = %txn, bytes = message.len(), "Delivered message");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
}

/// Log in with a user name and password and return the access token.
pub fn login(server: &str, user: &str, password: &str) -> Result<String> {
    let url = endpoint(&parse_server(server)?, &["_matrix", "client", "v3", "login"])?;
    let body = serde_json::json!({
        "type": "m.login.password",
        "identifier": {
            "type": "m.id.user",
            "user": user,
        },
        "password": password,
        "initial_device_display_name": "mail2matrix",
    });

    let resp = http_client()?.post(url).json(&body).send()?;
    let resp = check_status(resp, "login")?;
    let login: LoginResponse = resp.json()?;

    tracing::info!(user, "Logged in");
    Ok(login.access_token)
}

/// Random 10-digit transaction ID.
fn transaction_id() -> String {
    rand::thread_rng()
        .gen_range(1_000_000_000u64..10_000_000_000)
        .to_string()
}

fn http_client() -> Result<Client> {
    Ok(Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

fn parse_server(server: &str) -> Result<Url> {
    let url = Url::parse(server)
        .map_err(|e| Mail2MatrixError::Delivery(format!("invalid server URL {server:?}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(Mail2MatrixError::Delivery(format!(
            "invalid server URL {server:?}: not a base URL"
        )));
    }
    Ok(url)
}

/// Append path segments to the server URL.
fn endpoint(server: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = server.clone();
    url.path_segments_mut()
        .map_err(|()| Mail2MatrixError::Delivery(format!("invalid server URL {server}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Turn a non-2xx response into a delivery error carrying the status and body.
fn check_status(resp: Response, action: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().unwrap_or_default();
    Err(Mail2MatrixError::Delivery(format!(
        "{action} failed with {status}: {text}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_url_encodes_room() {
        let client = MatrixClient::new("https://matrix.example.org", "tok").unwrap();
        let url = client.send_url("!abc/def:example.org", "1234567890").unwrap();
        assert_eq!(
            url.as_str(),
            "https://matrix.example.org/_matrix/client/v3/rooms/!abc%2Fdef:example.org/send/m.room.message/1234567890"
        );
    }

    #[test]
    fn test_send_url_keeps_server_prefix() {
        let client = MatrixClient::new("https://example.org/matrix/", "tok").unwrap();
        let url = client.send_url("!r:example.org", "1").unwrap();
        assert_eq!(
            url.path(),
            "/matrix/_matrix/client/v3/rooms/!r:example.org/send/m.room.message/1"
        );
    }

    #[test]
    fn test_transaction_id_has_ten_digits() {
        for _ in 0..100 {
            let txn = transaction_id();
            assert_eq!(txn.len(), 10, "{txn}");
            assert!(txn.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn test_invalid_server_url() {
        assert!(matches!(
            MatrixClient::new("not a url", "tok"),
            Err(Mail2MatrixError::Delivery(_))
        ));
        assert!(matches!(
            MatrixClient::new("mailto:a@b.c", "tok"),
            Err(Mail2MatrixError::Delivery(_))
        ));
    }
}
