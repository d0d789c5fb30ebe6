// Session token bootstrap
//
// The WebSocket handshake needs a token that the monitor web page hands
// out as part of its session cookie. One GET against the page, read the
// `Set-Cookie` header, and dig the token out of the cookie value.

use reqwest::header::SET_COOKIE;
use secrecy::SecretString;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Length of the session cookie's `NAME=` prefix. The value starts here.
pub const COOKIE_VALUE_OFFSET: usize = 13;

/// Fetch a fresh session token from the monitor endpoint.
///
/// Issues a single GET with the transport's timeout and no proxy. Fails
/// when the request fails, the endpoint answers with a non-success status,
/// or none of the returned cookies carries a token. Callers must not open
/// the WebSocket without one.
pub async fn fetch_token(
    transport: &TransportConfig,
    monitor_url: &Url,
) -> Result<SecretString, Error> {
    let http = transport.build_client()?;

    debug!("requesting session token from {}", monitor_url);

    let resp = http.get(monitor_url.clone()).send().await.map_err(|e| {
        if e.is_timeout() {
            Error::Timeout {
                timeout_secs: transport.timeout.as_secs(),
            }
        } else {
            Error::Transport(e)
        }
    })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(Error::token(format!(
            "monitor endpoint answered HTTP {status}"
        )));
    }

    let mut last_err = None;
    for value in resp.headers().get_all(SET_COOKIE) {
        let Ok(cookie) = value.to_str() else {
            continue;
        };
        match token_from_cookie(cookie) {
            Ok(token) => {
                debug!("session token acquired");
                return Ok(SecretString::from(token));
            }
            Err(e) => last_err = Some(e),
        }
    }

    Err(last_err.unwrap_or_else(|| Error::token("response carried no Set-Cookie header")))
}

/// Extract the session token from a raw `Set-Cookie` header value.
///
/// The cookie value is `<prefix>:<token>:<rest>`, percent-encoded, and
/// sits between [`COOKIE_VALUE_OFFSET`] and the first `;`.
pub fn token_from_cookie(cookie: &str) -> Result<String, Error> {
    let end = cookie
        .find(';')
        .ok_or_else(|| Error::token("cookie has no attribute delimiter"))?;

    let encoded = cookie
        .get(COOKIE_VALUE_OFFSET..end)
        .ok_or_else(|| Error::token("cookie is shorter than its name prefix"))?;

    let decoded = urlencoding::decode(encoded)
        .map_err(|e| Error::token(format!("cookie value is not valid percent-encoding: {e}")))?;

    decoded
        .split(':')
        .nth(1)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| Error::token("cookie value has no token segment"))
}
