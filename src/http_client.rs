use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, USER_AGENT};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Process-wide client. The first caller fixes the timeout.
pub fn http_client(timeout_secs: u64) -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .context("failed to build http client")
    })
}

/// Sends a GET with the given headers; transport failures and timeouts are `Err`.
pub fn send_get(client: &Client, url: &str, extra_headers: &[(&str, &str)]) -> Result<Response> {
    let mut req = client
        .get(url)
        .header(USER_AGENT, concat!("frc_scout/", env!("CARGO_PKG_VERSION")))
        .header(ACCEPT, "application/json");
    for (name, value) in extra_headers {
        req = req.header(*name, *value);
    }
    req.send().with_context(|| format!("request failed: {url}"))
}

/// GET that requires a success status and returns the body text.
pub fn fetch_text(client: &Client, url: &str, extra_headers: &[(&str, &str)]) -> Result<String> {
    let resp = send_get(client, url, extra_headers)?;
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow!("http {status} from {url}: {}", snippet(&body)));
    }
    Ok(body)
}

fn snippet(body: &str) -> &str {
    const MAX: usize = 160;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX) {
        Some((cut, _)) => &trimmed[..cut],
        None => trimmed,
    }
}
