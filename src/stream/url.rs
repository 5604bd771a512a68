//! Stream endpoint resolution.

use reqwest::Url;

/// Resolve the stream URL from explicit/derived base plus optional path.
pub fn resolve_stream_url(ws_url: &str, api_base_url: &str, ws_path: &str) -> Option<String> {
    let ws_url = ws_url.trim();
    let base = if ws_url.is_empty() {
        derive_from_api_url(api_base_url.trim())?
    } else {
        ws_url.to_string()
    };

    let ws_path = ws_path.trim();
    if ws_path.is_empty() {
        return Some(base);
    }
    let Ok(mut url) = Url::parse(&base) else {
        return Some(base);
    };
    if ws_path.starts_with('/') {
        url.set_path(ws_path);
    } else {
        url.set_path(&format!("/{ws_path}"));
    }
    Some(url.to_string())
}

fn derive_from_api_url(api_url: &str) -> Option<String> {
    if let Some(rest) = api_url.strip_prefix("http://") {
        return Some(format!("ws://{rest}"));
    }
    if let Some(rest) = api_url.strip_prefix("https://") {
        return Some(format!("wss://{rest}"));
    }
    None
}
