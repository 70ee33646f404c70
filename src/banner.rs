use std::fmt;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::BANNER_URL;

/// Cosmetic-only failure. Never propagates into the data pipeline;
/// the UI degrades to a warning note.
#[derive(Debug)]
pub enum BannerError {
    Request(reqwest::Error),
    Status(u16),
}

impl fmt::Display for BannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BannerError::Request(e) => write!(f, "request failed: {e}"),
            BannerError::Status(code) => write!(f, "unexpected status {code}"),
        }
    }
}

/// Metadata of the decorative Lottie animation shown in the header.
#[derive(Debug, Clone)]
pub struct Banner {
    pub name: String,
    pub frames: u64,
}

/// Kick off the banner fetch on its own thread. The result arrives on
/// the returned channel whenever it is ready; the dashboard never waits
/// for it.
pub fn fetch_in_background() -> Receiver<Result<Banner, BannerError>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let result = fetch(BANNER_URL);
        match &result {
            Ok(banner) => debug!("Fetched banner animation: {:?}", banner),
            Err(e) => warn!("Banner fetch failed: {e}"),
        }
        // The receiver may already be gone if the user quit early.
        let _ = tx.send(result);
    });
    rx
}

fn fetch(url: &str) -> Result<Banner, BannerError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(BannerError::Request)?;
    let response = client.get(url).send().map_err(BannerError::Request)?;
    if !response.status().is_success() {
        return Err(BannerError::Status(response.status().as_u16()));
    }
    let value: serde_json::Value = response.json().map_err(BannerError::Request)?;
    Ok(parse_banner(&value))
}

// Lottie documents carry a name in "nm" and in/out frame points.
fn parse_banner(value: &serde_json::Value) -> Banner {
    let name = value
        .get("nm")
        .and_then(|v| v.as_str())
        .unwrap_or("shopping")
        .to_string();
    let start = value.get("ip").and_then(|v| v.as_f64()).unwrap_or(0.0);
    let end = value.get("op").and_then(|v| v.as_f64()).unwrap_or(0.0);
    Banner {
        name,
        frames: (end - start).max(0.0) as u64,
    }
}
