//! Randomized browser-like headers, user agents, and viewports.
//!
//! The user-agent pool is loaded once at startup and handed to the
//! `Fingerprint` constructor as a plain value — see SPEC_FULL.md §9,
//! "Global process state": no process-wide mutable singleton.

use std::path::Path;

use career_crawler_core::{CrawlError, HeaderMap, Viewport};
use rand::seq::SliceRandom;
use rand::Rng;

const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.9",
    "en-US,en;q=0.5",
    "en;q=0.9",
];

const VIEWPORTS: &[Viewport] = &[
    Viewport { width: 1920, height: 1080 },
    Viewport { width: 1366, height: 768 },
    Viewport { width: 1440, height: 900 },
    Viewport { width: 1536, height: 864 },
    Viewport { width: 1280, height: 720 },
    Viewport { width: 1600, height: 900 },
    Viewport { width: 2560, height: 1440 },
];

/// Draws randomized, browser-plausible request identities from a fixed
/// user-agent pool.
pub struct Fingerprint {
    user_agents: Vec<String>,
}

impl Fingerprint {
    pub fn new(user_agents: Vec<String>) -> Self {
        Self { user_agents }
    }

    /// Load the UA pool from a plain-text file, one agent per line, blank
    /// lines ignored.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, CrawlError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CrawlError::Config(format!("failed to read UA pool file: {e}")))?;
        let user_agents: Vec<String> = contents
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        if user_agents.is_empty() {
            return Err(CrawlError::Config("UA pool file contains no agents".into()));
        }
        Ok(Self::new(user_agents))
    }

    pub fn random_user_agent(&self) -> &str {
        self.user_agents
            .choose(&mut rand::thread_rng())
            .map(|s| s.as_str())
            .unwrap_or("Mozilla/5.0")
    }

    /// Randomized but realistic HTTP headers, including `User-Agent`.
    ///
    /// Iteration order is randomized where the caller preserves insertion
    /// order (a `HashMap` already randomizes this incidentally; we also
    /// shuffle the insertion sequence so the behavior doesn't depend on
    /// the hasher).
    pub fn random_headers(&self) -> HeaderMap {
        let mut rng = rand::thread_rng();
        let mut entries: Vec<(&str, String)> = vec![
            ("User-Agent", self.random_user_agent().to_string()),
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"
                    .to_string(),
            ),
            (
                "Accept-Language",
                ACCEPT_LANGUAGES.choose(&mut rng).unwrap().to_string(),
            ),
            ("Accept-Encoding", "gzip, deflate, br".to_string()),
            ("DNT", "1".to_string()),
            ("Connection", "keep-alive".to_string()),
            ("Upgrade-Insecure-Requests", "1".to_string()),
            ("Sec-Fetch-Dest", "document".to_string()),
            ("Sec-Fetch-Mode", "navigate".to_string()),
            ("Sec-Fetch-Site", "none".to_string()),
            ("Sec-Fetch-User", "?1".to_string()),
        ];
        entries.shuffle(&mut rng);
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    pub fn random_viewport(&self) -> Viewport {
        let mut rng = rand::thread_rng();
        VIEWPORTS[rng.gen_range(0..VIEWPORTS.len())]
    }
}
