//! Viewer time-zone lookup via ipapi.co, memoized per viewer address.
//!
//! A viewer's zone is looked up once and kept for the life of the process.
//! Failed lookups are not cached, so the next request tries again.

use chrono_tz::Tz;
use serde::Deserialize;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::errors::AppError;

/// Per-request timeout for geolocation calls.
const REQUEST_TIMEOUT_SECS: u64 = 5;
/// Upper bound on memoized viewers; past it, lookups still work but aren't kept.
const MAX_CACHED_VIEWERS: usize = 10_000;

/// Client for the ipapi.co geolocation API.
#[derive(Debug, Clone)]
pub struct GeoClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    timezone: Option<String>,
    #[serde(default)]
    error: bool,
    reason: Option<String>,
}

/// The IANA zone attributed to a viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerLocale {
    pub time_zone: Tz,
}

impl GeoClient {
    pub fn new(base_url: &str, user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Look up the zone of `viewer`.
    ///
    /// Loopback and private addresses can't be geolocated, so for those the
    /// lookup falls back to the address ipapi sees (this server's egress).
    pub async fn lookup_timezone(&self, viewer: IpAddr) -> Result<Tz, AppError> {
        let url = if is_public(viewer) {
            format!("{}/{}/json/", self.base_url, viewer)
        } else {
            format!("{}/json/", self.base_url)
        };

        let response =
            self.client.get(&url).send().await.map_err(|e| {
                AppError::ExternalServiceError(format!("Geolocation request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "Geolocation API returned HTTP {}",
                response.status()
            )));
        }

        let body: IpApiResponse = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Geolocation JSON parse error: {}", e))
        })?;

        if body.error {
            return Err(AppError::ExternalServiceError(format!(
                "Geolocation failed: {}",
                body.reason.unwrap_or_else(|| "unknown reason".to_string())
            )));
        }

        let zone = body.timezone.ok_or_else(|| {
            AppError::ExternalServiceError("Geolocation response has no timezone".to_string())
        })?;
        zone.parse::<Tz>().map_err(|_| {
            AppError::ExternalServiceError(format!("Unknown IANA time zone '{}'", zone))
        })
    }
}

/// Whether an address is routable on the public internet.
fn is_public(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation())
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_public(IpAddr::V4(mapped));
            }
            let first = v6.segments()[0];
            !(v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00 // unique local
                || (first & 0xffc0) == 0xfe80) // link local
        }
    }
}

/// Memoized viewer zones, keyed by viewer address and never invalidated.
#[derive(Debug, Clone)]
pub struct ZoneCache {
    geo: GeoClient,
    zones: Arc<RwLock<HashMap<IpAddr, Tz>>>,
}

impl ZoneCache {
    pub fn new(geo: GeoClient) -> Self {
        Self {
            geo,
            zones: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Memoized zone of `viewer`, without querying upstream.
    pub async fn cached(&self, viewer: IpAddr) -> Option<Tz> {
        self.zones.read().await.get(&viewer).copied()
    }

    /// Zone of `viewer`, or `None` while it can't be resolved.
    pub async fn resolve(&self, viewer: IpAddr) -> Option<ViewerLocale> {
        if let Some(time_zone) = self.cached(viewer).await {
            return Some(ViewerLocale { time_zone });
        }

        match self.geo.lookup_timezone(viewer).await {
            Ok(tz) => {
                let mut zones = self.zones.write().await;
                if zones.len() < MAX_CACHED_VIEWERS {
                    // A concurrent lookup may have landed first; keep that one.
                    let kept = *zones.entry(viewer).or_insert(tz);
                    return Some(ViewerLocale { time_zone: kept });
                }
                tracing::debug!("Zone cache full, not memoizing {}", viewer);
                Some(ViewerLocale { time_zone: tz })
            }
            Err(e) => {
                tracing::warn!("Could not resolve time zone for {}: {}", viewer, e);
                None
            }
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.zones.read().await.len()
    }
}
