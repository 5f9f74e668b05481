//! Best-effort location enrichment for alerts.
//!
//! Tries the attached Android device first (`adb shell dumpsys location`),
//! falls back to IP geolocation, then optionally reverse-geocodes the fix into
//! a street address. Nothing here ever fails an alert: every error is logged
//! and the lookup returns whatever it managed to resolve.

use std::path::PathBuf;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::process::Command;

use super::config::LocationConfig;
use super::error::LocationError;

lazy_static! {
    static ref DUMPSYS_FIX: Regex =
        Regex::new(r"Location\[(?:gps|fused)\s(-?\d+\.\d+),(-?\d+\.\d+)").expect("Invalid dumpsys regex");
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
}

impl Location {
    pub fn from_fix(latitude: f64, longitude: f64, address: Option<String>) -> Self {
        Self {
            latitude,
            longitude,
            address,
        }
    }

    pub fn map_link(&self) -> String {
        format!("https://maps.google.com/?q={},{}", self.latitude, self.longitude)
    }

    /// Human-readable text: `"{address} ({map link})"`, or the bare link.
    pub fn text(&self) -> String {
        match &self.address {
            Some(address) => format!("{} ({})", address, self.map_link()),
            None => self.map_link(),
        }
    }
}

#[async_trait]
pub trait LocationLookup: Send + Sync {
    /// Resolve the current location, or `None` when nothing could be found.
    async fn lookup(&self) -> Option<Location>;
}

/// Lookup for deployments without enrichment.
pub struct NoLocation;

#[async_trait]
impl LocationLookup for NoLocation {
    async fn lookup(&self) -> Option<Location> {
        None
    }
}

/// Extract `(lat, lon)` from `dumpsys location` output.
pub fn parse_dumpsys(output: &str) -> Option<(f64, f64)> {
    let caps = DUMPSYS_FIX.captures(output)?;
    let lat = caps.get(1)?.as_str().parse().ok()?;
    let lon = caps.get(2)?.as_str().parse().ok()?;
    Some((lat, lon))
}

fn coordinate(payload: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match payload.get(*key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    })
}

pub struct DeviceLocator {
    adb_path: Option<PathBuf>,
    ip_lookup_url: Option<String>,
    reverse_geocode_url: Option<String>,
    user_agent: String,
    client: reqwest::Client,
}

impl DeviceLocator {
    pub fn new(config: &LocationConfig, client: reqwest::Client) -> Self {
        Self {
            adb_path: config.adb_path.clone(),
            ip_lookup_url: config.ip_lookup_url.clone(),
            reverse_geocode_url: config.reverse_geocode_url.clone(),
            user_agent: config.user_agent.clone(),
            client,
        }
    }

    async fn device_fix(&self) -> Result<(f64, f64), LocationError> {
        let adb = self
            .adb_path
            .as_ref()
            .ok_or_else(|| LocationError::Device("no adb path configured".to_string()))?;
        let output = Command::new(adb)
            .args(["shell", "dumpsys", "location"])
            .output()
            .await
            .map_err(|e| LocationError::Device(e.to_string()))?;
        if !output.status.success() {
            return Err(LocationError::Device(format!("adb exited with {}", output.status)));
        }
        parse_dumpsys(&String::from_utf8_lossy(&output.stdout)).ok_or(LocationError::NoFix)
    }

    async fn ip_fix(&self) -> Result<(f64, f64), LocationError> {
        let url = self
            .ip_lookup_url
            .as_ref()
            .ok_or_else(|| LocationError::Payload("no IP lookup endpoint configured".to_string()))?;
        let payload: Value = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let lat = coordinate(&payload, &["lat", "latitude"]);
        let lon = coordinate(&payload, &["lon", "lng", "longitude"]);
        match (lat, lon) {
            (Some(lat), Some(lon)) => Ok((lat, lon)),
            _ => Err(LocationError::Payload(payload.to_string())),
        }
    }

    async fn reverse_geocode(&self, url: &str, lat: f64, lon: f64) -> Result<String, LocationError> {
        let payload: Value = self
            .client
            .get(url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
            ])
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        payload
            .get("display_name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| LocationError::Payload(payload.to_string()))
    }
}

#[async_trait]
impl LocationLookup for DeviceLocator {
    async fn lookup(&self) -> Option<Location> {
        let (lat, lon) = match self.device_fix().await {
            Ok(fix) => fix,
            Err(device_err) => {
                log::debug!("Device location unavailable: {}", device_err);
                match self.ip_fix().await {
                    Ok(fix) => fix,
                    Err(e) => {
                        log::warn!("Location lookup failed: {}", e);
                        return None;
                    }
                }
            }
        };

        let address = match &self.reverse_geocode_url {
            Some(url) => match self.reverse_geocode(url, lat, lon).await {
                Ok(address) => Some(address),
                Err(e) => {
                    log::warn!("Reverse geocoding failed: {}", e);
                    None
                }
            },
            None => None,
        };

        Some(Location::from_fix(lat, lon, address))
    }
}
