//! Nominatim-backed [`Geocoder`] implementation.
//!
//! Sends free-form queries to a Nominatim `/search` endpoint (`format=jsonv2`,
//! `limit=1`) and maps the response onto [`GeocodeResult`]. The interesting
//! part lives in [`interpret`], a pure function over the HTTP status and body,
//! so every response shape can be covered by tests without a network.

use anyhow::{Context, Result};
use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::geocode::{GeocodeFailure, GeocodeMatch, GeocodeResult, Geocoder, SYNTHETIC_STATUS_CODE};

/// Nominatim's usage policy requires an identifying user agent.
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub struct NominatimClient {
    http: Client,
    endpoint: String,
}

impl NominatimClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Building HTTP client")?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// The jsonv2 fields the pipeline cares about. `lat` and `lon` arrive as
/// strings, not numbers.
#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    osm_type: String,
    #[serde(default)]
    osm_id: u64,
    lat: String,
    lon: String,
    #[serde(default)]
    importance: f64,
}

impl Geocoder for NominatimClient {
    fn query(&self, address: &str) -> GeocodeResult {
        let url = format!("{}/search", self.endpoint);
        debug!("GET {url} q='{address}'");
        let response = self
            .http
            .get(&url)
            .query(&[("q", address), ("format", "jsonv2"), ("limit", "1")])
            .send();
        match response {
            Ok(response) => {
                let status_code = response.status().as_u16();
                match response.text() {
                    Ok(body) => interpret(status_code, &body),
                    Err(err) => transport_failure(&err),
                }
            }
            Err(err) => transport_failure(&err),
        }
    }
}

/// Maps one HTTP response onto a geocode result: error statuses and
/// unparsable payloads fail, an empty candidate list is a clean no-result,
/// and the first candidate becomes the match.
fn interpret(status_code: u16, body: &str) -> GeocodeResult {
    if !(200..300).contains(&status_code) {
        return GeocodeResult::Failed(GeocodeFailure {
            status: format!("ERROR - HTTP {status_code}"),
            status_code: i32::from(status_code),
            timed_out: false,
        });
    }
    let candidates: Vec<Candidate> = match serde_json::from_str(body) {
        Ok(candidates) => candidates,
        Err(err) => {
            return GeocodeResult::Failed(GeocodeFailure {
                status: format!("ERROR - unparsable response: {err}"),
                status_code: i32::from(status_code),
                timed_out: false,
            });
        }
    };
    let Some(best) = candidates.into_iter().next() else {
        return GeocodeResult::NoResults { status_code };
    };
    let (Ok(latitude), Ok(longitude)) = (best.lat.parse::<f64>(), best.lon.parse::<f64>()) else {
        return GeocodeResult::Failed(GeocodeFailure {
            status: format!(
                "ERROR - unparsable coordinates lat='{}' lon='{}'",
                best.lat, best.lon
            ),
            status_code: i32::from(status_code),
            timed_out: false,
        });
    };
    GeocodeResult::Match(GeocodeMatch {
        longitude,
        latitude,
        provider_ref: format!("{}/{}", best.osm_type, best.osm_id),
        confidence: best.importance,
    })
}

fn transport_failure(err: &reqwest::Error) -> GeocodeResult {
    GeocodeResult::Failed(GeocodeFailure {
        status: format!("ERROR - {err}"),
        status_code: err
            .status()
            .map_or(SYNTHETIC_STATUS_CODE, |status| i32::from(status.as_u16())),
        timed_out: err.is_timeout(),
    })
}
