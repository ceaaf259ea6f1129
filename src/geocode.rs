//! Provider-facing geocoding types and the per-row search strategy.
//!
//! [`Geocoder`] is the seam between the pipeline and the outside world: the
//! production implementation talks to a Nominatim endpoint, tests script the
//! replies. [`Orchestrator::resolve`] wraps a single provider call in the
//! configured search strategy and produces exactly one [`Attempt`] per row,
//! match or not, so the caller can route every row to either the point layer
//! or the failure log.

use std::{thread, time::Duration};

use log::debug;
use serde::Deserialize;

/// Status recorded for rows that never produced a query or failed the
/// strict-mode gate.
pub const INVALID_ADDRESS_STATUS: &str = "ERROR - Invalid address";
/// Status recorded when the provider answered but had no candidates.
pub const NO_RESULTS_STATUS: &str = "ERROR - No results found";
/// Status code used when no HTTP response exists to take one from.
pub const SYNTHETIC_STATUS_CODE: i32 = -999;

#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeMatch {
    pub longitude: f64,
    pub latitude: f64,
    /// Provider-side object reference, e.g. `way/91237`.
    pub provider_ref: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodeFailure {
    pub status: String,
    pub status_code: i32,
    pub timed_out: bool,
}

impl GeocodeFailure {
    /// Failure recorded without ever contacting the provider.
    pub fn invalid_address() -> Self {
        Self {
            status: INVALID_ADDRESS_STATUS.to_string(),
            status_code: SYNTHETIC_STATUS_CODE,
            timed_out: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeResult {
    /// The provider returned at least one candidate; this is the best one.
    Match(GeocodeMatch),
    /// The provider answered cleanly but found nothing.
    NoResults { status_code: u16 },
    /// The query could not be answered: transport error, HTTP error status,
    /// unparsable payload, or a row that never became a query.
    Failed(GeocodeFailure),
}

impl GeocodeResult {
    pub fn is_match(&self) -> bool {
        matches!(self, GeocodeResult::Match(_))
    }
}

/// A single provider capable of answering free-form address queries.
pub trait Geocoder {
    fn query(&self, address: &str) -> GeocodeResult;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Query once, and only when the address starts with a building number.
    Strict,
    /// Query, then retry with the leading segment stripped while the
    /// provider keeps reporting no results.
    #[default]
    Progressive,
}

/// Outcome of resolving one row: the query that was last sent (if any row
/// data produced one) and the provider's answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub query: Option<String>,
    pub result: GeocodeResult,
}

pub struct Orchestrator<'a> {
    provider: &'a dyn Geocoder,
    mode: SearchMode,
    delay: Duration,
}

impl<'a> Orchestrator<'a> {
    pub fn new(provider: &'a dyn Geocoder, mode: SearchMode, delay: Duration) -> Self {
        Self {
            provider,
            mode,
            delay,
        }
    }

    /// Resolves one row's address. Rows without an address, and strict-mode
    /// addresses without a leading building number, fail synthetically
    /// without a provider round trip.
    pub fn resolve(&self, address: Option<String>) -> Attempt {
        let Some(address) = address else {
            return Attempt {
                query: None,
                result: GeocodeResult::Failed(GeocodeFailure::invalid_address()),
            };
        };
        match self.mode {
            SearchMode::Strict => {
                if !starts_with_building_number(&address) {
                    debug!("skipping '{address}': no leading building number");
                    return Attempt {
                        query: Some(address),
                        result: GeocodeResult::Failed(GeocodeFailure::invalid_address()),
                    };
                }
                let result = self.query_once(&address);
                Attempt {
                    query: Some(address),
                    result,
                }
            }
            SearchMode::Progressive => {
                let mut query = address;
                loop {
                    let result = self.query_once(&query);
                    if let GeocodeResult::NoResults { .. } = result {
                        if let Some(idx) = query.find(',') {
                            query = query[idx + 1..].trim_start().to_string();
                            debug!("no results, retrying with '{query}'");
                            continue;
                        }
                    }
                    return Attempt {
                        query: Some(query),
                        result,
                    };
                }
            }
        }
    }

    fn query_once(&self, address: &str) -> GeocodeResult {
        debug!("querying '{address}'");
        let result = self.provider.query(address);
        // Every provider round trip is followed by the configured pause;
        // public Nominatim bans clients that skip it.
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        result
    }
}

pub fn starts_with_building_number(address: &str) -> bool {
    address.chars().next().is_some_and(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    struct ScriptedGeocoder {
        replies: RefCell<VecDeque<GeocodeResult>>,
        queries: RefCell<Vec<String>>,
    }

    impl ScriptedGeocoder {
        fn new(replies: Vec<GeocodeResult>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                queries: RefCell::new(Vec::new()),
            }
        }

        fn queries(&self) -> Vec<String> {
            self.queries.borrow().clone()
        }
    }

    impl Geocoder for ScriptedGeocoder {
        fn query(&self, address: &str) -> GeocodeResult {
            self.queries.borrow_mut().push(address.to_string());
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or(GeocodeResult::NoResults { status_code: 200 })
        }
    }

    fn hit() -> GeocodeResult {
        GeocodeResult::Match(GeocodeMatch {
            longitude: 17.92,
            latitude: 50.47,
            provider_ref: "way/91237".to_string(),
            confidence: 0.61,
        })
    }

    fn no_results() -> GeocodeResult {
        GeocodeResult::NoResults { status_code: 200 }
    }

    fn transport_failure() -> GeocodeResult {
        GeocodeResult::Failed(GeocodeFailure {
            status: "ERROR - connection refused".to_string(),
            status_code: SYNTHETIC_STATUS_CODE,
            timed_out: false,
        })
    }

    fn orchestrator(provider: &ScriptedGeocoder, mode: SearchMode) -> Orchestrator<'_> {
        Orchestrator::new(provider, mode, Duration::ZERO)
    }

    #[test]
    fn missing_address_fails_without_querying() {
        let provider = ScriptedGeocoder::new(vec![hit()]);
        let attempt = orchestrator(&provider, SearchMode::Progressive).resolve(None);
        assert_eq!(attempt.query, None);
        assert_eq!(
            attempt.result,
            GeocodeResult::Failed(GeocodeFailure::invalid_address())
        );
        assert!(provider.queries().is_empty());
    }

    #[test]
    fn strict_mode_requires_a_leading_building_number() {
        let provider = ScriptedGeocoder::new(vec![hit()]);
        let attempt = orchestrator(&provider, SearchMode::Strict)
            .resolve(Some("Polna, Borki".to_string()));
        assert_eq!(attempt.query.as_deref(), Some("Polna, Borki"));
        assert_eq!(
            attempt.result,
            GeocodeResult::Failed(GeocodeFailure::invalid_address())
        );
        assert!(provider.queries().is_empty());
    }

    #[test]
    fn strict_mode_queries_numbered_addresses_once() {
        let provider = ScriptedGeocoder::new(vec![hit()]);
        let attempt = orchestrator(&provider, SearchMode::Strict)
            .resolve(Some("7, Polna, Borki".to_string()));
        assert!(attempt.result.is_match());
        assert_eq!(provider.queries(), vec!["7, Polna, Borki".to_string()]);
    }

    #[test]
    fn progressive_mode_strips_segments_until_a_match() {
        let provider = ScriptedGeocoder::new(vec![no_results(), no_results(), hit()]);
        let attempt = orchestrator(&provider, SearchMode::Progressive)
            .resolve(Some("7, Polna, powiat Nyski".to_string()));
        assert!(attempt.result.is_match());
        assert_eq!(
            provider.queries(),
            vec![
                "7, Polna, powiat Nyski".to_string(),
                "Polna, powiat Nyski".to_string(),
                "powiat Nyski".to_string(),
            ]
        );
        assert_eq!(attempt.query.as_deref(), Some("powiat Nyski"));
    }

    #[test]
    fn progressive_mode_stops_when_no_segments_remain() {
        let provider = ScriptedGeocoder::new(vec![no_results(), no_results()]);
        let attempt = orchestrator(&provider, SearchMode::Progressive)
            .resolve(Some("Polna, Borki".to_string()));
        assert_eq!(attempt.result, no_results());
        assert_eq!(provider.queries().len(), 2);
        assert_eq!(attempt.query.as_deref(), Some("Borki"));
    }

    #[test]
    fn progressive_mode_does_not_retry_hard_failures() {
        let provider = ScriptedGeocoder::new(vec![transport_failure()]);
        let attempt = orchestrator(&provider, SearchMode::Progressive)
            .resolve(Some("7, Polna, Borki".to_string()));
        assert_eq!(attempt.result, transport_failure());
        assert_eq!(provider.queries().len(), 1);
        assert_eq!(attempt.query.as_deref(), Some("7, Polna, Borki"));
    }

    #[test]
    fn building_number_gate_checks_the_first_character() {
        assert!(starts_with_building_number("7, Polna"));
        assert!(starts_with_building_number("17-23, Krucza"));
        assert!(!starts_with_building_number("Polna 7"));
        assert!(!starts_with_building_number(""));
    }
}
