//! Assembles geocoder queries from the address cells of a row.
//!
//! Rows rarely carry every address component, so assembly walks a fixed
//! preference order and the first shape with enough data wins:
//!
//! 1. street + secondary place (village or district)
//! 2. secondary place alone, itself run through number reordering
//! 3. street + primary place (town)
//!
//! A county segment such as `powiat Nyski` is appended unless the chosen
//! locality already names the county. Rows with too little data, or whose
//! street was rejected by the normalizer, yield no address at all and are
//! reported as failures without ever reaching the provider.

use anyhow::{Context, Result};
use itertools::Itertools;

use crate::config::AddressConfig;
use crate::street::{self, Expansion, NormalizeOptions, ParsedName};

/// The four address-bearing cells of a row, already trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressParts {
    pub street: String,
    pub secondary_place: String,
    pub primary_place: String,
    pub county: String,
}

#[derive(Debug, Clone)]
pub struct Assembler {
    /// Full normalization for street cells.
    street_options: NormalizeOptions,
    /// Reduced normalization for place cells: reject list and number
    /// reordering only, since expansions target street prefixes.
    place_options: NormalizeOptions,
    county_qualifier: String,
}

impl Assembler {
    pub fn from_config(config: &AddressConfig) -> Result<Self> {
        let expansions = config
            .expansions
            .iter()
            .map(|rule| {
                Expansion::compile(&rule.pattern, &rule.replacement)
                    .with_context(|| format!("Compiling expansion pattern '{}'", rule.pattern))
            })
            .collect::<Result<Vec<_>>>()?;
        let street_options = NormalizeOptions {
            reject_substrings: config.reject_substrings.clone(),
            expansions,
            strip_abbreviations: config.strip_abbreviations,
            number_first: config.number_first,
        };
        let place_options = NormalizeOptions {
            reject_substrings: config.reject_substrings.clone(),
            expansions: Vec::new(),
            strip_abbreviations: false,
            number_first: config.number_first,
        };
        Ok(Self {
            street_options,
            place_options,
            county_qualifier: config.county_qualifier.trim().to_string(),
        })
    }

    /// Builds the query string for one row, or `None` when the row cannot
    /// produce a usable address.
    pub fn assemble(&self, parts: &AddressParts) -> Option<String> {
        let has_street = !parts.street.is_empty();
        if !parts.secondary_place.is_empty() {
            if has_street {
                let street = self.normalize_street(&parts.street)?;
                return Some(self.compose(
                    &[street, parts.secondary_place.clone()],
                    &parts.secondary_place,
                    &parts.county,
                ));
            }
            let place = street::normalize(&parts.secondary_place, &self.place_options).accepted()?;
            return Some(self.compose(&[place], &parts.secondary_place, &parts.county));
        }
        if !parts.primary_place.is_empty() && has_street {
            let street = self.normalize_street(&parts.street)?;
            return Some(self.compose(
                &[street, parts.primary_place.clone()],
                &parts.primary_place,
                &parts.county,
            ));
        }
        None
    }

    fn normalize_street(&self, street: &str) -> Option<String> {
        match street::normalize(street, &self.street_options) {
            ParsedName::Accepted(name) => Some(name),
            ParsedName::Rejected => None,
        }
    }

    fn compose(&self, segments: &[String], locality: &str, county: &str) -> String {
        let mut segments = segments.to_vec();
        if let Some(county) = self.county_segment(locality, county) {
            segments.push(county);
        }
        segments.iter().join(", ")
    }

    /// The county segment is dropped when the row has no county or when the
    /// chosen locality already is the county seat of the same name.
    fn county_segment(&self, locality: &str, county: &str) -> Option<String> {
        if county.is_empty() || locality.to_lowercase() == county.to_lowercase() {
            return None;
        }
        if self.county_qualifier.is_empty() {
            Some(county.to_string())
        } else {
            Some(format!("{} {}", self.county_qualifier, county))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AddressConfig, ExpansionRule};

    fn parts(street: &str, secondary: &str, primary: &str, county: &str) -> AddressParts {
        AddressParts {
            street: street.to_string(),
            secondary_place: secondary.to_string(),
            primary_place: primary.to_string(),
            county: county.to_string(),
        }
    }

    fn assembler(config: &AddressConfig) -> Assembler {
        Assembler::from_config(config).expect("assembler")
    }

    fn default_assembler() -> Assembler {
        assembler(&AddressConfig::default())
    }

    #[test]
    fn street_with_secondary_place_wins() {
        let address = default_assembler()
            .assemble(&parts("Polna 7", "Borki", "Nysa", "Nyski"))
            .unwrap();
        assert_eq!(address, "7, Polna, Borki, powiat Nyski");
    }

    #[test]
    fn secondary_place_alone_is_reordered() {
        let address = default_assembler()
            .assemble(&parts("", "Borki 12", "", "Nyski"))
            .unwrap();
        assert_eq!(address, "12, Borki, powiat Nyski");
    }

    #[test]
    fn street_with_primary_place_is_the_fallback() {
        let address = default_assembler()
            .assemble(&parts("Polna 7", "", "Nysa", "Nyski"))
            .unwrap();
        assert_eq!(address, "7, Polna, Nysa, powiat Nyski");
    }

    #[test]
    fn county_segment_is_suppressed_for_county_seats() {
        let address = default_assembler()
            .assemble(&parts("Polna 7", "Opole", "", "opole"))
            .unwrap();
        assert_eq!(address, "7, Polna, Opole");
    }

    #[test]
    fn missing_county_leaves_no_trailing_segment() {
        let address = default_assembler()
            .assemble(&parts("Polna 7", "Borki", "", ""))
            .unwrap();
        assert_eq!(address, "7, Polna, Borki");
    }

    #[test]
    fn rows_without_usable_places_produce_nothing() {
        let assembler = default_assembler();
        assert_eq!(assembler.assemble(&parts("Polna 7", "", "", "Nyski")), None);
        assert_eq!(assembler.assemble(&parts("", "", "Nysa", "Nyski")), None);
        assert_eq!(assembler.assemble(&parts("", "", "", "")), None);
    }

    #[test]
    fn rejected_street_suppresses_the_whole_address() {
        let config = AddressConfig {
            reject_substrings: vec!["dz.".to_string()],
            ..AddressConfig::default()
        };
        assert_eq!(
            assembler(&config).assemble(&parts("dz. 231/4", "Borki", "", "Nyski")),
            None
        );
    }

    #[test]
    fn expansions_do_not_touch_place_cells() {
        let config = AddressConfig {
            expansions: vec![ExpansionRule {
                pattern: "ul.".to_string(),
                replacement: "ulica".to_string(),
            }],
            strip_abbreviations: false,
            ..AddressConfig::default()
        };
        let address = assembler(&config)
            .assemble(&parts("", "ul. Borki 12", "", "Nyski"))
            .unwrap();
        assert_eq!(address, "12, ul. Borki, powiat Nyski");
    }

    #[test]
    fn secondary_place_outranks_primary_place() {
        let address = default_assembler()
            .assemble(&parts("Polna 7", "Borki", "Nysa", ""))
            .unwrap();
        assert!(address.contains("Borki"));
        assert!(!address.contains("Nysa"));
    }

    #[test]
    fn custom_county_qualifier_is_used() {
        let config = AddressConfig {
            county_qualifier: "district".to_string(),
            ..AddressConfig::default()
        };
        let address = assembler(&config)
            .assemble(&parts("Polna 7", "Borki", "", "Nyski"))
            .unwrap();
        assert_eq!(address, "7, Polna, Borki, district Nyski");
    }

    #[test]
    fn empty_county_qualifier_appends_the_bare_county() {
        let config = AddressConfig {
            county_qualifier: String::new(),
            ..AddressConfig::default()
        };
        let address = assembler(&config)
            .assemble(&parts("Polna 7", "Borki", "", "Nyski"))
            .unwrap();
        assert_eq!(address, "7, Polna, Borki, Nyski");
    }
}
