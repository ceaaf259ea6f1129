use proptest::prelude::*;
use sheet_geocoder::street::{Expansion, NormalizeOptions, ParsedName, normalize};

fn number_first() -> NormalizeOptions {
    NormalizeOptions {
        number_first: true,
        ..NormalizeOptions::default()
    }
}

fn reordered(name: &str) -> String {
    match normalize(name, &number_first()) {
        ParsedName::Accepted(out) => out,
        ParsedName::Rejected => panic!("unexpected rejection for '{name}'"),
    }
}

#[test]
fn building_numbers_move_to_the_front() {
    let cases = [
        ("11-go listopada 17", "17, 11-go listopada"),
        ("11-go listopada 17\\23", "17\\23, 11-go listopada"),
        ("11-go listopada 17-23", "17-23, 11-go listopada"),
        ("11-go listopada 17/1243", "17/1243, 11-go listopada"),
        ("3 Maja 23", "23, 3 Maja"),
        ("3 Maja 23a", "23a, 3 Maja"),
        ("3 Maja 2 a", "2a, 3 Maja"),
        ("3 Maja 2B", "2B, 3 Maja"),
        ("3 Maja 2 B", "2B, 3 Maja"),
        ("3 Maja 5/a", "5a, 3 Maja"),
        ("3 Maja 23/4a", "23/4a, 3 Maja"),
        ("3 Maja 2-6", "2-6, 3 Maja"),
        ("grudnia 1970 43", "43, grudnia 1970"),
    ];
    for (input, expected) in cases {
        assert_eq!(reordered(input), expected, "for input '{input}'");
    }
}

#[test]
fn non_building_numbers_leave_the_name_unchanged() {
    let cases = [
        "3 Maja 23aa",
        "3 Maja 2 aa",
        "3 Maja 2 Aa",
        "3 Maja 2 AA",
        "3 Maja 2-A",
        "3 Maja -2",
        "3 Maja \\32",
        "3 Maja /32",
        "3 Maja 17\\\\23",
        "3 Maja 17//23",
        "3 Maja12",
        "Polna",
    ];
    for input in cases {
        assert_eq!(reordered(input), input, "expected '{input}' unchanged");
    }
}

#[test]
fn reordering_twice_changes_nothing() {
    for input in ["11-go listopada 17", "3 Maja 23a", "Polna"] {
        let once = reordered(input);
        assert_eq!(reordered(&once), once, "for input '{input}'");
    }
}

#[test]
fn all_passes_compose_in_order() {
    let options = NormalizeOptions {
        reject_substrings: vec!["obręb".to_string()],
        expansions: vec![Expansion::compile("św.", "świętego").unwrap()],
        strip_abbreviations: true,
        number_first: true,
    };
    assert_eq!(
        normalize("ul. św. Jerzego 20", &options),
        ParsedName::Accepted("20, świętego Jerzego".to_string())
    );
    assert_eq!(normalize("obręb Jerzego 20", &options), ParsedName::Rejected);
}

#[test]
fn expansions_chain_across_rules() {
    let options = NormalizeOptions {
        expansions: vec![
            Expansion::compile("św.", "świętego").unwrap(),
            Expansion::compile("ul.", "ulica").unwrap(),
        ],
        ..NormalizeOptions::default()
    };
    assert_eq!(
        normalize("Ul. Św. Jerzego 20", &options),
        ParsedName::Accepted("ulica świętego Jerzego 20".to_string())
    );
}

proptest! {
    #[test]
    fn default_normalization_is_plain_trimming(name in "[A-Za-z0-9ąćęłńóśźż ./\\\\-]{0,40}") {
        prop_assert_eq!(
            normalize(&name, &NormalizeOptions::default()),
            ParsedName::Accepted(name.trim().to_string())
        );
    }

    #[test]
    fn full_normalization_never_panics_or_rejects_without_a_reject_list(name in ".{0,60}") {
        let options = NormalizeOptions {
            strip_abbreviations: true,
            number_first: true,
            ..NormalizeOptions::default()
        };
        prop_assert!(matches!(normalize(&name, &options), ParsedName::Accepted(_)));
    }
}
