// Copyright 2026 Schoolyard Software, LLC.

//! Property tests for DN escaping and filter assembly.

use campus_domain::dn::{escape_dn_chars, parent_dn, rdn_value, unescape_dn_value};
use campus_domain::filter::{self, Filter};
use indexmap::IndexMap;
use proptest::prelude::*;

proptest! {
    #[test]
    fn dn_escaping_round_trips(value in "[ -~]{1,30}") {
        let escaped = escape_dn_chars(&value);
        prop_assert_eq!(unescape_dn_value(&escaped), value);
    }

    #[test]
    fn escaped_values_survive_dn_assembly(
        name in "[A-Za-z0-9](?:[A-Za-z0-9 ,+=]{0,18}[A-Za-z0-9])?"
    ) {
        let dn = format!("uid={},cn=users,dc=example,dc=org", escape_dn_chars(&name));
        prop_assert_eq!(rdn_value(&dn), Some(name));
        prop_assert_eq!(
            parent_dn(&dn),
            Some("cn=users,dc=example,dc=org".to_string())
        );
    }

    #[test]
    fn equality_filters_match_their_own_value(value in "[ -~]{1,20}") {
        let filter = Filter::parse(&filter::eq("cn", &value)).unwrap();
        let mut attributes: IndexMap<String, Vec<String>> = IndexMap::new();
        attributes.insert("cn".to_string(), vec![value]);
        prop_assert!(filter.matches(&attributes));
    }

    #[test]
    fn equality_filters_never_match_a_disjoint_value(value in "[a-z]{1,10}") {
        let filter = Filter::parse(&filter::eq("cn", &value)).unwrap();
        let mut attributes: IndexMap<String, Vec<String>> = IndexMap::new();
        attributes.insert("cn".to_string(), vec![format!("{value}X")]);
        prop_assert!(!filter.matches(&attributes));
    }

    #[test]
    fn conjunction_of_matching_parts_matches(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
        let combined = filter::and(&[filter::eq("uid", &a), filter::eq("sn", &b)]);
        let filter = Filter::parse(&combined).unwrap();
        let mut attributes: IndexMap<String, Vec<String>> = IndexMap::new();
        attributes.insert("uid".to_string(), vec![a]);
        attributes.insert("sn".to_string(), vec![b]);
        prop_assert!(filter.matches(&attributes));
    }
}
