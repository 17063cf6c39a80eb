//! URI-Set Normalizer (§4.1): flattens caller-supplied destinations into
//! the canonical `[[Uri]]` shape a fork requires. Pure and total — every
//! input produces a value, never an error.

use crate::message::{empty_uri_set, Uri, UriSet};
use crate::traits::UriParser;

/// A single leaf the caller can hand in: an already-parsed `Uri`, or a
/// byte string to be parsed (possibly into several `Uri`s at once).
#[derive(Debug, Clone)]
pub enum Leaf {
    /// An already-constructed URI.
    Uri(Uri),
    /// A byte string to run through [`UriParser::parse_uris`].
    Text(Vec<u8>),
}

/// One element of a top-level list: a loose leaf, or a nested list
/// (itself a flat run of leaves — the table in §4.1 never nests deeper
/// than one level).
#[derive(Debug, Clone)]
pub enum ListItem {
    /// A loose `Uri`, accumulated with adjacent loose `Uri`s.
    Uri(Uri),
    /// A loose byte string — always its own serial step once any nested
    /// list appears anywhere in the top-level list.
    Text(Vec<u8>),
    /// A nested list, parsed into one parallel group and always its own
    /// serial step.
    Nested(Vec<Leaf>),
}

/// The normalizer's caller-facing input shape (§4.1's "Input shape"
/// column).
#[derive(Debug, Clone)]
pub enum NormalizeInput {
    /// A single `Uri`.
    Uri(Uri),
    /// A byte string.
    Text(Vec<u8>),
    /// A list of leaves and/or nested lists.
    List(Vec<ListItem>),
    /// Anything else — the catch-all row of the table.
    Other,
}

fn parse_leaf(leaf: &Leaf, parser: &dyn UriParser) -> Vec<Uri> {
    match leaf {
        Leaf::Uri(uri) => vec![uri.strip_ext()],
        Leaf::Text(bytes) => parser
            .parse_uris(bytes)
            .into_iter()
            .map(|u| u.strip_ext())
            .collect(),
    }
}

/// `normalize(input) -> [[Uri]]` (§4.1).
pub fn normalize(input: NormalizeInput, parser: &dyn UriParser) -> UriSet {
    match input {
        NormalizeInput::Uri(uri) => vec![vec![uri.strip_ext()]],
        NormalizeInput::Text(bytes) => vec![parse_leaf(&Leaf::Text(bytes), parser)],
        NormalizeInput::List(items) => normalize_list(items, parser),
        NormalizeInput::Other => empty_uri_set(),
    }
}

fn normalize_list(items: Vec<ListItem>, parser: &dyn UriParser) -> UriSet {
    let has_nested = items.iter().any(|item| matches!(item, ListItem::Nested(_)));

    if !has_nested {
        // Row 3: a flat list of strings/Uris is one parallel group.
        let mut group = Vec::new();
        for item in items {
            match item {
                ListItem::Uri(uri) => group.push(uri.strip_ext()),
                ListItem::Text(bytes) => group.extend(parse_leaf(&Leaf::Text(bytes), parser)),
                ListItem::Nested(_) => unreachable!("has_nested already checked"),
            }
        }
        return if group.is_empty() { empty_uri_set() } else { vec![group] };
    }

    // Row 4: multi-mode. Loose `Uri`s accumulate; a byte string or a
    // nested list is always its own serial step, flushing any pending
    // accumulation first.
    let mut steps: UriSet = Vec::new();
    let mut pending: Vec<Uri> = Vec::new();
    for item in items {
        match item {
            ListItem::Uri(uri) => pending.push(uri.strip_ext()),
            ListItem::Text(bytes) => {
                if !pending.is_empty() {
                    steps.push(std::mem::take(&mut pending));
                }
                steps.push(parse_leaf(&Leaf::Text(bytes), parser));
            }
            ListItem::Nested(leaves) => {
                if !pending.is_empty() {
                    steps.push(std::mem::take(&mut pending));
                }
                let group = leaves.iter().flat_map(|leaf| parse_leaf(leaf, parser)).collect();
                steps.push(group);
            }
        }
    }
    if !pending.is_empty() {
        steps.push(pending);
    }

    if steps.is_empty() {
        empty_uri_set()
    } else {
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Host, HostPort, Scheme};

    struct StubParser;

    impl UriParser for StubParser {
        fn parse_uris(&self, input: &[u8]) -> Vec<Uri> {
            let text = std::str::from_utf8(input).unwrap_or("");
            if text.is_empty() || text == "sip:unparsable" {
                return Vec::new();
            }
            let name = text.trim_start_matches("sip:");
            vec![Uri::new(
                Scheme::Sip,
                None,
                HostPort::new(Host::Domain(name.into()), None),
            )]
        }
    }

    fn uri_named(name: &str) -> Uri {
        Uri::new(Scheme::Sip, None, HostPort::new(Host::Domain(name.into()), None))
    }

    #[test]
    fn single_uri_becomes_one_group_of_one() {
        let parser = StubParser;
        let input = NormalizeInput::Uri(uri_named("a"));
        assert_eq!(normalize(input, &parser), vec![vec![uri_named("a")]]);
    }

    #[test]
    fn flat_list_of_uris_and_strings_is_one_group() {
        let parser = StubParser;
        let input = NormalizeInput::List(vec![
            ListItem::Text(b"sip:a".to_vec()),
            ListItem::Uri(uri_named("b")),
        ]);
        assert_eq!(normalize(input, &parser), vec![vec![uri_named("a"), uri_named("b")]]);
    }

    #[test]
    fn unparsable_bare_string_yields_empty_set() {
        let parser = StubParser;
        let input = NormalizeInput::Text(b"sip:unparsable".to_vec());
        assert_eq!(normalize(input, &parser), empty_uri_set());
    }

    #[test]
    fn other_shape_yields_empty_set() {
        let parser = StubParser;
        assert_eq!(normalize(NormalizeInput::Other, &parser), empty_uri_set());
    }

    /// Scenario (a) from §8: `["sip:a", ["sip:b", UriC], <<"sip:d">>, ["sip:e"]]`
    /// normalizes to `[[UriA], [UriB, UriC], [UriD], [UriE]]`.
    #[test]
    fn scenario_a_serial_parallel_mix() {
        let parser = StubParser;
        let input = NormalizeInput::List(vec![
            ListItem::Text(b"sip:a".to_vec()),
            ListItem::Nested(vec![Leaf::Text(b"sip:b".to_vec()), Leaf::Uri(uri_named("c"))]),
            ListItem::Text(b"sip:d".to_vec()),
            ListItem::Nested(vec![Leaf::Text(b"sip:e".to_vec())]),
        ]);
        let got = normalize(input, &parser);
        assert_eq!(
            got,
            vec![
                vec![uri_named("a")],
                vec![uri_named("b"), uri_named("c")],
                vec![uri_named("d")],
                vec![uri_named("e")],
            ]
        );
    }

    #[test]
    fn every_output_uri_has_stripped_extensions() {
        let parser = StubParser;
        let mut dirty = uri_named("a");
        dirty.ext_opts.push(crate::message::Parameter::new("foo", None::<&str>));
        let input = NormalizeInput::Uri(dirty);
        for group in normalize(input, &parser) {
            for uri in group {
                assert!(uri.is_stripped());
            }
        }
    }
}
