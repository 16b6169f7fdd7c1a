//! Resource mapping tables.
//!
//! A mapping file translates the symbolic image, flavor and network names
//! used in stacks into backend ids:
//!
//! ```yaml
//! images:
//!   trusty: 0f6b7e4c-1d2a-4c1e-9a43-52e0c4b8f1aa
//! flavors:
//!   small: m1.small
//! networks:
//!   public: 6d3b7b5e-5c6f-4a43-b0b5-2a6a0c5e0f11
//! ```
//!
//! A symbol missing from its table is taken to be a backend id already.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::stack::WeakRefs;

/// Placeholder written by [`render_template`] for every unresolved symbol.
pub const MISSING_VALUE: &str = "<missing value>";

/// Symbol → backend id tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceMapping {
    pub images: BTreeMap<String, String>,
    pub flavors: BTreeMap<String, String>,
    pub networks: BTreeMap<String, String>,
}

impl ResourceMapping {
    /// Image id for a symbol. Mapping wins over the raw value.
    pub fn image<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.images.get(symbol).map(String::as_str).unwrap_or(symbol)
    }

    /// Flavor id for a symbol. Mapping wins over the raw value.
    pub fn flavor<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.flavors.get(symbol).map(String::as_str).unwrap_or(symbol)
    }

    /// Network id for a symbol, only if the mapping knows it.
    pub fn network(&self, symbol: &str) -> Option<&str> {
        self.networks.get(symbol).map(String::as_str)
    }

    /// `(section, symbol)` pairs still holding the template placeholder.
    pub fn placeholders(&self) -> Vec<(&'static str, &str)> {
        let sections = [
            ("images", &self.images),
            ("flavors", &self.flavors),
            ("networks", &self.networks),
        ];
        sections
            .into_iter()
            .flat_map(|(section, table)| {
                table
                    .iter()
                    .filter(|(_, v)| v.as_str() == MISSING_VALUE)
                    .map(move |(k, _)| (section, k.as_str()))
            })
            .collect()
    }
}

/// Render a mapping file with a placeholder for every weak reference.
pub fn render_template(refs: &WeakRefs) -> String {
    let mut out = String::from("# Overcast resource mappings\n");
    out.push_str(&format!(
        "# Replace each \"{}\" with a backend id.\n",
        MISSING_VALUE
    ));

    for (section, symbols) in [
        ("images", &refs.images),
        ("flavors", &refs.flavors),
        ("networks", &refs.networks),
    ] {
        if symbols.is_empty() {
            out.push_str(&format!("{}: {{}}\n", section));
            continue;
        }
        out.push_str(&format!("{}:\n", section));
        for symbol in symbols {
            out.push_str(&format!(
                "  {}: {}\n",
                yaml_quote(symbol),
                yaml_quote(MISSING_VALUE)
            ));
        }
    }

    out
}

/// JSON string literals are valid double-quoted YAML scalars.
fn yaml_quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> ResourceMapping {
        serde_yaml::from_str(
            r#"
images:
  trusty: img-123
flavors:
  small: m1.small
networks:
  public: net-ext
"#,
        )
        .unwrap()
    }

    #[test]
    fn mapped_symbols_translate() {
        let m = mapping();
        assert_eq!(m.image("trusty"), "img-123");
        assert_eq!(m.flavor("small"), "m1.small");
        assert_eq!(m.network("public"), Some("net-ext"));
    }

    #[test]
    fn unmapped_symbols_pass_through() {
        let m = mapping();
        assert_eq!(m.image("3f1c-raw-id"), "3f1c-raw-id");
        assert_eq!(m.flavor("m1.large"), "m1.large");
        assert_eq!(m.network("private"), None);
    }

    #[test]
    fn sections_are_optional() {
        let m: ResourceMapping = serde_yaml::from_str("images:\n  a: b\n").unwrap();
        assert_eq!(m.images.len(), 1);
        assert!(m.flavors.is_empty());
        assert!(m.networks.is_empty());
    }

    #[test]
    fn template_round_trips_to_weak_refs() {
        let mut refs = WeakRefs::default();
        refs.images.insert("trusty".into());
        refs.images.insert("ubuntu: 16.04".into());
        refs.flavors.insert("small".into());
        refs.networks.insert("public".into());

        let text = render_template(&refs);
        let loaded: ResourceMapping = serde_yaml::from_str(&text).unwrap();

        assert_eq!(loaded.images.keys().cloned().collect::<Vec<_>>(), {
            refs.images.iter().cloned().collect::<Vec<_>>()
        });
        assert!(loaded.flavors.keys().eq(refs.flavors.iter()));
        assert!(loaded.networks.keys().eq(refs.networks.iter()));
        assert!(loaded.images.values().all(|v| v == MISSING_VALUE));
    }

    #[test]
    fn empty_sections_render_as_empty_maps() {
        let text = render_template(&WeakRefs::default());
        assert!(text.contains("images: {}\n"));
        let loaded: ResourceMapping = serde_yaml::from_str(&text).unwrap();
        assert_eq!(loaded, ResourceMapping::default());
    }

    #[test]
    fn placeholders_are_reported() {
        let mut m = mapping();
        m.flavors.insert("large".into(), MISSING_VALUE.into());
        assert_eq!(m.placeholders(), vec![("flavors", "large")]);
    }
}
