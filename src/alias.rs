//! Language aliases: shortcut names that expand to one or more servers.

use std::collections::BTreeMap;

use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::identifier::Identifier;
use crate::runtime::Runtime;

/// Maps an alias (e.g. "python") to the ordered candidate server names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alias: impl Into<String>, candidates: Vec<String>) {
        self.entries.insert(alias.into(), candidates);
    }

    pub fn candidates(&self, alias: &str) -> Option<&[String]> {
        self.entries.get(alias).map(Vec::as_slice)
    }

    /// Expand an identifier through the alias table.
    ///
    /// Several candidates are put to the user; the chosen one keeps the requested
    /// version. `Ok(None)` means the user declined and nothing should happen.
    #[tracing::instrument(skip(self, runtime))]
    pub fn resolve<R: Runtime + ?Sized>(
        &self,
        runtime: &R,
        identifier: &Identifier,
    ) -> Result<Option<Identifier>> {
        let candidates = match self.candidates(&identifier.name) {
            Some(candidates) if !candidates.is_empty() => candidates,
            _ => return Ok(Some(identifier.clone())),
        };

        if let [only] = candidates {
            debug!("Alias {} resolves to {}", identifier.name, only);
            return Ok(Some(Identifier::new(only, identifier.version.clone())));
        }

        let prompt = format!(
            "The alias {} maps to multiple servers. Please select which one you want to use.",
            identifier.name
        );
        match runtime.select(&prompt, candidates)?.and_then(|i| candidates.get(i)) {
            Some(chosen) => {
                debug!("Alias {} resolved to {} by user", identifier.name, chosen);
                Ok(Some(Identifier::new(chosen, identifier.version.clone())))
            }
            None => {
                debug!("No server selected for alias {}", identifier.name);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;

    fn table() -> AliasTable {
        let mut table = AliasTable::new();
        table.insert("web", vec!["html-ls".into(), "css-ls".into()]);
        table.insert("rust", vec!["rust_analyzer".into()]);
        table
    }

    #[test]
    fn test_unknown_name_passes_through() {
        let runtime = MockRuntime::new();
        let id = Identifier::new("pyright", Some("1.1".into()));
        let resolved = table().resolve(&runtime, &id).unwrap();
        assert_eq!(resolved, Some(id));
    }

    #[test]
    fn test_single_candidate_needs_no_prompt() {
        // No expectation set: any prompt would panic the mock
        let runtime = MockRuntime::new();
        let id = Identifier::new("rust", Some("nightly".into()));
        let resolved = table().resolve(&runtime, &id).unwrap();
        assert_eq!(
            resolved,
            Some(Identifier::new("rust_analyzer", Some("nightly".into())))
        );
    }

    #[test]
    fn test_multiple_candidates_prompt_with_all_choices() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_select()
            .withf(|_, choices| choices.to_vec() == vec!["html-ls".to_string(), "css-ls".to_string()])
            .times(1)
            .returning(|_, _| Ok(Some(1)));

        let id = Identifier::new("web", None);
        let resolved = table().resolve(&runtime, &id).unwrap();
        assert_eq!(resolved, Some(Identifier::new("css-ls", None)));
    }

    #[test]
    fn test_declined_choice_returns_none() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_select()
            .times(1)
            .returning(|_, _| Ok(None));

        let resolved = table()
            .resolve(&runtime, &Identifier::new("web", None))
            .unwrap();
        assert_eq!(resolved, None);
    }

    #[test]
    fn test_out_of_range_choice_is_a_decline() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_select()
            .times(1)
            .returning(|_, _| Ok(Some(7)));

        let resolved = table()
            .resolve(&runtime, &Identifier::new("web", None))
            .unwrap();
        assert_eq!(resolved, None);
    }

    #[test]
    fn test_deserializes_from_json_map() {
        let table: AliasTable =
            serde_json::from_str(r#"{"web": ["html-ls", "css-ls"]}"#).unwrap();
        assert_eq!(
            table.candidates("web"),
            Some(&["html-ls".to_string(), "css-ls".to_string()][..])
        );
        assert_eq!(table.candidates("go"), None);
    }
}
