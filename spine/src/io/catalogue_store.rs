//! Catalogue load/save helpers with schema + invariant validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;

use crate::core::catalogue::Catalogue;
use crate::core::invariants::validate_catalogue;

pub const CATALOGUE_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/catalogue.schema.json"
));

/// Load and validate a catalogue from disk (schema + invariants).
pub fn load_catalogue(path: &Path) -> Result<Catalogue> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read catalogue {}", path.display()))?;
    parse_catalogue(&contents).with_context(|| format!("load catalogue {}", path.display()))
}

/// Parse and validate catalogue JSON.
pub fn parse_catalogue(contents: &str) -> Result<Catalogue> {
    let value: Value = serde_json::from_str(contents).context("parse catalogue json")?;
    validate_schema(&value)?;
    let catalogue: Catalogue =
        serde_json::from_value(value).context("deserialize catalogue")?;
    let errors = validate_catalogue(&catalogue);
    if !errors.is_empty() {
        return Err(anyhow!(
            "catalogue invariants failed:\n- {}",
            errors.join("\n- ")
        ));
    }
    Ok(catalogue)
}

/// Write catalogue as pretty JSON with a trailing newline.
pub fn write_catalogue(path: &Path, catalogue: &Catalogue) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(catalogue).context("serialize catalogue")?;
    buf.push('\n');
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    fs::write(path, buf).with_context(|| format!("write catalogue {}", path.display()))
}

fn validate_schema(instance: &Value) -> Result<()> {
    let schema: Value =
        serde_json::from_str(CATALOGUE_SCHEMA).context("parse embedded catalogue schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(instance) {
        let messages = compiled
            .iter_errors(instance)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "catalogue schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ItemId;
    use crate::test_support::{temp_dir, wood_catalogue, write_file};

    #[test]
    fn write_then_load_round_trips() {
        let temp = temp_dir().expect("tempdir");
        let path = temp.path().join("catalogue.json");
        let catalogue = wood_catalogue();
        write_catalogue(&path, &catalogue).expect("write");
        let loaded = load_catalogue(&path).expect("load");
        assert_eq!(loaded, catalogue);
    }

    #[test]
    fn parses_yield_key() {
        let catalogue = parse_catalogue(
            r#"{"recipes": {"stick": {"yield": 4, "ingredients": {"planks": 2}}}}"#,
        )
        .expect("parse");
        let recipe = catalogue.recipe(&ItemId::from("stick")).expect("recipe");
        assert_eq!(recipe.output_count, 4);
        assert!(catalogue.sources.is_empty());
    }

    #[test]
    fn schema_rejects_zero_yield_and_unknown_fields() {
        let err = parse_catalogue(
            r#"{"recipes": {"stick": {"yield": 0, "ingredients": {"planks": 2}}}, "extra": 1}"#,
        )
        .expect_err("schema violation");
        assert!(format!("{:#}", err).contains("schema validation failed"));
    }

    #[test]
    fn invariants_report_all_violations() {
        let temp = temp_dir().expect("tempdir");
        write_file(
            temp.path(),
            "catalogue.json",
            r#"{
  "recipes": {
    "a": {"yield": 1, "ingredients": {"b": 1}},
    "b": {"yield": 1, "ingredients": {"a": 1}}
  },
  "sources": {"Log": ["oak_log", "oak_log"]}
}"#,
        )
        .expect("write");
        let err = load_catalogue(&temp.path().join("catalogue.json")).expect_err("invalid");
        let message = format!("{:#}", err);
        assert!(message.contains("recipe cycle: a -> b -> a"), "{message}");
        assert!(message.contains("invalid identifier 'Log'"), "{message}");
        assert!(message.contains("duplicate source 'oak_log'"), "{message}");
    }
}
