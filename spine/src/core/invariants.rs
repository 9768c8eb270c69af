//! Semantic catalogue invariants not expressible via JSON Schema.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::core::catalogue::Catalogue;
use crate::core::types::ItemId;

static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_:.-]+$").expect("identifier regex"));

/// Check semantic invariants of a catalogue:
/// - Item and block identifiers match `^[a-z0-9_:.-]+$`
/// - Recipe yields and ingredient counts are `> 0`
/// - Source lists are non-empty and free of duplicates
/// - The ingredient graph is acyclic
pub fn validate_catalogue(catalogue: &Catalogue) -> Vec<String> {
    let mut errors = Vec::new();

    for (item, recipe) in &catalogue.recipes {
        check_ident(item.as_str(), &format!("recipes/{}", item), &mut errors);
        if recipe.output_count == 0 {
            errors.push(format!("recipes/{}: yield must be > 0", item));
        }
        if recipe.ingredients.is_empty() {
            errors.push(format!("recipes/{}: ingredients must not be empty", item));
        }
        for (ingredient, count) in &recipe.ingredients {
            let path = format!("recipes/{}/{}", item, ingredient);
            check_ident(ingredient.as_str(), &path, &mut errors);
            if *count == 0 {
                errors.push(format!("{}: count must be > 0", path));
            }
        }
    }

    for (item, blocks) in &catalogue.sources {
        check_ident(item.as_str(), &format!("sources/{}", item), &mut errors);
        if blocks.is_empty() {
            errors.push(format!("sources/{}: source list must not be empty", item));
        }
        let mut seen = BTreeSet::new();
        for block in blocks {
            check_ident(block.as_str(), &format!("sources/{}/{}", item, block), &mut errors);
            if !seen.insert(block) {
                errors.push(format!("sources/{}: duplicate source '{}'", item, block));
            }
        }
    }

    if let Some(cycle) = find_cycle(catalogue) {
        let names: Vec<&str> = cycle.iter().map(ItemId::as_str).collect();
        errors.push(format!("recipe cycle: {}", names.join(" -> ")));
    }

    errors
}

fn check_ident(ident: &str, path: &str, errors: &mut Vec<String>) {
    if !IDENT_RE.is_match(ident) {
        errors.push(format!("{}: invalid identifier '{}'", path, ident));
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Depth-first search over recipe edges (output -> ingredient), in key order
/// so the reported cycle is stable.
fn find_cycle(catalogue: &Catalogue) -> Option<Vec<ItemId>> {
    let mut marks: BTreeMap<&ItemId, Mark> = BTreeMap::new();
    let mut stack: Vec<&ItemId> = Vec::new();
    for item in catalogue.recipes.keys() {
        if let Some(cycle) = visit(catalogue, item, &mut marks, &mut stack) {
            return Some(cycle);
        }
    }
    None
}

fn visit<'a>(
    catalogue: &'a Catalogue,
    item: &'a ItemId,
    marks: &mut BTreeMap<&'a ItemId, Mark>,
    stack: &mut Vec<&'a ItemId>,
) -> Option<Vec<ItemId>> {
    match marks.get(item) {
        Some(Mark::Done) => return None,
        Some(Mark::Visiting) => {
            let start = stack.iter().position(|entry| *entry == item).unwrap_or(0);
            let mut cycle: Vec<ItemId> = stack[start..].iter().map(|id| (*id).clone()).collect();
            cycle.push(item.clone());
            return Some(cycle);
        }
        None => {}
    }

    marks.insert(item, Mark::Visiting);
    stack.push(item);
    if let Some(recipe) = catalogue.recipes.get(item) {
        for ingredient in recipe.ingredients.keys() {
            if let Some(cycle) = visit(catalogue, ingredient, marks, stack) {
                return Some(cycle);
            }
        }
    }
    stack.pop();
    marks.insert(item, Mark::Done);
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_catalogue_has_no_errors() {
        let catalogue = Catalogue::default()
            .with_recipe("stick", 4, &[("planks", 2)])
            .with_recipe("planks", 4, &[("log", 1)])
            .with_source("log", &["oak_log", "birch_log"]);
        assert!(validate_catalogue(&catalogue).is_empty());
    }

    #[test]
    fn reports_cycle_path() {
        let catalogue = Catalogue::default()
            .with_recipe("a", 1, &[("b", 1)])
            .with_recipe("b", 1, &[("c", 1)])
            .with_recipe("c", 1, &[("a", 1)]);
        let errors = validate_catalogue(&catalogue);
        assert_eq!(errors, vec!["recipe cycle: a -> b -> c -> a".to_string()]);
    }

    #[test]
    fn reports_all_violations_together() {
        let catalogue = Catalogue::default()
            .with_recipe("Stick", 0, &[("planks", 0)])
            .with_source("log", &["oak_log", "oak_log"])
            .with_source("sand", &[]);
        let errors = validate_catalogue(&catalogue);
        assert!(errors.iter().any(|err| err.contains("invalid identifier 'Stick'")));
        assert!(errors.iter().any(|err| err.contains("yield must be > 0")));
        assert!(errors.iter().any(|err| err.contains("count must be > 0")));
        assert!(errors.iter().any(|err| err.contains("duplicate source 'oak_log'")));
        assert!(errors.iter().any(|err| err.contains("source list must not be empty")));
    }
}
