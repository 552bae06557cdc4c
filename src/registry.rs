//! Block definitions and the registry that holds them.

use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while creating a block definition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefinitionError {
    /// Declared parameters with no `{param}` placeholder in the template.
    #[error("placeholders missing from template for: {}", .missing.join(", "))]
    MissingPlaceholders { missing: Vec<String> },

    /// The same parameter name was declared more than once.
    #[error("parameter declared more than once: {}", .duplicates.join(", "))]
    DuplicateParams { duplicates: Vec<String> },
}

/// A named, reusable code-block template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDefinition {
    pub name: String,
    /// Parameter names in declaration order.
    pub params: Vec<String>,
    /// Template text containing `{param}` placeholders.
    pub template: String,
}

impl BlockDefinition {
    pub fn new(name: impl Into<String>, params: Vec<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params,
            template: template.into(),
        }
    }

    /// The literal placeholder text for a parameter name.
    pub fn placeholder(param: &str) -> String {
        format!("{{{}}}", param)
    }

    /// Declared parameters whose placeholder does not occur in the template.
    pub fn missing_placeholders(&self) -> Vec<String> {
        self.params
            .iter()
            .filter(|p| !self.template.contains(&Self::placeholder(p)))
            .cloned()
            .collect()
    }

    /// Parameter names declared more than once, each listed once in first-seen order.
    pub fn duplicate_params(&self) -> Vec<String> {
        let mut duplicates: Vec<String> = Vec::new();
        for (i, param) in self.params.iter().enumerate() {
            if self.params[..i].contains(param) && !duplicates.contains(param) {
                duplicates.push(param.clone());
            }
        }
        duplicates
    }

    /// Label for the insert picker, e.g. `print<msg><level>`.
    pub fn picker_label(&self) -> String {
        format!("{}<{}>", self.name, self.params.join("><"))
    }
}

/// Split a pipe-delimited parameter list, trimming pieces and dropping empty ones.
pub fn parse_params(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// Ordered collection of block definitions.
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    definitions: Vec<Rc<BlockDefinition>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append a new definition.
    ///
    /// `raw_params` is the pipe-delimited list typed by the user. The registry is
    /// left untouched when a parameter name repeats or any declared parameter
    /// lacks a placeholder.
    pub fn create(
        &mut self,
        name: &str,
        raw_params: &str,
        template: &str,
    ) -> Result<Rc<BlockDefinition>, DefinitionError> {
        let definition = BlockDefinition::new(name, parse_params(raw_params), template);
        let duplicates = definition.duplicate_params();
        if !duplicates.is_empty() {
            debug!(name, duplicates = ?duplicates, "definition_rejected");
            return Err(DefinitionError::DuplicateParams { duplicates });
        }
        let missing = definition.missing_placeholders();
        if !missing.is_empty() {
            debug!(name, missing = ?missing, "definition_rejected");
            return Err(DefinitionError::MissingPlaceholders { missing });
        }

        let definition = Rc::new(definition);
        self.definitions.push(Rc::clone(&definition));
        info!(
            name = %definition.name,
            params = definition.params.len(),
            "definition_created"
        );
        Ok(definition)
    }

    /// Remove the definition at `index`.
    ///
    /// Instances already placed in a sequence keep their own handle to the
    /// definition and are not touched.
    pub fn delete(&mut self, index: usize) -> Option<Rc<BlockDefinition>> {
        if index >= self.definitions.len() {
            return None;
        }
        let removed = self.definitions.remove(index);
        info!(index, name = %removed.name, "definition_deleted");
        Some(removed)
    }

    pub fn get(&self, index: usize) -> Option<&Rc<BlockDefinition>> {
        self.definitions.get(index)
    }

    /// Position of `definition` in the registry, compared by identity.
    pub fn index_of(&self, definition: &Rc<BlockDefinition>) -> Option<usize> {
        self.definitions
            .iter()
            .position(|d| Rc::ptr_eq(d, definition))
    }

    /// Swap in a whole new set of definitions (used by import).
    pub fn replace_all(&mut self, definitions: Vec<BlockDefinition>) {
        self.definitions = definitions.into_iter().map(Rc::new).collect();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<BlockDefinition>> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_params_trims_and_drops_empty() {
        assert_eq!(parse_params(" a | b||c |"), vec!["a", "b", "c"]);
        assert!(parse_params("").is_empty());
        assert!(parse_params(" | ").is_empty());
    }

    #[test]
    fn test_create_appends_definition() {
        let mut registry = DefinitionRegistry::new();
        let def = registry
            .create("print", "msg", "println!(\"{msg}\");")
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(def.params, vec!["msg"]);
        assert_eq!(registry.index_of(&def), Some(0));
    }

    #[test]
    fn test_create_rejects_missing_placeholder() {
        let mut registry = DefinitionRegistry::new();
        let err = registry
            .create("loop", "start|end|step", "for i in {start}..{end} {}")
            .unwrap_err();

        assert_eq!(
            err,
            DefinitionError::MissingPlaceholders {
                missing: vec!["step".to_string()]
            }
        );
        assert_eq!(err.to_string(), "placeholders missing from template for: step");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_create_rejects_duplicate_params() {
        let mut registry = DefinitionRegistry::new();
        let err = registry.create("dup", "a| b |a|b|a", "{a}{b}").unwrap_err();

        assert_eq!(
            err,
            DefinitionError::DuplicateParams {
                duplicates: vec!["a".to_string(), "b".to_string()]
            }
        );
        assert_eq!(err.to_string(), "parameter declared more than once: a, b");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_create_tolerates_undeclared_placeholders() {
        let mut registry = DefinitionRegistry::new();
        let def = registry.create("x", "a", "{a} {b}").unwrap();
        assert_eq!(def.template, "{a} {b}");
    }

    #[test]
    fn test_create_without_params() {
        let mut registry = DefinitionRegistry::new();
        assert!(registry.create("blank", "", "fn main() {}").is_ok());
    }

    #[test]
    fn test_delete_by_index() {
        let mut registry = DefinitionRegistry::new();
        registry.create("a", "", "A").unwrap();
        registry.create("b", "", "B").unwrap();

        let removed = registry.delete(0).unwrap();
        assert_eq!(removed.name, "a");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(0).unwrap().name, "b");
        assert!(registry.delete(5).is_none());
    }

    #[test]
    fn test_index_of_uses_identity() {
        let mut registry = DefinitionRegistry::new();
        registry.create("a", "", "A").unwrap();
        let lookalike = Rc::new(BlockDefinition::new("a", Vec::new(), "A"));
        assert_eq!(registry.index_of(&lookalike), None);
    }

    #[test]
    fn test_picker_label() {
        let def = BlockDefinition::new("call", vec!["f".into(), "arg".into()], "{f}({arg})");
        assert_eq!(def.picker_label(), "call<f><arg>");
    }
}
