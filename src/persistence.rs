//! JSON files for block definitions and saved progress.
//!
//! Definitions are stored as `[{"name", "params", "template"}]`. Progress is
//! stored as `[{"definition": <registry index>, "values": {..}}]`, so a
//! progress file is only meaningful against the registry it was saved with.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::registry::{BlockDefinition, DefinitionRegistry};
use crate::sequence::{BlockInstance, ExecutionSequence, SharedInstance};

/// Errors from reading or writing definition and progress files.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A progress entry points past the end of the current registry.
    #[error("entry {entry} refers to definition #{index}, but only {available} are loaded")]
    UnknownDefinition {
        entry: usize,
        index: usize,
        available: usize,
    },

    /// An instance uses a definition that has since been deleted.
    #[error("block {entry} uses definition '{name}', which is no longer registered")]
    DefinitionNotRegistered { entry: usize, name: String },
}

/// On-disk form of a block definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionRecord {
    pub name: String,
    pub params: Vec<String>,
    pub template: String,
}

impl From<&BlockDefinition> for DefinitionRecord {
    fn from(def: &BlockDefinition) -> Self {
        Self {
            name: def.name.clone(),
            params: def.params.clone(),
            template: def.template.clone(),
        }
    }
}

impl From<DefinitionRecord> for BlockDefinition {
    fn from(record: DefinitionRecord) -> Self {
        BlockDefinition::new(record.name, record.params, record.template)
    }
}

/// On-disk form of one placed instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub definition: usize,
    pub values: BTreeMap<String, String>,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, PersistError> {
    let contents = fs::read_to_string(path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write every definition in registry order.
pub fn export_definitions(registry: &DefinitionRegistry, path: &Path) -> Result<(), PersistError> {
    let records: Vec<DefinitionRecord> = registry
        .iter()
        .map(|d| DefinitionRecord::from(&**d))
        .collect();
    write_json(path, &records).inspect_err(|e| warn!(error = %e, "definitions_export_failed"))?;
    info!(path = ?path, count = records.len(), "definitions_exported");
    Ok(())
}

/// Read a definitions file.
///
/// Entries are taken as written; the placeholder check only applies to
/// definitions created interactively.
pub fn read_definitions(path: &Path) -> Result<Vec<BlockDefinition>, PersistError> {
    let records: Vec<DefinitionRecord> =
        read_json(path).inspect_err(|e| warn!(error = %e, "definitions_import_failed"))?;
    Ok(records.into_iter().map(BlockDefinition::from).collect())
}

/// Replace the registry with the contents of a definitions file.
///
/// The registry is only touched once the whole file has parsed.
pub fn import_definitions(
    registry: &mut DefinitionRegistry,
    path: &Path,
) -> Result<usize, PersistError> {
    let definitions = read_definitions(path)?;
    let count = definitions.len();
    registry.replace_all(definitions);
    info!(path = ?path, count, "definitions_imported");
    Ok(count)
}

/// Build progress records, resolving each instance's definition to its registry index.
pub fn progress_records(
    registry: &DefinitionRegistry,
    sequence: &ExecutionSequence,
) -> Result<Vec<ProgressRecord>, PersistError> {
    sequence
        .iter()
        .enumerate()
        .map(|(entry, instance)| {
            let instance = instance.borrow();
            let definition = registry.index_of(&instance.definition).ok_or_else(|| {
                PersistError::DefinitionNotRegistered {
                    entry,
                    name: instance.definition.name.clone(),
                }
            })?;
            Ok(ProgressRecord {
                definition,
                values: instance.values.clone(),
            })
        })
        .collect()
}

/// Write the sequence as a progress file.
pub fn save_progress(
    registry: &DefinitionRegistry,
    sequence: &ExecutionSequence,
    path: &Path,
) -> Result<(), PersistError> {
    let records = progress_records(registry, sequence)
        .and_then(|records| write_json(path, &records).map(|()| records))
        .inspect_err(|e| warn!(error = %e, "progress_save_failed"))?;
    info!(path = ?path, count = records.len(), "progress_saved");
    Ok(())
}

/// Resolve progress records against the registry into fresh instances.
pub fn resolve_progress(
    registry: &DefinitionRegistry,
    records: Vec<ProgressRecord>,
) -> Result<Vec<SharedInstance>, PersistError> {
    records
        .into_iter()
        .enumerate()
        .map(|(entry, record)| {
            let definition = registry.get(record.definition).ok_or(
                PersistError::UnknownDefinition {
                    entry,
                    index: record.definition,
                    available: registry.len(),
                },
            )?;
            Ok(BlockInstance::with_values(Rc::clone(definition), record.values).shared())
        })
        .collect()
}

/// Replace the sequence with the contents of a progress file.
///
/// The sequence is only touched once every entry parsed and resolved.
pub fn load_progress(
    registry: &DefinitionRegistry,
    sequence: &mut ExecutionSequence,
    path: &Path,
) -> Result<usize, PersistError> {
    let instances = read_json(path)
        .and_then(|records| resolve_progress(registry, records))
        .inspect_err(|e| warn!(error = %e, "progress_load_failed"))?;
    let count = instances.len();
    sequence.replace_all(instances);
    info!(path = ?path, count, "progress_loaded");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn sample_registry() -> DefinitionRegistry {
        let mut registry = DefinitionRegistry::new();
        registry
            .create("print", "msg", "println!(\"{msg}\");")
            .unwrap();
        registry
            .create("let", "name|value", "let {name} = {value};")
            .unwrap();
        registry
    }

    fn triples(registry: &DefinitionRegistry) -> Vec<(String, Vec<String>, String)> {
        registry
            .iter()
            .map(|d| (d.name.clone(), d.params.clone(), d.template.clone()))
            .collect()
    }

    #[test]
    fn test_export_then_import_preserves_definitions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blocks.json");
        let registry = sample_registry();

        export_definitions(&registry, &path).unwrap();
        let mut imported = DefinitionRegistry::new();
        imported.create("stale", "", "x").unwrap();
        let count = import_definitions(&mut imported, &path).unwrap();

        assert_eq!(count, 2);
        assert_eq!(triples(&imported), triples(&registry));
    }

    #[test]
    fn test_export_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blocks.json");
        let mut registry = DefinitionRegistry::new();
        registry.create("call", "f", "{f}()").unwrap();

        export_definitions(&registry, &path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{"name": "call", "params": ["f"], "template": "{f}()"}])
        );
    }

    #[test]
    fn test_import_failure_leaves_registry_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, r#"[{"name": "a", "params": []}]"#).unwrap();
        let mut registry = sample_registry();

        let err = import_definitions(&mut registry, &path).unwrap_err();
        assert!(matches!(err, PersistError::Json { .. }));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_import_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut registry = DefinitionRegistry::new();
        let err = import_definitions(&mut registry, &dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, PersistError::Io { .. }));
    }

    #[test]
    fn test_save_then_load_preserves_sequence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let registry = sample_registry();
        let mut sequence = ExecutionSequence::new();
        sequence.add(Rc::clone(registry.get(1).unwrap()), None);
        sequence.add(Rc::clone(registry.get(0).unwrap()), None);
        sequence.add(Rc::clone(registry.get(1).unwrap()), None);
        sequence.set_value(0, "name", "x");
        sequence.set_value(0, "value", "1");
        sequence.set_value(1, "msg", "hi");

        save_progress(&registry, &sequence, &path).unwrap();
        let mut loaded = ExecutionSequence::new();
        assert_eq!(load_progress(&registry, &mut loaded, &path).unwrap(), 3);

        assert_eq!(loaded.len(), sequence.len());
        for (a, b) in loaded.iter().zip(sequence.iter()) {
            let (a, b) = (a.borrow(), b.borrow());
            assert!(Rc::ptr_eq(&a.definition, &b.definition));
            assert_eq!(a.values, b.values);
        }
    }

    #[test]
    fn test_save_format() {
        let registry = sample_registry();
        let mut sequence = ExecutionSequence::new();
        sequence.add(Rc::clone(registry.get(0).unwrap()), None);
        sequence.set_value(0, "msg", "hello");

        let records = progress_records(&registry, &sequence).unwrap();
        assert_eq!(
            serde_json::to_value(&records).unwrap(),
            serde_json::json!([{"definition": 0, "values": {"msg": "hello"}}])
        );
    }

    #[test]
    fn test_save_rejects_deleted_definition() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let mut registry = sample_registry();
        let mut sequence = ExecutionSequence::new();
        sequence.add(Rc::clone(registry.get(0).unwrap()), None);
        registry.delete(0);

        let err = save_progress(&registry, &sequence, &path).unwrap_err();
        assert!(matches!(
            err,
            PersistError::DefinitionNotRegistered { entry: 0, ref name } if name == "print"
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_load_rejects_out_of_range_index() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(
            &path,
            r#"[{"definition": 0, "values": {}}, {"definition": 7, "values": {}}]"#,
        )
        .unwrap();
        let registry = sample_registry();
        let mut sequence = ExecutionSequence::new();
        sequence.add(Rc::clone(registry.get(0).unwrap()), None);

        let err = load_progress(&registry, &mut sequence, &path).unwrap_err();
        assert!(matches!(
            err,
            PersistError::UnknownDefinition {
                entry: 1,
                index: 7,
                available: 2
            }
        ));
        assert_eq!(sequence.len(), 1);
    }

    #[test]
    fn test_load_invalid_json_keeps_sequence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();
        let registry = sample_registry();
        let mut sequence = ExecutionSequence::new();
        sequence.add(Rc::clone(registry.get(1).unwrap()), None);

        assert!(load_progress(&registry, &mut sequence, &path).is_err());
        assert_eq!(sequence.len(), 1);
    }

    #[test]
    fn test_loaded_instances_are_independent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let registry = sample_registry();
        let mut sequence = ExecutionSequence::new();
        sequence.add(Rc::clone(registry.get(0).unwrap()), None);
        sequence.copy(0);
        sequence.paste(1);

        save_progress(&registry, &sequence, &path).unwrap();
        load_progress(&registry, &mut sequence, &path).unwrap();
        assert!(!Rc::ptr_eq(
            sequence.get(0).unwrap(),
            sequence.get(1).unwrap()
        ));
    }
}
