//! Block instances and the execution sequence they are assembled into.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::{debug, info};

use crate::registry::BlockDefinition;

/// A placed usage of a definition with its current parameter values.
#[derive(Debug)]
pub struct BlockInstance {
    pub definition: Rc<BlockDefinition>,
    pub values: BTreeMap<String, String>,
}

/// Instances are shared by reference: paste inserts the same instance again.
pub type SharedInstance = Rc<RefCell<BlockInstance>>;

impl BlockInstance {
    /// New instance with an empty value for every declared parameter.
    pub fn new(definition: Rc<BlockDefinition>) -> Self {
        let values = definition
            .params
            .iter()
            .map(|p| (p.clone(), String::new()))
            .collect();
        Self { definition, values }
    }

    pub fn with_values(definition: Rc<BlockDefinition>, values: BTreeMap<String, String>) -> Self {
        Self { definition, values }
    }

    pub fn shared(self) -> SharedInstance {
        Rc::new(RefCell::new(self))
    }

    /// Current value of `param`, empty when unset.
    pub fn value(&self, param: &str) -> &str {
        self.values.get(param).map(String::as_str).unwrap_or("")
    }
}

/// Ordered list of instances plus the single-slot clipboard.
#[derive(Debug, Default)]
pub struct ExecutionSequence {
    instances: Vec<SharedInstance>,
    clipboard: Option<SharedInstance>,
}

impl ExecutionSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a fresh instance of `definition`.
    ///
    /// Appends when `position` is `None`; otherwise inserts at `position`,
    /// clamped to the end of the list.
    pub fn add(&mut self, definition: Rc<BlockDefinition>, position: Option<usize>) -> usize {
        let name = definition.name.clone();
        let instance = BlockInstance::new(definition).shared();
        let index = self.insert_at(instance, position);
        info!(name = %name, index, "instance_added");
        index
    }

    fn insert_at(&mut self, instance: SharedInstance, position: Option<usize>) -> usize {
        match position {
            Some(p) => {
                let index = p.min(self.instances.len());
                self.instances.insert(index, instance);
                index
            }
            None => {
                self.instances.push(instance);
                self.instances.len() - 1
            }
        }
    }

    pub fn delete(&mut self, index: usize) -> Option<SharedInstance> {
        if index >= self.instances.len() {
            return None;
        }
        let removed = self.instances.remove(index);
        info!(index, "instance_deleted");
        Some(removed)
    }

    /// Put the instance at `index` on the clipboard without removing it.
    pub fn copy(&mut self, index: usize) -> bool {
        match self.instances.get(index) {
            Some(instance) => {
                self.clipboard = Some(Rc::clone(instance));
                debug!(index, "instance_copied");
                true
            }
            None => false,
        }
    }

    /// Remove the instance at `index` and put it on the clipboard.
    pub fn cut(&mut self, index: usize) -> bool {
        if index >= self.instances.len() {
            return false;
        }
        self.clipboard = Some(self.instances.remove(index));
        debug!(index, "instance_cut");
        true
    }

    /// Insert the clipboard instance itself (not a clone) at `index`.
    ///
    /// Returns the position used, or `None` when the clipboard is empty.
    pub fn paste(&mut self, index: usize) -> Option<usize> {
        let instance = Rc::clone(self.clipboard.as_ref()?);
        let index = self.insert_at(instance, Some(index));
        debug!(index, "instance_pasted");
        Some(index)
    }

    pub fn has_clipboard(&self) -> bool {
        self.clipboard.is_some()
    }

    /// Update one parameter value of the instance at `index`.
    pub fn set_value(&self, index: usize, param: &str, value: impl Into<String>) -> bool {
        match self.instances.get(index) {
            Some(instance) => {
                instance
                    .borrow_mut()
                    .values
                    .insert(param.to_string(), value.into());
                true
            }
            None => false,
        }
    }

    pub fn get(&self, index: usize) -> Option<&SharedInstance> {
        self.instances.get(index)
    }

    /// Replace the whole list (used by load). The clipboard is kept.
    pub fn replace_all(&mut self, instances: Vec<SharedInstance>) {
        self.instances = instances;
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedInstance> {
        self.instances.iter()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
