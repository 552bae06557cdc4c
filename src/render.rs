//! Preview rendering: placeholder substitution and concatenation.

use crate::registry::BlockDefinition;
use crate::sequence::{BlockInstance, ExecutionSequence};

/// Separator appended after every rendered block.
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// Substitute an instance's values into its definition's template.
///
/// Every literal `{param}` for each entry in the value mapping is replaced.
/// Declared parameters are applied in declaration order, then any extra
/// entries (e.g. from a loaded progress file) in key order. Placeholders with
/// no entry are left as written.
pub fn render_instance(instance: &BlockInstance) -> String {
    let definition = &instance.definition;
    let mut code = definition.template.clone();

    let declared = definition
        .params
        .iter()
        .filter_map(|p| instance.values.get_key_value(p));
    let extra = instance
        .values
        .iter()
        .filter(|(k, _)| !definition.params.contains(k));

    for (param, value) in declared.chain(extra) {
        code = code.replace(&BlockDefinition::placeholder(param), value);
    }
    code
}

/// Render the whole sequence in order, each block followed by a blank line.
pub fn render_sequence(sequence: &ExecutionSequence) -> String {
    let mut out = String::new();
    for instance in sequence.iter() {
        out.push_str(&render_instance(&instance.borrow()));
        out.push_str(BLOCK_SEPARATOR);
    }
    out
}
