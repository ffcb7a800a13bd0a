//! Post-processing of parsed field trees before they are stored on an entry.

use crate::field::{DataType, FieldMap};
use crate::type_ref::short_name;

/// Stamps the children of every field that has a `class` with that class and their own
/// name. A child's `parent_class` that is already set is kept.
pub fn stamp_parents(fields: &mut FieldMap) {
    for field in fields.values_mut() {
        let class = field.class.clone();
        let Some(children) = field.children.as_mut() else {
            continue;
        };
        if let Some(class) = class {
            for (name, child) in children.iter_mut() {
                if child.parent_class.is_none() {
                    child.parent_class = Some(class.clone());
                }
                child.field = Some(name.clone());
            }
        }
        stamp_parents(children);
    }
}

/// Removes the `class` bookkeeping key from the whole tree.
pub fn clear_classes(fields: &mut FieldMap) {
    for field in fields.values_mut() {
        field.class = None;
        if let Some(children) = field.children.as_mut() {
            clear_classes(children);
        }
    }
}

/// Fills in `data_type` for fields that only carry a `sub_type`.
/// `is_known` tells whether a type identifier resolves to a known type.
pub fn humanize(fields: &mut FieldMap, is_known: &dyn Fn(&str) -> bool) {
    for field in fields.values_mut() {
        if field.data_type.as_deref().unwrap_or("").is_empty() {
            if let Some(sub_type) = &field.sub_type {
                field.data_type = Some(readable_type(field.actual_type, sub_type, is_known));
            }
        }
        if let Some(children) = field.children.as_mut() {
            humanize(children, is_known);
        }
    }
}

fn readable_type(actual_type: Option<DataType>, sub_type: &str, is_known: &dyn Fn(&str) -> bool) -> String {
    let display = |sub_type: &str| {
        if is_known(sub_type) {
            short_name(sub_type).to_string()
        } else {
            sub_type.to_string()
        }
    };

    match actual_type {
        Some(DataType::Model) => format!("object ({})", display(sub_type)),
        Some(DataType::Collection) if DataType::is_primitive(sub_type) => format!("array of {}s", sub_type),
        Some(DataType::Collection) => format!("array of objects ({})", display(sub_type)),
        Some(other) => other.as_str().to_string(),
        None => String::new(),
    }
}

/// Partial updates make every top-level field optional.
pub fn relax_required(fields: &mut FieldMap) {
    for field in fields.values_mut() {
        field.required = Some(false);
    }
}
