use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use prost_reflect::{DescriptorPool, FieldDescriptor, MessageDescriptor};

use valopt_types::MessageOptionsExt;

use crate::error::SchemaError;
use crate::validator::lookups;

/// A message type whose field declarations carry validation options for the
/// message type of another type's field.
///
/// Declared in the schema as
/// `option (valopt.constraint_for) = "pkg.Type.field";` on the constraint
/// message. The constraint message's fields must mirror (a subset of) the
/// target field's message type.
#[derive(Clone)]
pub(crate) struct ExternalConstraint {
    target_field: String,
    constraint_type: MessageDescriptor,
}

impl ExternalConstraint {
    /// Fully qualified name of the constrained field, `pkg.Type.field`.
    pub fn target_field(&self) -> &str {
        &self.target_field
    }

    /// The message type declaring the constraining options.
    pub fn constraint_type(&self) -> &MessageDescriptor {
        &self.constraint_type
    }
}

type ExternalIndex = HashMap<String, Vec<ExternalConstraint>>;

/// Process-wide index of external constraints, keyed by the target field's
/// fully qualified name.
///
/// Updates are copy-on-write: a new merged map is built under the write lock
/// and published atomically, so in-flight validations keep reading a
/// consistent snapshot.
pub(crate) struct ExternalConstraintRegistry {
    index: RwLock<Arc<ExternalIndex>>,
}

impl ExternalConstraintRegistry {
    pub fn new() -> Self {
        Self {
            index: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Scan a descriptor pool for constraint messages, verify each against
    /// its target, and merge them into the index.
    ///
    /// # Errors
    ///
    /// Fails fast with a descriptive [`SchemaError`] when a target cannot be
    /// resolved or a constraint message does not structurally match it; the
    /// index is left unchanged in that case.
    pub fn load(&self, pool: &DescriptorPool) -> Result<(), SchemaError> {
        let additions = scan_pool(pool)?;
        if additions.is_empty() {
            return Ok(());
        }

        let mut guard = self
            .index
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut merged: ExternalIndex = (**guard).clone();
        for addition in additions {
            merged
                .entry(addition.target_field.clone())
                .or_default()
                .push(addition);
        }
        *guard = Arc::new(merged);
        Ok(())
    }

    /// The current published snapshot.
    pub fn snapshot(&self) -> Arc<ExternalIndex> {
        Arc::clone(
            &self
                .index
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        )
    }
}

fn scan_pool(pool: &DescriptorPool) -> Result<Vec<ExternalConstraint>, SchemaError> {
    let mut found = Vec::new();
    for message in pool.all_messages() {
        let Some(targets) = message.constraint_for_option() else {
            continue;
        };
        for target in targets.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            found.push(checked_constraint(pool, &message, target)?);
        }
    }
    Ok(found)
}

/// Resolve a `pkg.Type.field` target and verify the constraint message
/// structurally matches the target field's message type.
fn checked_constraint(
    pool: &DescriptorPool,
    constraint_type: &MessageDescriptor,
    target: &str,
) -> Result<ExternalConstraint, SchemaError> {
    let of_message = |detail: String| SchemaError {
        cause: format!(
            "invalid (constraint_for) target `{target}` on `{}`: {detail}",
            constraint_type.full_name()
        ),
    };

    let Some((type_name, field_name)) = target.rsplit_once('.') else {
        return Err(of_message(
            "expected a fully qualified field name".to_string(),
        ));
    };
    let target_type = pool
        .get_message_by_name(type_name)
        .ok_or_else(|| of_message(format!("unknown message type `{type_name}`")))?;
    let target_field = target_type
        .get_field_by_name(field_name)
        .ok_or_else(|| of_message(format!("`{type_name}` has no field `{field_name}`")))?;
    let constrained_type = lookups::validated_message_kind(&target_field)
        .ok_or_else(|| of_message("the target field is not message-typed".to_string()))?;

    for declared in constraint_type.fields() {
        let counterpart = constrained_type
            .get_field_by_name(declared.name())
            .ok_or_else(|| {
                of_message(format!(
                    "`{}` declares `{}` but `{}` has no such field",
                    constraint_type.full_name(),
                    declared.name(),
                    constrained_type.full_name()
                ))
            })?;
        check_field_shape(&declared, &counterpart).map_err(of_message)?;
    }

    Ok(ExternalConstraint {
        target_field: target_field.full_name().to_string(),
        constraint_type: constraint_type.clone(),
    })
}

/// Verify two fields share cardinality and kind.
fn check_field_shape(declared: &FieldDescriptor, counterpart: &FieldDescriptor) -> Result<(), String> {
    let mismatch = |what: &str| {
        Err(format!(
            "field `{}` is declared as {what} `{}` but the target field is {what} `{}`",
            declared.name(),
            describe(declared),
            describe(counterpart)
        ))
    };

    if declared.is_list() != counterpart.is_list() || declared.is_map() != counterpart.is_map() {
        return mismatch("cardinality");
    }
    let declared_kind = declared.kind();
    let counterpart_kind = counterpart.kind();
    if lookups::kind_label(&declared_kind) != lookups::kind_label(&counterpart_kind) {
        return mismatch("kind");
    }
    // Message- and enum-typed fields must also agree on the exact type.
    let declared_type = nested_type_name(&declared_kind);
    let counterpart_type = nested_type_name(&counterpart_kind);
    if declared_type != counterpart_type {
        return mismatch("kind");
    }
    Ok(())
}

fn nested_type_name(kind: &prost_reflect::Kind) -> Option<String> {
    match kind {
        prost_reflect::Kind::Message(m) => Some(m.full_name().to_string()),
        prost_reflect::Kind::Enum(e) => Some(e.full_name().to_string()),
        _ => None,
    }
}

fn describe(field: &FieldDescriptor) -> String {
    let label = lookups::kind_label(&field.kind());
    if field.is_map() {
        format!("map of {label}")
    } else if field.is_list() {
        format!("repeated {label}")
    } else {
        label.to_string()
    }
}
