use prost_reflect::{
    DynamicMessage, FieldDescriptor, MessageDescriptor, OneofDescriptor, ReflectMessage, Value,
};

/// A message instance under validation.
///
/// Wraps the live `DynamicMessage` and normalizes field access into
/// [`FieldValue`] views. Wrappers are created per validation call and
/// discarded with it; all reads are pure.
pub(crate) struct MessageValue<'a> {
    message: &'a DynamicMessage,
}

impl<'a> MessageValue<'a> {
    pub fn new(message: &'a DynamicMessage) -> Self {
        Self { message }
    }

    pub fn descriptor(&self) -> MessageDescriptor {
        self.message.descriptor()
    }

    /// The normalized value of a field of this message.
    pub fn value_of(&self, field: &FieldDescriptor) -> FieldValue {
        FieldValue::new(field.clone(), self.message.get_field(field).into_owned())
    }

    /// The normalized value of a field looked up by name.
    pub fn value_of_name(&self, name: &str) -> Option<FieldValue> {
        self.descriptor()
            .get_field_by_name(name)
            .map(|field| self.value_of(&field))
    }

    /// The value of the populated member of a `oneof`, or `None` when no
    /// member is populated.
    pub fn value_of_oneof(&self, oneof: &OneofDescriptor) -> Option<FieldValue> {
        oneof
            .fields()
            .find(|field| self.message.has_field(field))
            .map(|field| self.value_of(&field))
    }
}

/// The normalized, immutable list of raw values for one field: one value for
/// a singular field, N for a repeated field, and the N values (keys dropped)
/// for a map field.
#[derive(Debug, Clone)]
pub(crate) struct FieldValue {
    field: FieldDescriptor,
    values: Vec<Value>,
}

impl FieldValue {
    pub fn new(field: FieldDescriptor, raw: Value) -> Self {
        let values = match raw {
            Value::Map(map) => map.into_values().collect(),
            Value::List(list) => list,
            other => vec![other],
        };
        Self { field, values }
    }

    pub fn field(&self) -> &FieldDescriptor {
        &self.field
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// A field value is default iff it is empty or all of its values are
    /// default.
    pub fn is_default(&self) -> bool {
        self.values.iter().all(is_default_value)
    }
}

/// Whether a raw value equals its type's zero/empty/default instance.
///
/// Message values compare against the type's default instance; enum values
/// are default iff their number is zero; strings and byte sequences iff
/// empty; collections iff empty or all-default.
pub(crate) fn is_default_value(value: &Value) -> bool {
    match value {
        Value::Bool(v) => !v,
        Value::I32(v) => *v == 0,
        Value::I64(v) => *v == 0,
        Value::U32(v) => *v == 0,
        Value::U64(v) => *v == 0,
        Value::F32(v) => *v == 0.0,
        Value::F64(v) => *v == 0.0,
        Value::String(v) => v.is_empty(),
        Value::Bytes(v) => v.is_empty(),
        Value::EnumNumber(v) => *v == 0,
        Value::Message(v) => *v == DynamicMessage::new(v.descriptor()),
        Value::List(values) => values.iter().all(is_default_value),
        Value::Map(values) => values.values().all(is_default_value),
    }
}
