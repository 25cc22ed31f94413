use prost_reflect::{FieldDescriptor, Kind};

/// Short label for a field kind, used in schema error messages.
pub(crate) fn kind_label(kind: &Kind) -> &'static str {
    match kind {
        Kind::Float => "float",
        Kind::Double => "double",
        Kind::Int32 => "int32",
        Kind::Int64 => "int64",
        Kind::Uint32 => "uint32",
        Kind::Uint64 => "uint64",
        Kind::Sint32 => "sint32",
        Kind::Sint64 => "sint64",
        Kind::Fixed32 => "fixed32",
        Kind::Fixed64 => "fixed64",
        Kind::Sfixed32 => "sfixed32",
        Kind::Sfixed64 => "sfixed64",
        Kind::Bool => "bool",
        Kind::String => "string",
        Kind::Bytes => "bytes",
        Kind::Enum(_) => "enum",
        Kind::Message(_) => "message",
    }
}

/// Whether values of this kind participate in numeric comparisons.
pub(crate) fn is_numeric(kind: &Kind) -> bool {
    is_integer(kind) || is_float(kind)
}

pub(crate) fn is_integer(kind: &Kind) -> bool {
    matches!(
        kind,
        Kind::Int32
            | Kind::Int64
            | Kind::Uint32
            | Kind::Uint64
            | Kind::Sint32
            | Kind::Sint64
            | Kind::Fixed32
            | Kind::Fixed64
            | Kind::Sfixed32
            | Kind::Sfixed64
    )
}

pub(crate) fn is_float(kind: &Kind) -> bool {
    matches!(kind, Kind::Float | Kind::Double)
}

/// The message type validated when recursing into this field: the field's own
/// type for singular and repeated message fields, the entry value type for
/// maps of messages.
pub(crate) fn validated_message_kind(
    field: &FieldDescriptor,
) -> Option<prost_reflect::MessageDescriptor> {
    if field.is_map() {
        let entry = field.kind().as_message()?.clone();
        return entry.get_field_by_name("value")?.kind().as_message().cloned();
    }
    field.kind().as_message().cloned()
}
