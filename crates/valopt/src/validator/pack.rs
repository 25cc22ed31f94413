use prost::Message;
use prost::encoding;
use prost_reflect::{ReflectMessage, Value};
use prost_types::Any;

const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

/// Pack an offending value into `google.protobuf.Any` for echoing in a
/// violation record.
///
/// Scalars travel through the matching well-known wrapper type (field 1 of
/// e.g. `google.protobuf.Int32Value`), message values as themselves. Lists
/// and maps are not echoed; their violations reference the duplicate or
/// offending element instead.
pub(crate) fn pack_value(value: &Value) -> Option<Any> {
    if let Value::Message(message) = value {
        return Some(Any {
            type_url: format!("{TYPE_URL_PREFIX}{}", message.descriptor().full_name()),
            value: message.encode_to_vec(),
        });
    }

    let mut payload = Vec::new();
    let wrapper = match value {
        Value::Bool(v) => {
            encoding::bool::encode(1, v, &mut payload);
            "BoolValue"
        }
        Value::I32(v) => {
            encoding::int32::encode(1, v, &mut payload);
            "Int32Value"
        }
        Value::I64(v) => {
            encoding::int64::encode(1, v, &mut payload);
            "Int64Value"
        }
        Value::U32(v) => {
            encoding::uint32::encode(1, v, &mut payload);
            "UInt32Value"
        }
        Value::U64(v) => {
            encoding::uint64::encode(1, v, &mut payload);
            "UInt64Value"
        }
        Value::F32(v) => {
            encoding::float::encode(1, v, &mut payload);
            "FloatValue"
        }
        Value::F64(v) => {
            encoding::double::encode(1, v, &mut payload);
            "DoubleValue"
        }
        Value::String(v) => {
            encoding::string::encode(1, v, &mut payload);
            "StringValue"
        }
        Value::Bytes(v) => {
            encoding::bytes::encode(1, v, &mut payload);
            "BytesValue"
        }
        // Enum numbers travel as their wire representation.
        Value::EnumNumber(v) => {
            encoding::int32::encode(1, v, &mut payload);
            "Int32Value"
        }
        Value::Message(_) | Value::List(_) | Value::Map(_) => return None,
    };

    Some(Any {
        type_url: format!("{TYPE_URL_PREFIX}google.protobuf.{wrapper}"),
        value: payload,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use prost_reflect::{DynamicMessage, Value};

    use super::pack_value;
    use crate::validator::testing::sandbox_message;

    #[test]
    fn scalars_pack_into_wrapper_types() {
        let packed = pack_value(&Value::I32(5)).expect("int32 values are packable");
        assert_eq!(packed.type_url, "type.googleapis.com/google.protobuf.Int32Value");
        // Field 1 varint: tag 0x08, value 5.
        assert_eq!(packed.value, vec![0x08, 0x05]);

        let packed = pack_value(&Value::String("ab".to_string())).unwrap();
        assert_eq!(packed.type_url, "type.googleapis.com/google.protobuf.StringValue");
        assert_eq!(packed.value, vec![0x0a, 0x02, b'a', b'b']);
    }

    #[test]
    fn messages_pack_as_their_own_type() {
        let message = DynamicMessage::new(sandbox_message("valopt.sandbox.Passport"));
        let packed = pack_value(&Value::Message(message)).unwrap();
        assert_eq!(packed.type_url, "type.googleapis.com/valopt.sandbox.Passport");
        assert!(packed.value.is_empty());
    }

    #[test]
    fn collections_are_not_echoed() {
        assert!(pack_value(&Value::List(vec![Value::I32(1)])).is_none());
    }
}
