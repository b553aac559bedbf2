//! Universal envelope fields, per wire version.

use serde_json::json;

use super::rules::{Rule, Schema};
use crate::config::{
    CORE_TYPE_GROUP, CURRENT_VERSION, LEGACY_VERSION, MAX_VENDOR_FIELD_LENGTH, SIGNATURE_LENGTH,
};

/// The schema every transaction of `version` must satisfy before its own
/// type fragment is applied. `None` for versions this library cannot read.
pub fn base_schema(version: u8) -> Option<Schema> {
    let common = Schema::new()
        .required(
            "type",
            Rule::Integer {
                min: 0,
                max: u64::from(u16::MAX),
            },
        )
        .required("amount", Rule::amount())
        .required("fee", Rule::amount())
        .required("senderPublicKey", Rule::PublicKey)
        .optional("id", Rule::HexBytes(32))
        .optional("recipientId", Rule::Address)
        .optional(
            "vendorField",
            Rule::Text {
                min_len: 1,
                max_len: MAX_VENDOR_FIELD_LENGTH,
            },
        )
        .optional("signature", Rule::HexBytes(SIGNATURE_LENGTH));

    match version {
        CURRENT_VERSION => Some(
            common
                .required("version", Rule::Const(json!(CURRENT_VERSION)))
                .required(
                    "typeGroup",
                    Rule::Integer {
                        min: 1,
                        max: u64::from(u32::MAX),
                    },
                )
                .required("nonce", Rule::amount())
                .optional("timestamp", Rule::Absent),
        ),
        LEGACY_VERSION => Some(
            common
                .optional("version", Rule::Const(json!(LEGACY_VERSION)))
                .optional("typeGroup", Rule::Const(json!(CORE_TYPE_GROUP)))
                .required(
                    "timestamp",
                    Rule::Integer {
                        min: 0,
                        max: u64::from(u32::MAX),
                    },
                )
                .optional("nonce", Rule::Absent),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_versions_have_no_schema() {
        assert!(base_schema(0).is_none());
        assert!(base_schema(3).is_none());
    }

    #[test]
    fn v2_requires_nonce_and_type_group() {
        let schema = base_schema(CURRENT_VERSION).unwrap();
        assert!(schema.is_required("nonce"));
        assert!(schema.is_required("typeGroup"));
        assert!(!schema.is_required("timestamp"));
    }

    #[test]
    fn v1_requires_timestamp_and_pins_core_group() {
        let schema = base_schema(LEGACY_VERSION).unwrap();
        assert!(schema.is_required("timestamp"));
        assert!(!schema.is_required("nonce"));
        let v = schema.validate(&json!({
            "type": 0,
            "typeGroup": 2,
            "timestamp": 10,
            "amount": "1",
            "fee": "1",
        }));
        assert!(v.iter().any(|v| v.field == "typeGroup" && v.rule == "const"));
        assert!(v.iter().any(|v| v.field == "senderPublicKey" && v.rule == "required"));
    }

    #[test]
    fn each_layout_forbids_the_other_layouts_counter() {
        let v2 = base_schema(CURRENT_VERSION).unwrap();
        let v = v2.validate(&json!({ "timestamp": 42 }));
        assert!(v.iter().any(|v| v.field == "timestamp" && v.rule == "absent"));

        let v1 = base_schema(LEGACY_VERSION).unwrap();
        let v = v1.validate(&json!({ "nonce": "1" }));
        assert!(v.iter().any(|v| v.field == "nonce" && v.rule == "absent"));
    }

    #[test]
    fn empty_vendor_field_is_not_a_memo() {
        let schema = base_schema(CURRENT_VERSION).unwrap();
        let v = schema.validate(&json!({ "vendorField": "" }));
        assert!(v.iter().any(|v| v.field == "vendorField" && v.rule == "minLength"));
        let v = schema.validate(&json!({ "vendorField": "x" }));
        assert!(!v.iter().any(|v| v.field == "vendorField"));
    }

    #[test]
    fn v2_rejects_oversized_type() {
        let schema = base_schema(CURRENT_VERSION).unwrap();
        let v = schema.validate(&json!({ "type": 70_000 }));
        assert!(v.iter().any(|v| v.field == "type" && v.rule == "maximum"));
    }
}
