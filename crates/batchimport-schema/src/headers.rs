//! # Structural Validation
//!
//! Checks that the set of field names a record source declares is
//! compatible with the identity schema before any value is looked at:
//! every field must be a declared trait, and every required trait must be
//! present.
//!
//! Only set membership matters. Field order carries no meaning, and the
//! schema's `additionalProperties` flag is not consulted.
//!
//! [`validate_headers`] stops at the first violation: unknown fields are
//! checked first, in the order the caller supplies them, then missing
//! required traits in schema declaration order. [`check_headers`] collects
//! every violation for reporting.

use std::collections::HashSet;

use crate::error::SchemaError;
use crate::model::Schema;

/// Fail-fast structural check.
///
/// # Errors
///
/// [`SchemaError::UnknownField`] for the first field that is not a declared
/// trait, otherwise [`SchemaError::MissingRequiredField`] for the first
/// required trait that is absent.
pub fn validate_headers<S: AsRef<str>>(field_names: &[S], schema: &Schema) -> Result<(), SchemaError> {
    let traits = schema.traits();

    if let Some(unknown) = field_names
        .iter()
        .map(AsRef::as_ref)
        .find(|name| !traits.contains_key(*name))
    {
        return Err(SchemaError::UnknownField {
            field: unknown.to_string(),
        });
    }

    let present: HashSet<&str> = field_names.iter().map(AsRef::as_ref).collect();
    if let Some(missing) = schema
        .required()
        .iter()
        .find(|required| !present.contains(required.as_str()))
    {
        return Err(SchemaError::MissingRequiredField {
            field: missing.clone(),
        });
    }

    Ok(())
}

/// Every structural violation found in one record source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderReport {
    /// Fields not declared as traits, in caller order, without duplicates.
    pub unknown: Vec<String>,
    /// Required traits absent from the fields, in declaration order.
    pub missing: Vec<String>,
}

impl HeaderReport {
    pub fn is_ok(&self) -> bool {
        self.unknown.is_empty() && self.missing.is_empty()
    }

    /// Each violation as an error, unknown fields first.
    pub fn errors(&self) -> Vec<SchemaError> {
        self.unknown
            .iter()
            .map(|field| SchemaError::UnknownField {
                field: field.clone(),
            })
            .chain(self.missing.iter().map(|field| SchemaError::MissingRequiredField {
                field: field.clone(),
            }))
            .collect()
    }

    /// The error [`validate_headers`] reports for the same input.
    pub fn into_result(self) -> Result<(), SchemaError> {
        match self.errors().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Collecting structural check.
pub fn check_headers<S: AsRef<str>>(field_names: &[S], schema: &Schema) -> HeaderReport {
    let traits = schema.traits();
    let mut seen = HashSet::new();
    let mut report = HeaderReport::default();

    for name in field_names.iter().map(AsRef::as_ref) {
        if !traits.contains_key(name) && seen.insert(name) {
            report.unknown.push(name.to_string());
        }
    }

    let present: HashSet<&str> = field_names.iter().map(AsRef::as_ref).collect();
    report.missing = schema
        .required()
        .iter()
        .filter(|required| !present.contains(required.as_str()))
        .cloned()
        .collect();

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::from_value(json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": {
                "traits": {
                    "type": "object",
                    "properties": {
                        "email": { "type": "string", "format": "email" },
                        "name": { "type": "string" },
                        "phone": { "type": "string" }
                    },
                    "required": ["email", "name"]
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn all_declared_fields_pass() {
        validate_headers(&["email", "name", "phone"], &schema()).unwrap();
    }

    #[test]
    fn required_only_passes() {
        validate_headers(&["name", "email"], &schema()).unwrap();
    }

    #[test]
    fn unknown_field_is_reported() {
        let err = validate_headers(&["email", "name", "nickname"], &schema()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownField);
        assert_eq!(err.field(), Some("nickname"));
    }

    #[test]
    fn missing_required_field_is_reported() {
        let err = validate_headers(&["email", "phone"], &schema()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredField);
        assert_eq!(err.field(), Some("name"));
    }

    #[test]
    fn unknown_fields_take_precedence_over_missing() {
        let err = validate_headers(&["nickname"], &schema()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownField);
    }

    #[test]
    fn first_unknown_in_caller_order() {
        let err = validate_headers(&["zeta", "email", "alpha"], &schema()).unwrap_err();
        assert_eq!(err.field(), Some("zeta"));
    }

    #[test]
    fn first_missing_in_declaration_order() {
        let err = validate_headers::<&str>(&[], &schema()).unwrap_err();
        assert_eq!(err.field(), Some("email"));
    }

    #[test]
    fn header_names_are_matched_verbatim() {
        let err = validate_headers(&["Email", "name"], &schema()).unwrap_err();
        assert_eq!(err.field(), Some("Email"));
        let err = validate_headers(&[" email", "name"], &schema()).unwrap_err();
        assert_eq!(err.field(), Some(" email"));
    }

    #[test]
    fn additional_properties_flag_is_not_consulted() {
        let mut strict = schema();
        strict.properties.traits.additional_properties = false;
        validate_headers(&["email", "name"], &strict).unwrap();
        let err = validate_headers(&["email", "name", "extra"], &strict).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownField);
    }

    #[test]
    fn report_collects_every_violation() {
        let report = check_headers(&["nickname", "phone", "nickname", "age"], &schema());
        assert!(!report.is_ok());
        assert_eq!(report.unknown, ["nickname", "age"]);
        assert_eq!(report.missing, ["email", "name"]);
        assert_eq!(report.errors().len(), 4);
    }

    #[test]
    fn report_first_error_matches_fail_fast() {
        let fields = ["phone", "age"];
        let fail_fast = validate_headers(&fields, &schema()).unwrap_err();
        let collected = check_headers(&fields, &schema()).into_result().unwrap_err();
        assert_eq!(fail_fast.to_string(), collected.to_string());
    }

    #[test]
    fn clean_report_is_ok() {
        let report = check_headers(&["email", "name"], &schema());
        assert!(report.is_ok());
        report.into_result().unwrap();
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{Properties, TraitField, TraitProperties};
    use proptest::prelude::*;
    use serde_json::Map;
    use std::collections::{BTreeMap, BTreeSet};

    fn field() -> TraitField {
        TraitField {
            field_type: None,
            format: None,
            title: None,
            max_length: None,
            properties: BTreeMap::new(),
            credentials: None,
            extra: Map::new(),
        }
    }

    fn schema_with(declared: &BTreeSet<String>, required: Vec<String>) -> Schema {
        Schema {
            id: String::new(),
            dialect: String::new(),
            title: String::new(),
            schema_type: "object".into(),
            properties: Properties {
                traits: TraitProperties {
                    traits_type: "object".into(),
                    properties: declared.iter().map(|n| (n.clone(), field())).collect(),
                    required,
                    additional_properties: true,
                },
            },
        }
    }

    /// Declared trait names plus a required subset of them.
    fn declared_and_required() -> impl Strategy<Value = (BTreeSet<String>, Vec<String>)> {
        prop::collection::btree_set("[a-z]{1,8}", 1..8).prop_flat_map(|declared| {
            let names: Vec<String> = declared.iter().cloned().collect();
            let len = names.len();
            (Just(declared), prop::sample::subsequence(names, 0..=len))
        })
    }

    proptest! {
        /// The full declared set always passes.
        #[test]
        fn declared_set_passes((declared, required) in declared_and_required()) {
            let schema = schema_with(&declared, required);
            let fields: Vec<String> = declared.into_iter().collect();
            prop_assert!(validate_headers(&fields, &schema).is_ok());
        }

        /// Dropping a required name always yields MissingRequiredField for a
        /// name that was actually dropped.
        #[test]
        fn dropping_required_fails(
            (declared, required) in declared_and_required(),
            pick in any::<prop::sample::Index>(),
        ) {
            prop_assume!(!required.is_empty());
            let dropped = required[pick.index(required.len())].clone();
            let schema = schema_with(&declared, required.clone());
            let fields: Vec<String> = declared.into_iter().filter(|n| *n != dropped).collect();

            let err = validate_headers(&fields, &schema).unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::MissingRequiredField);
            let missing = err.field().unwrap().to_string();
            prop_assert!(required.contains(&missing));
            prop_assert!(!fields.contains(&missing));
        }

        /// An undeclared name is reported whatever its position.
        #[test]
        fn undeclared_name_is_reported(
            (declared, required) in declared_and_required(),
            position in any::<prop::sample::Index>(),
        ) {
            let schema = schema_with(&declared, required);
            let mut fields: Vec<String> = declared.into_iter().collect();
            let at = position.index(fields.len() + 1);
            fields.insert(at, "UNDECLARED".to_string());

            let err = validate_headers(&fields, &schema).unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::UnknownField);
            prop_assert_eq!(err.field(), Some("UNDECLARED"));
        }

        /// Permuting the field names never changes the outcome.
        #[test]
        fn outcome_is_order_independent(
            (declared, required) in declared_and_required(),
            subset_seed in prop::collection::vec(any::<bool>(), 8),
            extra in prop::option::of("[A-Z]{1,4}"),
        ) {
            let schema = schema_with(&declared, required);
            let mut fields: Vec<String> = declared
                .into_iter()
                .zip(subset_seed.iter().cycle())
                .filter(|(_, keep)| **keep)
                .map(|(n, _)| n)
                .collect();
            fields.extend(extra);

            let forward = validate_headers(&fields, &schema).map_err(|e| e.kind());
            fields.reverse();
            let reversed = validate_headers(&fields, &schema).map_err(|e| e.kind());
            prop_assert_eq!(forward.is_ok(), reversed.is_ok());
            prop_assert_eq!(check_headers(&fields, &schema).is_ok(), forward.is_ok());
        }
    }
}
