//! Per-field analyzer map (C2): routes each indexed field to either the
//! identifier tokenizer (C1) or a keyword (exact-match) analyzer.
//!
//! The host crate resolves this kind of thing with a runtime `name -> fn`
//! map (see `definitions/types.rs`'s `DefinitionKind::from_str`). Per the
//! design notes, this is reimplemented as a closed sum type with a static
//! lookup table instead, so field-kind resolution is a match expression
//! rather than a hash lookup, and the compiler catches an unhandled field
//! kind rather than a runtime default swallowing it.

/// The three kinds of field the index ever stores. `Integer` fields are not
/// in spec.md's own two analyzer classes (Keyword/Identifier) — they're
/// needed for `searchByIntRange` over the complexity fields in §4.3/§4.4,
/// so they get their own kind rather than being shoehorned into Keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Keyword,
    Identifier,
    Integer,
}

/// Resolves a field name to its `FieldKind`. Both write-time (document
/// building) and read-time (`searchByField`) call this same function, so the
/// two directions can never disagree about a field's analyzer.
pub fn field_kind(field: &str) -> FieldKind {
    match field {
        "id"
        | "memberType"
        | "memberTypeFacet"
        | "name"
        | "fullName"
        | "assembly"
        | "namespace"
        | "crossref"
        | "exceptionType"
        | "attribute"
        | "packageId"
        | "packageVersion"
        | "targetFramework"
        | "contentHash"
        | "sourceFilePath"
        | "documentType"
        | "isFromNuGetCache"
        // Derived/internal keyword fields implied by §4.3 but not named in
        // the §4.2 enumeration (normalised copies and typed crossrefs are
        // described as exact-match, i.e. keyword, throughout §4.3).
        | "declaringType"
        | "nameNormalized"
        | "fullNameNormalized"
        | "namespaceNormalized"
        | "packageIdNormalized"
        | "isStatic"
        | "isAsync"
        | "isExtension"
        | "crossref_see"
        | "crossref_seealso"
        | "crossref_param"
        | "crossref_return"
        | "crossref_exception"
        | "crossref_inheritance"
        | "crossref_parameter"
        | "crossref_returntype"
        | "crossref_genericconstraint" => FieldKind::Keyword,

        "parameterCount" | "cyclomaticComplexity" | "documentationLineCount" => FieldKind::Integer,

        // Everything else is routed to the identifier analyzer: nameText,
        // fullNameText, namespaceText, typeSearch, methodSearch,
        // propertySearch, fieldSearch, eventSearch, summary, remarks,
        // returns, seeAlso, content, relatedType, codeExample,
        // codeExampleDescription, exceptionTypeText, exceptionSimpleName,
        // exceptionCondition, parameter, parameterDescription, versionSearch.
        _ => FieldKind::Identifier,
    }
}

/// The field name for the one kind-specific search field a document carries
/// (§4.3: "One kind-specific search field").
pub fn kind_specific_search_field(kind: crate::model::MemberKind) -> &'static str {
    use crate::model::MemberKind::*;
    match kind {
        Type => "typeSearch",
        Method => "methodSearch",
        Property => "propertySearch",
        Field => "fieldSearch",
        Event => "eventSearch",
    }
}

/// The typed crossref field name for a given `XRefKind` (§4.3: "one typed
/// `crossref_<kind>` entry").
pub fn crossref_field(kind: crate::model::XRefKind) -> String {
    format!("crossref_{}", kind.as_str().to_lowercase())
}

#[cfg(test)]
mod analyzer_tests {
    use super::*;
    use crate::model::{MemberKind, XRefKind};

    #[test]
    fn keyword_fields_match_spec_enumeration() {
        for f in [
            "id",
            "memberType",
            "memberTypeFacet",
            "name",
            "fullName",
            "assembly",
            "namespace",
            "crossref",
            "exceptionType",
            "attribute",
            "packageId",
            "packageVersion",
            "targetFramework",
            "contentHash",
            "sourceFilePath",
            "documentType",
            "isFromNuGetCache",
        ] {
            assert_eq!(field_kind(f), FieldKind::Keyword, "field {f} should be Keyword");
        }
    }

    #[test]
    fn identifier_fields_match_spec_enumeration() {
        for f in [
            "nameText",
            "fullNameText",
            "namespaceText",
            "typeSearch",
            "methodSearch",
            "propertySearch",
            "fieldSearch",
            "eventSearch",
            "summary",
            "remarks",
            "returns",
            "seeAlso",
            "content",
            "relatedType",
            "codeExample",
            "codeExampleDescription",
            "exceptionTypeText",
            "exceptionSimpleName",
            "exceptionCondition",
            "parameter",
            "parameterDescription",
            "versionSearch",
        ] {
            assert_eq!(
                field_kind(f),
                FieldKind::Identifier,
                "field {f} should be Identifier"
            );
        }
    }

    #[test]
    fn integer_fields_are_distinct_from_keyword() {
        for f in ["parameterCount", "cyclomaticComplexity", "documentationLineCount"] {
            assert_eq!(field_kind(f), FieldKind::Integer);
        }
    }

    #[test]
    fn kind_specific_field_names() {
        assert_eq!(kind_specific_search_field(MemberKind::Type), "typeSearch");
        assert_eq!(kind_specific_search_field(MemberKind::Method), "methodSearch");
        assert_eq!(kind_specific_search_field(MemberKind::Event), "eventSearch");
    }

    #[test]
    fn crossref_field_names_are_lowercase() {
        assert_eq!(crossref_field(XRefKind::SeeAlso), "crossref_seealso");
        assert_eq!(crossref_field(XRefKind::GenericConstraint), "crossref_genericconstraint");
    }
}
