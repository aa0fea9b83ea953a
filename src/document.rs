//! Document builder (C3): projects a `MemberRecord` into an index document.
//!
//! A `Document` here plays the role the host crate's `ContentIndex`/
//! `DefinitionIndex` entries play for source files: a flat, serialisable
//! record of everything the index needs to answer queries, built once and
//! handed to the writer. Three maps cover the three things a field can be:
//! an indexed (searchable) value, a stored (retrievable) value, and a
//! numeric value usable for range queries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::analyzer::{crossref_field, field_kind, kind_specific_search_field, FieldKind};
use crate::model::MemberRecord;
use crate::tokenizer::tokenize_text;

/// One index document. `terms` holds what a query matches against (exact
/// keyword values or identifier-analyzed tokens); `stored` holds values
/// retrievable verbatim via `getById`; `ints` holds the three numeric
/// complexity fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub terms: HashMap<String, Vec<String>>,
    pub stored: HashMap<String, Vec<String>>,
    pub ints: HashMap<String, i64>,
}

impl Document {
    fn new(id: impl Into<String>) -> Self {
        Document {
            id: id.into(),
            terms: HashMap::new(),
            stored: HashMap::new(),
            ints: HashMap::new(),
        }
    }

    /// Adds an exact-match keyword value, storing it unmodified for both
    /// search and retrieval.
    fn push_keyword(&mut self, field: &str, value: impl Into<String>) {
        debug_assert_eq!(field_kind(field), FieldKind::Keyword);
        let value = value.into();
        self.terms.entry(field.to_string()).or_default().push(value.clone());
        self.stored.entry(field.to_string()).or_default().push(value);
    }

    /// Adds a keyword value for search only — not retrievable. Used for
    /// normalised copies and the content hash (§4.3: "indexed as keyword but
    /// not stored").
    fn push_keyword_unstored(&mut self, field: &str, value: impl Into<String>) {
        debug_assert_eq!(field_kind(field), FieldKind::Keyword);
        self.terms.entry(field.to_string()).or_default().push(value.into());
    }

    /// Tokenizes `value` through the identifier analyzer and indexes the
    /// tokens. When `stored` is true, the sanitised original value is also
    /// kept for retrieval (documentation fields and `content` are stored;
    /// the analysed-only mirror fields like `nameText` are not).
    fn push_identifier(&mut self, field: &str, value: &str, stored: bool) {
        debug_assert_eq!(field_kind(field), FieldKind::Identifier);
        if value.is_empty() {
            return;
        }
        let tokens = tokenize_text(value);
        self.terms.entry(field.to_string()).or_default().extend(tokens);
        if stored {
            self.stored
                .entry(field.to_string())
                .or_default()
                .push(value.to_string());
        }
    }

    fn push_int(&mut self, field: &str, value: i64) {
        debug_assert_eq!(field_kind(field), FieldKind::Integer);
        self.ints.insert(field.to_string(), value);
    }
}

/// Replaces `\n`, `\r`, `\t`, `\u{08}` (backspace), `\u{0C}` (form feed) with
/// single spaces, per §4.3's sanitisation rule for documentation text.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' | '\u{08}' | '\u{0C}' => ' ',
            other => other,
        })
        .collect()
}

fn bool_keyword(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// Builds an index document from a `MemberRecord`. Rust's `&MemberRecord`
/// can never be null, so the "rejects a null record" error case in §4.3 has
/// no analogue here — the builder is infallible.
pub fn build_document(record: &MemberRecord) -> Document {
    let mut doc = Document::new(record.id.clone());

    doc.push_keyword("id", record.id.clone());
    doc.push_keyword("memberType", record.kind.as_str());
    doc.push_keyword("memberTypeFacet", record.kind.as_str());
    doc.push_keyword("name", record.name.clone());
    doc.push_keyword("fullName", record.full_name.clone());
    doc.push_keyword("assembly", record.assembly.clone());
    doc.push_keyword("namespace", record.namespace.clone());
    if let Some(declaring_type) = record.declaring_type() {
        doc.push_keyword("declaringType", declaring_type);
    }

    doc.push_identifier("nameText", &record.name, false);
    doc.push_identifier("fullNameText", &record.full_name, false);
    doc.push_identifier("namespaceText", &record.namespace, false);

    doc.push_keyword_unstored("nameNormalized", record.name.to_lowercase());
    doc.push_keyword_unstored("fullNameNormalized", record.full_name.to_lowercase());
    doc.push_keyword_unstored("namespaceNormalized", record.namespace.to_lowercase());
    if let Some(package_id) = &record.package_id {
        doc.push_keyword_unstored("packageIdNormalized", package_id.to_lowercase());
    }

    let search_field = kind_specific_search_field(record.kind);
    doc.push_identifier(search_field, &record.name, false);

    if let Some(summary) = non_blank(&record.summary) {
        doc.push_identifier("summary", &sanitize(summary), true);
    }
    if let Some(remarks) = non_blank(&record.remarks) {
        doc.push_identifier("remarks", &sanitize(remarks), true);
    }
    if let Some(returns) = non_blank(&record.returns) {
        doc.push_identifier("returns", &sanitize(returns), true);
    }
    if let Some(see_also) = non_blank(&record.see_also) {
        doc.push_identifier("seeAlso", &sanitize(see_also), true);
    }

    for xref in &record.cross_references {
        doc.push_keyword("crossref", xref.target_id.clone());
        doc.push_keyword(&crossref_field(xref.kind), xref.target_id.clone());
        // Analysed mirror of the crossref target so a query for a bare type
        // name (e.g. "Dictionary") finds members related to it even though
        // `crossref` itself only matches the full target id exactly.
        doc.push_identifier("relatedType", &xref.target_id, false);
    }

    for example in &record.code_examples {
        if let Some(description) = non_blank(&example.description) {
            doc.push_identifier("codeExampleDescription", &sanitize(description), true);
        }
        if !example.code.is_empty() {
            doc.push_identifier("codeExample", &sanitize(&example.code), true);
        }
    }

    for exception in &record.exceptions {
        doc.push_keyword("exceptionType", exception.exception_type.clone());
        doc.push_identifier("exceptionTypeText", &exception.exception_type, false);
        let simple_name = exception
            .exception_type
            .rsplit('.')
            .next()
            .unwrap_or(&exception.exception_type);
        doc.push_identifier("exceptionSimpleName", simple_name, false);
        if let Some(condition) = non_blank(&exception.condition) {
            doc.push_identifier("exceptionCondition", &sanitize(condition), true);
        }
    }

    for attribute in &record.attributes {
        doc.push_keyword("attribute", attribute.attribute_type.clone());
    }

    for param in &record.parameters {
        let rendered = format!("{} {}", param.type_name, param.name);
        doc.push_identifier("parameter", &rendered, true);
        if let Some(description) = non_blank(&param.description) {
            doc.push_identifier("parameterDescription", &sanitize(description), true);
        }
    }

    if matches!(record.kind, crate::model::MemberKind::Method) {
        doc.push_keyword("isStatic", bool_keyword(record.modifiers.is_static));
        doc.push_keyword("isAsync", bool_keyword(record.modifiers.is_async));
        doc.push_keyword("isExtension", bool_keyword(record.modifiers.is_extension));
    }

    if let Some(complexity) = &record.complexity {
        doc.push_int("parameterCount", complexity.parameter_count as i64);
        doc.push_int("cyclomaticComplexity", complexity.cyclomatic_complexity as i64);
        doc.push_int("documentationLineCount", complexity.documentation_line_count as i64);
    }

    if let Some(package_id) = non_blank(&record.package_id) {
        doc.push_keyword("packageId", package_id.clone());
    }
    if let Some(package_version) = non_blank(&record.package_version) {
        doc.push_keyword("packageVersion", package_version.clone());
        doc.push_identifier("versionSearch", package_version, true);
    }
    if let Some(framework) = non_blank(&record.target_framework) {
        doc.push_keyword("targetFramework", framework.clone());
    }
    doc.push_keyword("isFromNuGetCache", bool_keyword(record.is_from_cache));
    doc.push_keyword(
        "sourceFilePath",
        record.source_file_path.clone().unwrap_or_default(),
    );

    if let Some(content_hash) = non_blank(&record.content_hash) {
        doc.push_keyword_unstored("contentHash", content_hash.clone());
    }

    let content = assemble_content(record);
    doc.push_identifier("content", &content, true);

    doc
}

fn non_blank(value: &Option<String>) -> Option<&String> {
    value.as_ref().filter(|v| !v.trim().is_empty())
}

/// Builds the `content` field per §4.3's exact ordering: name, fullName,
/// namespace, summary, remarks, every example description then its code,
/// every exception type then its condition, every parameter name/type/
/// description, returns, seeAlso. Blanks are skipped.
fn assemble_content(record: &MemberRecord) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut push = |s: &str| {
        if !s.trim().is_empty() {
            parts.push(sanitize(s));
        }
    };

    push(&record.name);
    push(&record.full_name);
    push(&record.namespace);
    if let Some(s) = &record.summary {
        push(s);
    }
    if let Some(s) = &record.remarks {
        push(s);
    }
    for example in &record.code_examples {
        if let Some(d) = &example.description {
            push(d);
        }
        push(&example.code);
    }
    for exception in &record.exceptions {
        push(&exception.exception_type);
        if let Some(c) = &exception.condition {
            push(c);
        }
    }
    for param in &record.parameters {
        push(&param.name);
        push(&param.type_name);
        if let Some(d) = &param.description {
            push(d);
        }
    }
    if let Some(s) = &record.returns {
        push(s);
    }
    if let Some(s) = &record.see_also {
        push(s);
    }

    parts.join(" ")
}

/// Builds the index document for an `EmptyFileMarker` (§3.1): a keyword-only
/// document used by `getEmptyXmlPaths` (§4.4's `documentType` term query).
pub fn build_empty_marker_document(marker: &crate::model::EmptyFileMarker) -> Document {
    let mut doc = Document::new(marker.id.clone());
    doc.push_keyword("id", marker.id.clone());
    doc.push_keyword("documentType", "EmptyXmlFile");
    doc.push_keyword("sourceFilePath", marker.source_file_path.clone());
    doc
}

#[cfg(test)]
mod document_tests {
    use super::*;
    use crate::model::*;

    fn bare_record(name: &str, full_name: &str) -> MemberRecord {
        MemberRecord {
            id: format!("T:{full_name}"),
            kind: MemberKind::Type,
            name: name.to_string(),
            full_name: full_name.to_string(),
            namespace: "System".to_string(),
            assembly: "mscorlib".to_string(),
            summary: None,
            remarks: None,
            returns: None,
            see_also: None,
            parameters: Vec::new(),
            exceptions: Vec::new(),
            code_examples: Vec::new(),
            cross_references: Vec::new(),
            attributes: Vec::new(),
            complexity: None,
            modifiers: MethodModifiers::default(),
            package_id: None,
            package_version: None,
            target_framework: None,
            source_file_path: None,
            is_from_cache: false,
            content_hash: None,
            indexed_at: None,
        }
    }

    #[test]
    fn sanitize_replaces_control_characters() {
        assert_eq!(sanitize("a\nb\r\nc\td\u{08}e\u{0C}f"), "a b  c d e f");
    }

    #[test]
    fn round_trip_build_preserves_name_and_sanitized_summary() {
        let mut record = bare_record("ArgumentException", "System.ArgumentException");
        record.summary = Some("Thrown\nwhen an argument is invalid.".to_string());
        let doc = build_document(&record);
        assert_eq!(doc.stored.get("name").unwrap(), &vec![record.name.clone()]);
        assert_eq!(
            doc.stored.get("summary").unwrap(),
            &vec!["Thrown when an argument is invalid.".to_string()]
        );
    }

    #[test]
    fn content_field_contains_every_word_of_core_text_fields() {
        let mut record = bare_record("ArgumentException", "System.ArgumentException");
        record.namespace = "System".to_string();
        record.summary = Some("Represents errors".to_string());
        let doc = build_document(&record);
        let content_tokens = doc.terms.get("content").unwrap();
        for word in ["argumentexception", "system", "represents", "errors"] {
            assert!(
                content_tokens.iter().any(|t| t == word),
                "missing {word} in {:?}",
                content_tokens
            );
        }
    }

    #[test]
    fn content_hash_is_indexed_but_not_stored() {
        let mut record = bare_record("Foo", "N.Foo");
        record.content_hash = Some("abc123".to_string());
        let doc = build_document(&record);
        assert!(doc.terms.get("contentHash").unwrap().contains(&"abc123".to_string()));
        assert!(!doc.stored.contains_key("contentHash"));
    }

    #[test]
    fn method_flags_only_present_for_methods() {
        let mut record = bare_record("Foo", "N.T.Foo");
        record.kind = MemberKind::Method;
        record.modifiers.is_static = true;
        let doc = build_document(&record);
        assert_eq!(doc.stored.get("isStatic").unwrap(), &vec!["true".to_string()]);

        let type_record = bare_record("Foo", "N.Foo");
        let type_doc = build_document(&type_record);
        assert!(!type_doc.stored.contains_key("isStatic"));
    }

    #[test]
    fn complexity_fields_are_stored_as_integers() {
        let mut record = bare_record("Foo", "N.T.Foo");
        record.complexity = Some(ComplexityMetrics {
            parameter_count: 2,
            cyclomatic_complexity: 5,
            documentation_line_count: 10,
        });
        let doc = build_document(&record);
        assert_eq!(doc.ints.get("parameterCount"), Some(&2));
        assert_eq!(doc.ints.get("cyclomaticComplexity"), Some(&5));
    }

    #[test]
    fn crossref_produces_untyped_and_typed_entries() {
        let mut record = bare_record("Foo", "N.Foo");
        record.cross_references.push(XRef {
            target_id: "T:N.Bar".to_string(),
            kind: XRefKind::SeeAlso,
        });
        let doc = build_document(&record);
        assert!(doc.stored.get("crossref").unwrap().contains(&"T:N.Bar".to_string()));
        assert!(doc
            .stored
            .get("crossref_seealso")
            .unwrap()
            .contains(&"T:N.Bar".to_string()));
    }

    #[test]
    fn related_type_is_searchable_by_simple_name() {
        let mut record = bare_record("Foo", "N.Foo");
        record.cross_references.push(XRef {
            target_id: "T:System.Collections.Generic.Dictionary`2".to_string(),
            kind: XRefKind::Inheritance,
        });
        let doc = build_document(&record);
        let related = doc.terms.get("relatedType").unwrap();
        assert!(related.iter().any(|t| t == "dictionary`2"));
        assert!(related.iter().any(|t| t == "dictionary"));
    }

    #[test]
    fn declaring_type_present_for_non_type_members() {
        let mut record = bare_record("Foo", "N.T.Foo");
        record.kind = MemberKind::Method;
        let doc = build_document(&record);
        assert_eq!(doc.stored.get("declaringType").unwrap(), &vec!["N.T".to_string()]);
    }

    #[test]
    fn empty_marker_document_uses_document_type_field() {
        let marker = EmptyFileMarker::for_path("/x/empty.xml");
        let doc = build_empty_marker_document(&marker);
        assert_eq!(doc.id, "EMPTY_FILE|/x/empty.xml");
        assert_eq!(doc.stored.get("documentType").unwrap(), &vec!["EmptyXmlFile".to_string()]);
    }

    #[test]
    fn packaging_context_stored_when_present() {
        let mut record = bare_record("Foo", "N.Foo");
        record.package_id = Some("Newtonsoft.Json".to_string());
        record.package_version = Some("13.0.3".to_string());
        record.target_framework = Some("net8.0".to_string());
        record.is_from_cache = true;
        let doc = build_document(&record);
        assert_eq!(doc.stored.get("packageId").unwrap(), &vec!["Newtonsoft.Json".to_string()]);
        assert_eq!(doc.stored.get("isFromNuGetCache").unwrap(), &vec!["true".to_string()]);
    }
}
