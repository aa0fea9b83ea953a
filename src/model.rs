//! Logical data model: documented API members and their packaging context.
//!
//! These types are the input to the document builder (`document.rs`) and the
//! output of the XML parser (`parser.rs`). They carry no index-specific
//! representation; the same `MemberRecord` could in principle be projected
//! into any backing store.

use std::collections::HashMap;
use std::collections::HashSet;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Type,
    Method,
    Property,
    Field,
    Event,
}

impl MemberKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberKind::Type => "Type",
            MemberKind::Method => "Method",
            MemberKind::Property => "Property",
            MemberKind::Field => "Field",
            MemberKind::Event => "Event",
        }
    }
}

impl std::fmt::Display for MemberKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MemberKind {
    type Err = crate::error::ApiLensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Type" => Ok(MemberKind::Type),
            "Method" => Ok(MemberKind::Method),
            "Property" => Ok(MemberKind::Property),
            "Field" => Ok(MemberKind::Field),
            "Event" => Ok(MemberKind::Event),
            other => Err(crate::error::ApiLensError::usage(format!(
                "unknown member kind: {other}"
            ))),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XRefKind {
    See,
    SeeAlso,
    Param,
    Return,
    Exception,
    Inheritance,
    Parameter,
    ReturnType,
    GenericConstraint,
}

impl XRefKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            XRefKind::See => "See",
            XRefKind::SeeAlso => "SeeAlso",
            XRefKind::Param => "Param",
            XRefKind::Return => "Return",
            XRefKind::Exception => "Exception",
            XRefKind::Inheritance => "Inheritance",
            XRefKind::Parameter => "Parameter",
            XRefKind::ReturnType => "ReturnType",
            XRefKind::GenericConstraint => "GenericConstraint",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterRecord {
    pub name: String,
    pub type_name: String,
    pub position: u32,
    pub is_optional: bool,
    pub is_params: bool,
    pub is_out: bool,
    pub is_ref: bool,
    pub default_value: Option<String>,
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExceptionRecord {
    pub exception_type: String,
    pub condition: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExampleRecord {
    pub language: Option<String>,
    pub code: String,
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct XRef {
    pub target_id: String,
    pub kind: XRefKind,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeRecord {
    pub attribute_type: String,
    pub properties: Vec<(String, String)>,
}

/// Optional per-member complexity metrics. When present, `parameter_count`
/// must equal the length of `MemberRecord::parameters`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComplexityMetrics {
    pub parameter_count: u32,
    pub cyclomatic_complexity: u32,
    pub documentation_line_count: u32,
}

/// Flags meaningful only for `MemberKind::Method`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MethodModifiers {
    pub is_static: bool,
    pub is_async: bool,
    pub is_extension: bool,
    pub is_virtual: bool,
    pub is_abstract: bool,
    pub is_override: bool,
    pub is_sealed: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MemberRecord {
    pub id: String,
    pub kind: MemberKind,
    pub name: String,
    pub full_name: String,
    pub namespace: String,
    pub assembly: String,
    pub summary: Option<String>,
    pub remarks: Option<String>,
    pub returns: Option<String>,
    pub see_also: Option<String>,
    pub parameters: Vec<ParameterRecord>,
    pub exceptions: Vec<ExceptionRecord>,
    pub code_examples: Vec<ExampleRecord>,
    pub cross_references: Vec<XRef>,
    pub attributes: Vec<AttributeRecord>,
    pub complexity: Option<ComplexityMetrics>,
    pub modifiers: MethodModifiers,
    pub package_id: Option<String>,
    pub package_version: Option<String>,
    pub target_framework: Option<String>,
    pub source_file_path: Option<String>,
    pub is_from_cache: bool,
    pub content_hash: Option<String>,
    pub indexed_at: Option<u64>,
}

impl MemberRecord {
    /// The declaring type per §3.1: everything before the last dot of
    /// `full_name` after stripping the parameter list and backtick-arity
    /// suffix. Returns `None` for `MemberKind::Type` (types have no
    /// declaring-type field) and for names with no dot.
    pub fn declaring_type(&self) -> Option<String> {
        if matches!(self.kind, MemberKind::Type) {
            return None;
        }
        derive_declaring_type(&self.full_name)
    }

    /// `true` when `complexity` is internally consistent with `parameters`.
    pub fn complexity_is_consistent(&self) -> bool {
        match &self.complexity {
            Some(c) => c.parameter_count as usize == self.parameters.len(),
            None => true,
        }
    }
}

/// Strips a trailing `(...)` parameter list from a dotted identifier, then
/// returns everything before the last remaining dot. Used both for
/// `MemberRecord::declaring_type` and, independently, by callers deriving a
/// type name from a full member id.
///
/// Backtick-arity suffixes (`` `1 ``, `` `2 ``...) never contain a dot, so
/// they never affect which dot is "last" and need no separate stripping —
/// only the parameter list can contain dots (from fully-qualified parameter
/// types) that would otherwise confuse a naive `rfind('.')`.
pub fn derive_declaring_type(full_name: &str) -> Option<String> {
    let s = match full_name.find('(') {
        Some(idx) => &full_name[..idx],
        None => full_name,
    };
    let idx = s.rfind('.')?;
    Some(s[..idx].to_string())
}

/// Sentinel document produced whenever parsing an XML file yields zero
/// members. At most one of (any `MemberRecord` at `source_file_path`) or
/// (one `EmptyFileMarker` at that path) exists at a time.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EmptyFileMarker {
    pub id: String,
    pub source_file_path: String,
}

impl EmptyFileMarker {
    pub fn for_path(normalized_path: &str) -> Self {
        EmptyFileMarker {
            id: format!("EMPTY_FILE|{normalized_path}"),
            source_file_path: normalized_path.to_string(),
        }
    }
}

/// One documented-XML-file location discovered by the cache scanner (C7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    pub package_id: String,
    pub version: String,
    pub framework: String,
    pub xml_documentation_path: String,
    pub content_hash: Option<String>,
}

/// Derived, read-only view over a committed index (§3.1), used by the
/// deduplicator (C6) to decide what needs (re)indexing.
#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    pub packages_by_id_with_framework: HashMap<String, HashSet<(String, String)>>,
    pub indexed_xml_paths: HashSet<String>,
    pub empty_xml_paths: HashSet<String>,
    pub total_documents: usize,
}

#[cfg(test)]
mod model_tests {
    use super::*;

    #[test]
    fn declaring_type_strips_params_and_arity() {
        assert_eq!(
            derive_declaring_type("Namespace.Type.Method(Arg)"),
            Some("Namespace.Type".to_string())
        );
        assert_eq!(
            derive_declaring_type("System.Collections.Generic.List`1.Add"),
            Some("System.Collections.Generic.List`1".to_string())
        );
    }

    #[test]
    fn declaring_type_none_without_dot() {
        assert_eq!(derive_declaring_type("TopLevelMethod"), None);
    }

    #[test]
    fn member_record_declaring_type_none_for_types() {
        let r = sample_member(MemberKind::Type, "Namespace.Type");
        assert_eq!(r.declaring_type(), None);
    }

    #[test]
    fn member_record_declaring_type_for_method() {
        let r = sample_member(MemberKind::Method, "Namespace.Type.Method(Arg)");
        assert_eq!(r.declaring_type(), Some("Namespace.Type".to_string()));
    }

    #[test]
    fn complexity_consistency_check() {
        let mut r = sample_member(MemberKind::Method, "N.T.M");
        r.parameters.push(ParameterRecord {
            name: "a".into(),
            type_name: "int".into(),
            position: 0,
            is_optional: false,
            is_params: false,
            is_out: false,
            is_ref: false,
            default_value: None,
            description: None,
        });
        r.complexity = Some(ComplexityMetrics {
            parameter_count: 1,
            cyclomatic_complexity: 1,
            documentation_line_count: 0,
        });
        assert!(r.complexity_is_consistent());
        r.complexity.as_mut().unwrap().parameter_count = 2;
        assert!(!r.complexity_is_consistent());
    }

    fn sample_member(kind: MemberKind, full_name: &str) -> MemberRecord {
        MemberRecord {
            id: format!("T:{full_name}"),
            kind,
            name: full_name.rsplit('.').next().unwrap_or(full_name).to_string(),
            full_name: full_name.to_string(),
            namespace: String::new(),
            assembly: String::new(),
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
}
