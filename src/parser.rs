//! XML documentation parser (§6.1): turns one `<doc>` file into a sequence
//! of `MemberRecord`s.
//!
//! The exact XML schema is left open (only the parser's contract is fixed,
//! in §6); what follows targets the standard .NET compiler-generated
//! doc-comment XML (`<doc>/<members>/<member name="T:...">` with
//! `<summary>`, `<remarks>`, `<returns>`,
//! `<param>`, `<exception>`, `<example>`, `<see cref="...">`, plus a custom
//! `<complexity>` extension element some toolchains emit alongside it), and
//! is a manual `quick_xml::Reader` event walk rather than serde
//! deserialization — the mixed text/element content of `<summary>` and
//! friends does not map cleanly onto a fixed struct shape.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::ApiLensError;
use crate::model::{
    AttributeRecord, ComplexityMetrics, ExampleRecord, ExceptionRecord, MemberKind, MemberRecord,
    MethodModifiers, ParameterRecord, XRef, XRefKind,
};
use crate::paths::normalize_path;

/// The streaming parser contract consumed by the pipeline (C5). Realised as
/// a synchronous, cancellable iterator: the host dependency stack carries no
/// async runtime, so a bounded `Iterator` stands in for an asynchronous lazy
/// sequence — both are finite, not restartable, and can stop early.
pub trait XmlDocParser {
    fn parse_file_stream<'a>(
        &'a self,
        path: &'a str,
        cancel: &'a AtomicBool,
    ) -> Box<dyn Iterator<Item = Result<MemberRecord, ApiLensError>> + 'a>;
}

pub struct QuickXmlDocParser;

impl XmlDocParser for QuickXmlDocParser {
    fn parse_file_stream<'a>(
        &'a self,
        path: &'a str,
        cancel: &'a AtomicBool,
    ) -> Box<dyn Iterator<Item = Result<MemberRecord, ApiLensError>> + 'a> {
        let normalized = normalize_path(path);
        match parse_all(&normalized) {
            Ok(records) => Box::new(RecordIter {
                records: records.into_iter(),
                cancel,
            }),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }
}

struct RecordIter<'a> {
    records: std::vec::IntoIter<MemberRecord>,
    cancel: &'a AtomicBool,
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = Result<MemberRecord, ApiLensError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cancel.load(AtomicOrdering::Relaxed) {
            return None;
        }
        self.records.next().map(Ok)
    }
}

fn parse_all(path: &str) -> Result<Vec<MemberRecord>, ApiLensError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ApiLensError::parse(path.to_string(), format!("cannot read file: {e}")))?;
    parse_str(&content, path)
}

/// Parses a full `<doc>...</doc>` document into its member records. Exposed
/// separately from `parse_all` so tests can exercise the XML walk without
/// touching the filesystem.
pub fn parse_str(xml: &str, path: &str) -> Result<Vec<MemberRecord>, ApiLensError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut records = Vec::new();
    let mut buf = Vec::new();
    let mut assembly_name = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"assembly" => {
                assembly_name = read_assembly_name(&mut reader)?;
            }
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"member" => {
                let name_attr = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.local_name().as_ref() == b"name")
                    .map(|a| a.unescape_value().unwrap_or_default().into_owned())
                    .unwrap_or_default();
                let mut record = parse_member(&mut reader, &name_attr, path)?;
                record.assembly = assembly_name.clone();
                records.push(record);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ApiLensError::Xml {
                    path: path.to_string(),
                    source: e,
                })
            }
        }
        buf.clear();
    }

    Ok(records)
}

/// Reads the `<name>` child of an `<assembly>` element, consuming up to its
/// matching `</assembly>` end tag.
fn read_assembly_name<R: BufRead>(reader: &mut Reader<R>) -> Result<String, ApiLensError> {
    let mut buf = Vec::new();
    let mut name = String::new();
    let mut depth = 0u32;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"name" && depth == 0 => {
                name = read_text_content(reader, e.name())?;
            }
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(ref e)) => {
                if depth == 0 && e.local_name().as_ref() == b"assembly" {
                    break;
                }
                if depth > 0 {
                    depth -= 1;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ApiLensError::Xml {
                    path: String::new(),
                    source: e,
                })
            }
        }
        buf.clear();
    }

    Ok(name)
}

fn parse_member<R: BufRead>(
    reader: &mut Reader<R>,
    raw_name: &str,
    path: &str,
) -> Result<MemberRecord, ApiLensError> {
    let (kind, full_name) = classify_member_name(raw_name);

    // The member name is the last dotted segment once the parameter list is
    // stripped — dots inside a parameter type (e.g. `System.Int32`) must not
    // be mistaken for a member-path separator.
    let name_source = match full_name.find('(') {
        Some(idx) => &full_name[..idx],
        None => full_name.as_str(),
    };
    let name = name_source.rsplit('.').next().unwrap_or(name_source).to_string();

    // The namespace is one level above the declaring type: for a `Type`
    // member that's the type's own declaring scope; for any other kind it's
    // the declaring type's declaring scope.
    let namespace = match kind {
        MemberKind::Type => crate::model::derive_declaring_type(&full_name).unwrap_or_default(),
        _ => {
            let declaring_type = crate::model::derive_declaring_type(&full_name).unwrap_or_default();
            crate::model::derive_declaring_type(&declaring_type).unwrap_or_default()
        }
    };

    let mut record = MemberRecord {
        id: raw_name.to_string(),
        kind,
        name,
        full_name,
        namespace,
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
        source_file_path: Some(path.to_string()),
        is_from_cache: false,
        content_hash: None,
        indexed_at: None,
    };

    let mut buf = Vec::new();
    let mut see_also_parts: Vec<String> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let local = e.local_name();
                match local.as_ref() {
                    b"summary" => record.summary = Some(read_text_content(reader, e.name())?),
                    b"remarks" => record.remarks = Some(read_text_content(reader, e.name())?),
                    b"returns" => record.returns = Some(read_text_content(reader, e.name())?),
                    b"param" => {
                        let param_name = attr_value(e, b"name").unwrap_or_default();
                        let description = read_text_content(reader, e.name())?;
                        record.parameters.push(ParameterRecord {
                            name: param_name,
                            type_name: String::new(),
                            position: record.parameters.len() as u32,
                            is_optional: false,
                            is_params: false,
                            is_out: false,
                            is_ref: false,
                            default_value: None,
                            description: non_empty(description),
                        });
                    }
                    b"exception" => {
                        let exception_type = attr_value(e, b"cref")
                            .map(|c| strip_cref_prefix(&c))
                            .unwrap_or_default();
                        let condition = read_text_content(reader, e.name())?;
                        record.exceptions.push(ExceptionRecord {
                            exception_type,
                            condition: non_empty(condition),
                        });
                    }
                    b"example" => {
                        let code = read_text_content(reader, e.name())?;
                        record.code_examples.push(ExampleRecord {
                            language: None,
                            code,
                            description: None,
                        });
                    }
                    b"see" => {
                        if let Some(cref) = attr_value(e, b"cref") {
                            let target = strip_cref_prefix(&cref);
                            record.cross_references.push(XRef {
                                target_id: target.clone(),
                                kind: XRefKind::See,
                            });
                            see_also_parts.push(target);
                        }
                        skip_to_end(reader, e.name())?;
                    }
                    b"seealso" => {
                        if let Some(cref) = attr_value(e, b"cref") {
                            let target = strip_cref_prefix(&cref);
                            record.cross_references.push(XRef {
                                target_id: target.clone(),
                                kind: XRefKind::SeeAlso,
                            });
                            see_also_parts.push(target);
                        }
                        skip_to_end(reader, e.name())?;
                    }
                    b"complexity" => {
                        let parameter_count = attr_value(e, b"parameterCount")
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(record.parameters.len() as u32);
                        let cyclomatic_complexity =
                            attr_value(e, b"cyclomaticComplexity").and_then(|v| v.parse().ok()).unwrap_or(0);
                        let documentation_line_count = attr_value(e, b"documentationLineCount")
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(0);
                        record.complexity = Some(ComplexityMetrics {
                            parameter_count,
                            cyclomatic_complexity,
                            documentation_line_count,
                        });
                        skip_to_end(reader, e.name())?;
                    }
                    b"modifiers" => {
                        record.modifiers = MethodModifiers {
                            is_static: attr_flag(e, b"static"),
                            is_async: attr_flag(e, b"async"),
                            is_extension: attr_flag(e, b"extension"),
                            is_virtual: attr_flag(e, b"virtual"),
                            is_abstract: attr_flag(e, b"abstract"),
                            is_override: attr_flag(e, b"override"),
                            is_sealed: attr_flag(e, b"sealed"),
                        };
                        skip_to_end(reader, e.name())?;
                    }
                    b"attribute" => {
                        let attribute_type = attr_value(e, b"type").unwrap_or_default();
                        record.attributes.push(AttributeRecord {
                            attribute_type,
                            properties: Vec::new(),
                        });
                        skip_to_end(reader, e.name())?;
                    }
                    _ => {
                        skip_to_end(reader, e.name())?;
                    }
                }
            }
            Ok(Event::Empty(ref e)) => {
                if e.local_name().as_ref() == b"see" {
                    if let Some(cref) = attr_value(e, b"cref") {
                        let target = strip_cref_prefix(&cref);
                        record.cross_references.push(XRef {
                            target_id: target.clone(),
                            kind: XRefKind::See,
                        });
                        see_also_parts.push(target);
                    }
                } else if e.local_name().as_ref() == b"seealso" {
                    if let Some(cref) = attr_value(e, b"cref") {
                        let target = strip_cref_prefix(&cref);
                        record.cross_references.push(XRef {
                            target_id: target.clone(),
                            kind: XRefKind::SeeAlso,
                        });
                        see_also_parts.push(target);
                    }
                }
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"member" => break,
            Ok(Event::Eof) => {
                return Err(ApiLensError::parse(path.to_string(), "unexpected end of file inside <member>"))
            }
            Ok(_) => {}
            Err(e) => {
                return Err(ApiLensError::Xml {
                    path: path.to_string(),
                    source: e,
                })
            }
        }
        buf.clear();
    }

    if !see_also_parts.is_empty() {
        record.see_also = Some(see_also_parts.join(", "));
    }

    Ok(record)
}

fn classify_member_name(raw: &str) -> (MemberKind, String) {
    let (prefix, rest) = raw.split_once(':').unwrap_or(("", raw));
    let kind = match prefix {
        "T" => MemberKind::Type,
        "M" => MemberKind::Method,
        "P" => MemberKind::Property,
        "F" => MemberKind::Field,
        "E" => MemberKind::Event,
        _ => MemberKind::Type,
    };
    (kind, rest.to_string())
}

fn attr_value(e: &quick_xml::events::BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

fn attr_flag(e: &quick_xml::events::BytesStart, key: &[u8]) -> bool {
    attr_value(e, key).map(|v| v == "true").unwrap_or(false)
}

fn strip_cref_prefix(cref: &str) -> String {
    match cref.split_once(':') {
        Some((_, rest)) => rest.to_string(),
        None => cref.to_string(),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Reads the text content (concatenating text nodes, ignoring nested tags
/// like `<paramref>` and `<c>`) up to the matching end tag.
fn read_text_content<R: BufRead>(
    reader: &mut Reader<R>,
    end_name: quick_xml::name::QName,
) -> Result<String, ApiLensError> {
    let mut text = String::new();
    let mut buf = Vec::new();
    let mut depth = 0u32;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Text(t)) => {
                let decoded = t.unescape().unwrap_or_default();
                if !text.is_empty() && !text.ends_with(' ') {
                    text.push(' ');
                }
                text.push_str(decoded.trim());
            }
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(ref e)) => {
                if depth == 0 && e.name().as_ref() == end_name.as_ref() {
                    break;
                }
                if depth > 0 {
                    depth -= 1;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ApiLensError::Xml {
                    path: String::new(),
                    source: e,
                })
            }
        }
        buf.clear();
    }

    Ok(text.trim().to_string())
}

fn skip_to_end<R: BufRead>(reader: &mut Reader<R>, end_name: quick_xml::name::QName) -> Result<(), ApiLensError> {
    let mut buf = Vec::new();
    let mut depth = 0u32;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(ref e)) => {
                if depth == 0 && e.name().as_ref() == end_name.as_ref() {
                    break;
                }
                if depth > 0 {
                    depth -= 1;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ApiLensError::Xml {
                    path: String::new(),
                    source: e,
                })
            }
        }
        buf.clear();
    }
    Ok(())
}
