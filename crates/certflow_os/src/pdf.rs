#![forbid(unsafe_code)]

//! Certificate document rendering.
//!
//! Two renderers sit behind [`CertPdfRenderer`]: a company template renderer that lays out
//! labelled fields from a data dictionary, and a fixed-layout fallback used when no template
//! is active or the template cannot be applied. Both render from the canonical snapshot, so a
//! committed revision can be re-rendered later from its stored content alone.

use std::collections::BTreeMap;

use certflow_engines::explain_snapshot;
use certflow_kernel_contracts::cert_type::get_cert_type_metadata;
use certflow_kernel_contracts::payload::str_at;
use certflow_kernel_contracts::snapshot::CanonicalCertSnapshot;
use certflow_storage::cert_store::PdfTemplateRecord;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde_json::Value;
use thiserror::Error;

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const TITLE_SIZE: i64 = 14;
const BODY_SIZE: i64 = 9;
const LEADING: i64 = 12;
const WRAP_COLUMNS: usize = 90;
const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2 * MARGIN - 2 * LEADING) / LEADING) as usize;
const MISSING_VALUE: &str = "-";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template {template_id} targets {template_type}, certificate is {cert_type}")]
    TemplateMismatch {
        template_id: String,
        template_type: String,
        cert_type: String,
    },

    #[error("template {template_id} defines no fields")]
    EmptyTemplate { template_id: String },

    #[error("pdf content encoding failed: {0}")]
    Encode(#[from] lopdf::Error),

    #[error("pdf write failed: {0}")]
    Write(#[from] std::io::Error),
}

/// Produces document bytes for one canonical snapshot.
pub trait CertPdfRenderer {
    fn render(&self, snapshot: &CanonicalCertSnapshot) -> Result<Vec<u8>, RenderError>;
}

/// Fixed layout covering every section of the snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackPdfRenderer;

impl CertPdfRenderer for FallbackPdfRenderer {
    fn render(&self, snapshot: &CanonicalCertSnapshot) -> Result<Vec<u8>, RenderError> {
        let title = format!("{} Certificate", type_label(&snapshot.certificate.cert_type));
        write_text_pdf(&title, &fallback_lines(snapshot))
    }
}

fn fallback_lines(snapshot: &CanonicalCertSnapshot) -> Vec<String> {
    let core = &snapshot.certificate;
    let mut lines = Vec::new();

    lines.push(format!("Certificate number: {}", core.certificate_number));
    lines.push(format!("Type: {}", type_label(&core.cert_type)));
    if let Some(standard) = get_cert_type_metadata(&core.cert_type).map(|m| m.standard) {
        lines.push(format!("Standard: {standard}"));
    }
    lines.push(format!(
        "Outcome: {}",
        core.outcome.as_deref().unwrap_or(MISSING_VALUE)
    ));
    if let Some(reason) = &core.outcome_reason {
        lines.push(format!("Reason: {reason}"));
    }
    if let Some(explanation) = explain_snapshot(snapshot) {
        lines.push(format!("Summary: {explanation}"));
    }
    if let Some(original) = &core.amends_certificate_id {
        lines.push(format!("Amends certificate: {original}"));
    }
    let dict = certificate_data_dictionary(snapshot);
    for (label, key) in [
        ("Client", "client.name"),
        ("Installation address", "installation.address"),
        ("Contractor", "contractor.name"),
        ("Inspector", "inspector.name"),
    ] {
        lines.push(format!("{label}: {}", lookup(&dict, key)));
    }

    lines.push(String::new());
    lines.push(format!("Observations ({})", snapshot.observations.len()));
    for o in &snapshot.observations {
        let resolved = if o.resolved_at.is_some() { " [resolved]" } else { "" };
        let location = if o.location.is_empty() {
            String::new()
        } else {
            format!(" @ {}", o.location)
        };
        lines.push(format!("  {}{location}: {}{resolved}", o.code, o.description));
    }

    lines.push(String::new());
    lines.push(format!("Checklist ({})", snapshot.checklists.len()));
    for c in &snapshot.checklists {
        let answer = if c.answer.is_empty() { MISSING_VALUE } else { c.answer.as_str() };
        lines.push(format!("  [{}] {}: {answer}", c.section, c.question));
    }

    lines.push(String::new());
    lines.push(format!("Test results ({})", snapshot.test_results.len()));
    for t in &snapshot.test_results {
        let values = t
            .data
            .iter()
            .map(|(k, v)| format!("{k}={}", scalar_text(v).unwrap_or_default()))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!(
            "  {}: {values}",
            t.circuit_ref.as_deref().unwrap_or(MISSING_VALUE)
        ));
    }

    lines.push(String::new());
    lines.push("Signatures".to_string());
    for s in &snapshot.signatures {
        lines.push(format!(
            "  {}: {} ({})",
            s.role,
            s.signer_name,
            s.signed_at.as_deref().unwrap_or("unsigned")
        ));
    }

    let photos = photo_captions(snapshot);
    if !photos.is_empty() {
        lines.push(String::new());
        lines.push(format!("Photos ({})", photos.len()));
        lines.extend(photos.into_iter().map(|p| format!("  {p}")));
    }

    lines
}

/// Company-designed layout: the template's fields in order, looked up in the data dictionary.
#[derive(Debug, Clone, Copy)]
pub struct TemplatePdfRenderer<'a> {
    template: &'a PdfTemplateRecord,
}

impl<'a> TemplatePdfRenderer<'a> {
    pub fn new(template: &'a PdfTemplateRecord) -> Self {
        Self { template }
    }
}

impl CertPdfRenderer for TemplatePdfRenderer<'_> {
    fn render(&self, snapshot: &CanonicalCertSnapshot) -> Result<Vec<u8>, RenderError> {
        let template = self.template;
        if template.cert_type.as_str() != snapshot.certificate.cert_type {
            return Err(RenderError::TemplateMismatch {
                template_id: template.template_id.clone(),
                template_type: template.cert_type.as_str().to_string(),
                cert_type: snapshot.certificate.cert_type.clone(),
            });
        }
        if template.fields.is_empty() {
            return Err(RenderError::EmptyTemplate {
                template_id: template.template_id.clone(),
            });
        }

        let dict = certificate_data_dictionary(snapshot);
        let mut lines: Vec<String> = template
            .fields
            .iter()
            .map(|f| format!("{}: {}", f.label, lookup(&dict, &f.key)))
            .collect();

        if template.include_photos {
            let photos = photo_captions(snapshot);
            if !photos.is_empty() {
                lines.push(String::new());
                lines.push("Photos".to_string());
                lines.extend(photos.into_iter().map(|p| format!("  {p}")));
            }
        }
        if let Some(footer) = &template.footer {
            lines.push(String::new());
            lines.push(footer.clone());
        }

        write_text_pdf(&template.title, &lines)
    }
}

/// Flat string dictionary a template addresses by key.
///
/// Fixed keys cover the certificate header and the v1/v2 payload locations of the common
/// parties; every scalar leaf of the payload is also exposed as `data.<dotted.path>`.
pub fn certificate_data_dictionary(snapshot: &CanonicalCertSnapshot) -> BTreeMap<String, String> {
    let core = &snapshot.certificate;
    let data = &core.data;
    let mut dict = BTreeMap::new();

    let mut put = |key: &str, value: Option<&str>| {
        if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
            dict.insert(key.to_string(), v.to_string());
        }
    };
    put("certificate.id", Some(core.id.as_str()));
    put("certificate.number", Some(core.certificate_number.as_str()));
    put("certificate.type", Some(core.cert_type.as_str()));
    put("certificate.type_label", Some(type_label(&core.cert_type)));
    put("certificate.outcome", core.outcome.as_deref());
    put("certificate.outcome_reason", core.outcome_reason.as_deref());
    put(
        "certificate.explanation",
        explain_snapshot(snapshot).as_deref(),
    );
    put("certificate.amends", core.amends_certificate_id.as_deref());
    put("inspector.name", core.inspector_name.as_deref());
    put("inspector.email", core.inspector_email.as_deref());
    put(
        "client.name",
        str_at(data, &["clientDetails", "clientName"]).or(str_at(data, &["overview", "clientName"])),
    );
    put(
        "installation.address",
        str_at(data, &["installationDetails", "address"])
            .or(str_at(data, &["overview", "installationAddress"])),
    );
    put("site.name", str_at(data, &["overview", "siteName"]));
    put(
        "contractor.name",
        str_at(data, &["contractorDetails", "companyName"]),
    );

    let unresolved = snapshot
        .observations
        .iter()
        .filter(|o| o.resolved_at.is_none())
        .count();
    dict.insert("observations.unresolved".to_string(), unresolved.to_string());
    dict.insert(
        "checklist.failed".to_string(),
        snapshot
            .checklists
            .iter()
            .filter(|c| c.answer == "fail")
            .count()
            .to_string(),
    );
    dict.insert(
        "test_results.count".to_string(),
        snapshot.test_results.len().to_string(),
    );

    flatten_scalars("data", data, &mut dict);
    dict
}

fn flatten_scalars(prefix: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                flatten_scalars(&format!("{prefix}.{k}"), v, out);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten_scalars(&format!("{prefix}.{i}"), v, out);
            }
        }
        other => {
            if let Some(text) = scalar_text(other) {
                out.insert(prefix.to_string(), text);
            }
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "Yes" } else { "No" }.to_string()),
        _ => None,
    }
}

fn lookup<'d>(dict: &'d BTreeMap<String, String>, key: &str) -> &'d str {
    dict.get(key).map(String::as_str).unwrap_or(MISSING_VALUE)
}

fn type_label(code: &str) -> &str {
    get_cert_type_metadata(code).map(|m| m.label).unwrap_or(code)
}

fn photo_captions(snapshot: &CanonicalCertSnapshot) -> Vec<String> {
    snapshot
        .attachments
        .iter()
        .filter(|a| a.mime_type.starts_with("image/"))
        .map(|a| {
            if a.category.is_empty() {
                a.name.clone()
            } else {
                format!("{} ({})", a.name, a.category)
            }
        })
        .collect()
}

/// Base-14 Courier only covers Latin-1; anything else prints as `?`.
fn pdf_safe(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2026}' => '.',
            '\u{2013}' | '\u{2014}' => '-',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '?',
        })
        .collect()
}

fn wrap(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    if chars.len() <= WRAP_COLUMNS {
        return vec![line.to_string()];
    }
    chars
        .chunks(WRAP_COLUMNS)
        .enumerate()
        .map(|(i, chunk)| {
            let s: String = chunk.iter().collect();
            if i == 0 {
                s
            } else {
                format!("    {s}")
            }
        })
        .collect()
}

/// Single-font text document: a title on the first page, body lines paginated after it.
pub(crate) fn write_text_pdf(title: &str, lines: &[String]) -> Result<Vec<u8>, RenderError> {
    let body: Vec<String> = lines.iter().flat_map(|l| wrap(&pdf_safe(l))).collect();
    let pages: Vec<&[String]> = if body.is_empty() {
        vec![&body[..]]
    } else {
        body.chunks(LINES_PER_PAGE).collect()
    };

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let page_count = pages.len();
    let mut kids: Vec<Object> = Vec::with_capacity(page_count);
    for (index, page_lines) in pages.into_iter().enumerate() {
        let mut ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), TITLE_SIZE.into()]),
            Operation::new("TL", vec![LEADING.into()]),
            Operation::new(
                "Td",
                vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN).into()],
            ),
        ];
        if index == 0 {
            ops.push(Operation::new(
                "Tj",
                vec![Object::string_literal(pdf_safe(title))],
            ));
        } else {
            ops.push(Operation::new(
                "Tj",
                vec![Object::string_literal(format!(
                    "{} (page {} of {page_count})",
                    pdf_safe(title),
                    index + 1
                ))],
            ));
        }
        ops.push(Operation::new("T*", vec![]));
        ops.push(Operation::new("Tf", vec!["F1".into(), BODY_SIZE.into()]));
        for line in page_lines {
            ops.push(Operation::new("T*", vec![]));
            ops.push(Operation::new(
                "Tj",
                vec![Object::string_literal(line.as_str())],
            ));
        }
        ops.push(Operation::new("ET", vec![]));

        let content = Content { operations: ops };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}
