//! Loan application form collection and validation.
//!
//! The multipart body is read part by part: text fields are buffered, file
//! parts are streamed straight into the upload directory. Validation runs
//! afterwards on the collected [`RawSubmission`].

use axum::extract::multipart::{Field, Multipart};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::SubmitError;
use crate::staging::{StagedFile, StagedFiles, UploadDir};

/// Required text fields, in the order they are checked.
pub const TEXT_FIELDS: [&str; 5] = ["name", "mobile", "dob", "employment", "income"];

/// The two documents every application carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pan,
    Bank,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 2] = [DocumentKind::Pan, DocumentKind::Bank];

    pub fn field_name(self) -> &'static str {
        match self {
            DocumentKind::Pan => "pan",
            DocumentKind::Bank => "bank",
        }
    }

    /// Attachment name used when the client sent no usable filename.
    pub fn fallback_filename(self) -> &'static str {
        match self {
            DocumentKind::Pan => "pan.pdf",
            DocumentKind::Bank => "bank.pdf",
        }
    }

    pub fn from_field(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.field_name() == name)
    }
}

/// Applicant details as typed into the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicantDetails {
    pub name: String,
    pub mobile: String,
    pub dob: String,
    pub employment: String,
    pub income: String,
}

/// Whatever the client sent, before validation.
#[derive(Debug, Default)]
pub struct RawSubmission {
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub dob: Option<String>,
    pub employment: Option<String>,
    pub income: Option<String>,
    pub pan: Option<StagedFile>,
    pub bank: Option<StagedFile>,
}

/// A submission that passed validation.
#[derive(Debug, Clone)]
pub struct Application {
    pub applicant: ApplicantDetails,
    pub pan: StagedFile,
    pub bank: StagedFile,
}

impl Application {
    pub fn documents(&self) -> [(DocumentKind, &StagedFile); 2] {
        [(DocumentKind::Pan, &self.pan), (DocumentKind::Bank, &self.bank)]
    }
}

impl RawSubmission {
    fn text_slot(&mut self, field: &str) -> Option<&mut Option<String>> {
        match field {
            "name" => Some(&mut self.name),
            "mobile" => Some(&mut self.mobile),
            "dob" => Some(&mut self.dob),
            "employment" => Some(&mut self.employment),
            "income" => Some(&mut self.income),
            _ => None,
        }
    }

    fn document_slot(&mut self, kind: DocumentKind) -> &mut Option<StagedFile> {
        match kind {
            DocumentKind::Pan => &mut self.pan,
            DocumentKind::Bank => &mut self.bank,
        }
    }

    /// Check that every text field is non-blank and both documents are present.
    ///
    /// Fields are checked before files, each in declaration order, and the
    /// first gap is reported.
    pub fn validate(self) -> Result<Application, SubmitError> {
        let applicant = ApplicantDetails {
            name: required_text(self.name, "name")?,
            mobile: required_text(self.mobile, "mobile")?,
            dob: required_text(self.dob, "dob")?,
            employment: required_text(self.employment, "employment")?,
            income: required_text(self.income, "income")?,
        };

        let pan = self
            .pan
            .ok_or(SubmitError::MissingFile(DocumentKind::Pan.field_name()))?;
        let bank = self
            .bank
            .ok_or(SubmitError::MissingFile(DocumentKind::Bank.field_name()))?;

        Ok(Application {
            applicant,
            pan,
            bank,
        })
    }
}

fn required_text(value: Option<String>, field: &'static str) -> Result<String, SubmitError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(SubmitError::MissingField(field))
}

/// Read the multipart body, staging `pan` and `bank` as they arrive.
///
/// Every file created is registered with `staged` before any bytes are
/// written, so partially written uploads are cleaned up too.
pub async fn read_submission(
    mut multipart: Multipart,
    uploads: &UploadDir,
    staged: &mut StagedFiles,
) -> Result<RawSubmission, SubmitError> {
    let mut raw = RawSubmission::default();

    while let Some(mut field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        if let Some(kind) = DocumentKind::from_field(&name) {
            // Only a part with a non-empty filename carries a document. An
            // empty file input or a plain value under this name leaves the
            // slot empty.
            if !carries_file(&field) {
                while field.chunk().await?.is_some() {}
                debug!(field = %name, "document_part_without_file_ignored");
                continue;
            }
            if raw.document_slot(kind).is_some() {
                return Err(SubmitError::DuplicateFile(kind.field_name()));
            }
            let file = stage_field(&mut field, uploads, staged).await?;
            debug!(field = %name, size = file.size, "document_received");
            *raw.document_slot(kind) = Some(file);
        } else if raw.text_slot(&name).is_some() {
            let value = field.text().await?;
            if let Some(slot) = raw.text_slot(&name) {
                *slot = Some(value);
            }
        } else {
            debug!(field = %name, "unknown_form_field_ignored");
        }
    }

    Ok(raw)
}

fn carries_file(field: &Field<'_>) -> bool {
    field.file_name().is_some_and(|name| !name.is_empty())
}

async fn stage_field(
    field: &mut Field<'_>,
    uploads: &UploadDir,
    staged: &mut StagedFiles,
) -> Result<StagedFile, SubmitError> {
    let original_name = field.file_name().map(str::to_owned);
    let (mut staged_file, mut file) = uploads.create(original_name.as_deref(), staged).await?;

    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        staged_file.size += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(staged_file)
}
