// Input validation for outgoing messages and their attachments

use crate::error::ValidationError;
use crate::models::{Attachment, MessageKind, User};

pub const MAX_CONTENT_CHARS: usize = 1000;
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;
pub const MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;

pub const IMAGE_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

// (mime type, file extension)
pub const DOCUMENT_TYPES: [(&str, &str); 6] = [
    ("application/pdf", "pdf"),
    ("application/msword", "doc"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docx",
    ),
    ("text/plain", "txt"),
    ("application/zip", "zip"),
    ("application/x-rar-compressed", "rar"),
];

/// Validate a complete outgoing message: content rules depend on the kind,
/// and image/document messages must carry an acceptable attachment.
pub fn validate_outgoing(
    content: &str,
    kind: MessageKind,
    attachment: Option<&Attachment>,
) -> Result<(), ValidationError> {
    let len = content.chars().count();
    if len > MAX_CONTENT_CHARS {
        return Err(ValidationError::ContentTooLong {
            len,
            max: MAX_CONTENT_CHARS,
        });
    }

    match kind {
        MessageKind::Text => {
            if content.trim().is_empty() {
                return Err(ValidationError::EmptyContent);
            }
            Ok(())
        }
        MessageKind::Image => {
            let file = attachment.ok_or(ValidationError::MissingAttachment("image"))?;
            validate_image(file)
        }
        MessageKind::Document => {
            let file = attachment.ok_or(ValidationError::MissingAttachment("document"))?;
            validate_document(file)
        }
    }
}

pub fn validate_image(file: &Attachment) -> Result<(), ValidationError> {
    let mime = file.mime_type.as_deref().unwrap_or("").to_ascii_lowercase();
    if !IMAGE_MIME_TYPES.contains(&mime.as_str()) {
        return Err(ValidationError::UnsupportedType {
            name: file.name.clone(),
            mime: display_mime(&mime),
        });
    }
    validate_file_size(file, MAX_IMAGE_BYTES)
}

/// Documents are recognised by MIME type, or by file extension when the
/// attachment carries no MIME type.
pub fn validate_document(file: &Attachment) -> Result<(), ValidationError> {
    let accepted = match file.mime_type.as_deref() {
        Some(mime) => {
            let mime = mime.to_ascii_lowercase();
            DOCUMENT_TYPES.iter().any(|(m, _)| *m == mime)
        }
        None => match extension(&file.name) {
            Some(ext) => DOCUMENT_TYPES.iter().any(|(_, e)| *e == ext),
            None => false,
        },
    };

    if !accepted {
        return Err(ValidationError::UnsupportedType {
            name: file.name.clone(),
            mime: display_mime(file.mime_type.as_deref().unwrap_or("")),
        });
    }
    validate_file_size(file, MAX_DOCUMENT_BYTES)
}

pub fn validate_file_size(file: &Attachment, max: u64) -> Result<(), ValidationError> {
    if file.size > max {
        return Err(ValidationError::FileTooLarge {
            name: file.name.clone(),
            size: file.size,
            max,
        });
    }
    Ok(())
}

pub fn validate_user(user: &User) -> Result<(), ValidationError> {
    if user.id.trim().is_empty() {
        return Err(ValidationError::InvalidUser("empty id".to_string()));
    }
    if user.name.trim().is_empty() {
        return Err(ValidationError::InvalidUser(format!("user {} has no name", user.id)));
    }
    if user.avatar.trim().is_empty() {
        return Err(ValidationError::InvalidUser(format!("user {} has no avatar", user.id)));
    }
    Ok(())
}

fn extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn display_mime(mime: &str) -> String {
    if mime.is_empty() {
        "unknown".to_string()
    } else {
        mime.to_string()
    }
}
