//! Form bodies posted by the admin pages.
//!
//! The same page posts either a multipart upload or a plain urlencoded
//! button press, so handlers take a [`PostedForm`] that accepts both.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::Form;

/// Field carrying the uploaded document.
pub const FILE_FIELD: &str = "xmlfile";

#[derive(Debug)]
pub struct UploadedFile {
    /// Name as declared by the client, unsanitized.
    pub filename: String,
    pub bytes: Bytes,
}

#[derive(Debug, Default)]
pub struct PostedForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
    /// The body could not be read as a form.
    pub malformed: bool,
}

impl PostedForm {
    /// Whether the submit button `name` was pressed.
    pub fn pressed(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(|v| !v.is_empty())
    }

    fn malformed() -> Self {
        Self {
            malformed: true,
            ..Default::default()
        }
    }
}

impl<S> FromRequest<S> for PostedForm
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if is_multipart {
            return Ok(match Multipart::from_request(req, state).await {
                Ok(multipart) => read_multipart(multipart).await,
                Err(e) => {
                    tracing::debug!(error = %e, "Unreadable multipart body");
                    PostedForm::malformed()
                }
            });
        }

        Ok(
            match Form::<HashMap<String, String>>::from_request(req, state).await {
                Ok(Form(fields)) => PostedForm {
                    fields,
                    ..Default::default()
                },
                Err(e) => {
                    tracing::debug!(error = %e, "Unreadable form body");
                    PostedForm::malformed()
                }
            },
        )
    }
}

async fn read_multipart(mut multipart: Multipart) -> PostedForm {
    let mut form = PostedForm::default();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return form,
            Err(e) => {
                tracing::debug!(error = %e, "Multipart field error");
                form.malformed = true;
                return form;
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        if name == FILE_FIELD {
            let filename = field.file_name().unwrap_or_default().to_string();
            match field.bytes().await {
                Ok(bytes) if !filename.is_empty() => {
                    form.file = Some(UploadedFile { filename, bytes })
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "Upload could not be read");
                    form.malformed = true;
                    return form;
                }
            }
        } else {
            match field.text().await {
                Ok(text) => {
                    form.fields.insert(name, text);
                }
                Err(_) => {
                    form.malformed = true;
                    return form;
                }
            }
        }
    }
}

/// Final path component of a client-supplied filename, or `None` when
/// nothing usable remains.
pub fn safe_filename(declared: &str) -> Option<String> {
    let name = declared.rsplit(['/', '\\']).next()?.trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}
