//! Wire encodings of request bodies.
//!
//! [`serialize_body`] turns a mapped body into a [`WireBody`] for the
//! operation's declared content type. A `WireBody` owns all of its bytes,
//! so a retried request resends exactly what the first attempt sent.

use bytes::{Bytes, BytesMut};
use futures::TryStreamExt;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::error::SerializeError;
use crate::value::{BinaryPayload, BodyMap, BodyValue};

/// `application/json`
pub const JSON: &str = "application/json";
/// `application/x-www-form-urlencoded`
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
/// `multipart/form-data`
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// One field of a multipart body.
#[derive(Debug, Clone, PartialEq)]
pub enum MultipartField {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: String,
        content: Bytes,
    },
}

impl MultipartField {
    pub fn name(&self) -> &str {
        match self {
            Self::Text { name, .. } | Self::File { name, .. } => name,
        }
    }
}

/// A serialized, replayable request body.
#[derive(Debug, Clone, PartialEq)]
pub enum WireBody {
    /// JSON text.
    Json(String),
    /// URL-encoded form text.
    Form(String),
    /// Multipart form fields, in field order.
    Multipart(Vec<MultipartField>),
}

impl WireBody {
    /// The content type sent with this body.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json(_) => JSON,
            Self::Form(_) => FORM_URLENCODED,
            Self::Multipart(_) => MULTIPART_FORM_DATA,
        }
    }

    /// Attaches the body to a request.
    ///
    /// Multipart forms are rebuilt on every call because `reqwest` consumes
    /// them.
    ///
    /// ## Errors
    ///
    /// Returns an error if a sniffed MIME type is rejected by `reqwest`.
    pub fn apply(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, reqwest::Error> {
        match self {
            Self::Json(text) | Self::Form(text) => Ok(request
                .header(CONTENT_TYPE, self.content_type())
                .body(text.clone())),
            Self::Multipart(fields) => {
                let mut form = reqwest::multipart::Form::new();
                for field in fields {
                    form = match field {
                        MultipartField::Text { name, value } => {
                            form.text(name.clone(), value.clone())
                        }
                        MultipartField::File {
                            name,
                            file_name,
                            mime,
                            content,
                        } => {
                            let part = reqwest::multipart::Part::bytes(content.to_vec())
                                .file_name(file_name.clone())
                                .mime_str(mime)?;
                            form.part(name.clone(), part)
                        }
                    };
                }
                Ok(request.multipart(form))
            }
        }
    }
}

/// Returns the lower-cased media type of a content type, without
/// parameters.
pub(crate) fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Serializes a mapped body for `content_type`.
///
/// Returns `Ok(None)` for content types the runtime does not encode; the
/// request is then sent without a body.
///
/// ## Errors
///
/// Returns [`SerializeError`] if a form body is not an object, a byte
/// stream cannot be read, or JSON encoding fails.
///
/// ## Examples
///
/// ```
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// use api_runtime::serialize::{serialize_body, WireBody};
/// use api_runtime::BodyValue;
/// use serde_json::json;
///
/// let body = BodyValue::from(json!({ "name": "Acme", "tags": ["a", "b"] }));
/// let wire = serialize_body("application/x-www-form-urlencoded", body).await.unwrap();
/// assert_eq!(
///     wire,
///     Some(WireBody::Form("name=Acme&tags=%5B%22a%22%2C%22b%22%5D".to_string()))
/// );
/// # });
/// ```
pub async fn serialize_body(
    content_type: &str,
    value: BodyValue,
) -> Result<Option<WireBody>, SerializeError> {
    match essence(content_type).as_str() {
        JSON => Ok(Some(WireBody::Json(serde_json::to_string(&value)?))),
        FORM_URLENCODED => {
            let fields = expect_object(FORM_URLENCODED, value)?;
            Ok(Some(WireBody::Form(encode_form(&fields))))
        }
        MULTIPART_FORM_DATA => {
            let fields = expect_object(MULTIPART_FORM_DATA, value)?;
            Ok(Some(WireBody::Multipart(encode_multipart(fields).await?)))
        }
        other => {
            debug!(content_type = %other, "no encoder for content type, sending without body");
            Ok(None)
        }
    }
}

fn expect_object(content_type: &str, value: BodyValue) -> Result<BodyMap, SerializeError> {
    match value {
        BodyValue::Object(fields) => Ok(fields),
        other => Err(SerializeError::NotAnObject {
            content_type: content_type.to_string(),
            found: other.type_name(),
        }),
    }
}

fn encode_form(fields: &BodyMap) -> String {
    let mut form = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in fields {
        if let Some(text) = value.render_text() {
            form.append_pair(name, &text);
        }
    }
    form.finish()
}

async fn encode_multipart(fields: BodyMap) -> Result<Vec<MultipartField>, SerializeError> {
    let mut out = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        let content = match value {
            BodyValue::Binary(BinaryPayload::Bytes(bytes)) => bytes,
            BodyValue::Binary(BinaryPayload::Stream(stream)) => {
                let Some(stream) = stream.take() else {
                    return Err(SerializeError::StreamConsumed { field: name });
                };
                let buffer = stream
                    .try_fold(BytesMut::new(), |mut buffer, chunk| async move {
                        buffer.extend_from_slice(&chunk);
                        Ok(buffer)
                    })
                    .await
                    .map_err(|source| SerializeError::Stream {
                        field: name.clone(),
                        source,
                    })?;
                buffer.freeze()
            }
            other => {
                if let Some(text) = other.render_text() {
                    out.push(MultipartField::Text { name, value: text });
                }
                continue;
            }
        };

        match infer::get(&content) {
            Some(kind) => out.push(MultipartField::File {
                name,
                file_name: format!("temp.{}", kind.extension()),
                mime: kind.mime_type().to_string(),
                content,
            }),
            None => debug!(field = %name, "skipping binary field with undetectable content type"),
        }
    }
    Ok(out)
}
