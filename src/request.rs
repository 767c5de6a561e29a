use reqwest::header::HeaderMap;
use serde::Serialize;

use crate::{ClientError, Result};

/// HTTP verb of a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub(crate) fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One part of a multipart form.
#[derive(Clone, Debug, PartialEq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        bytes: Vec<u8>,
        mime: Option<String>,
    },
}

/// Multipart form payload.
///
/// `reqwest::multipart::Form` is consumed when sent, so the form is kept
/// as plain parts and rebuilt for every attempt.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UploadForm {
    parts: Vec<FormPart>,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Adds a file field. `mime` is optional; the server sniffs it otherwise.
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
        mime: Option<&str>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            bytes: bytes.into(),
            mime: mime.map(str::to_owned),
        });
        self
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    pub(crate) fn to_multipart(&self) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for part in &self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
                FormPart::File {
                    name,
                    file_name,
                    bytes,
                    mime,
                } => {
                    let mut file = reqwest::multipart::Part::bytes(bytes.clone())
                        .file_name(file_name.clone());
                    if let Some(mime) = mime {
                        file = file.mime_str(mime).map_err(|err| {
                            ClientError::InvalidRequest(format!(
                                "invalid mime type '{mime}' for part '{name}': {err}"
                            ))
                        })?;
                    }
                    form.part(name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

/// Request payload.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    /// Structured payload, sent with `Content-Type: application/json`.
    Json(serde_json::Value),
    /// Multipart form; the transport sets the boundary header.
    Multipart(UploadForm),
    /// Raw bytes; no content type is forced.
    Binary(Vec<u8>),
}

impl RequestBody {
    /// Serializes any value into a JSON body.
    pub fn json<B: Serialize + ?Sized>(body: &B) -> Result<Self> {
        serde_json::to_value(body)
            .map(Self::Json)
            .map_err(|err| ClientError::InvalidRequest(format!("body is not valid JSON: {err}")))
    }

    /// Whether the transport, not this client, owns the content type.
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Multipart(_) | Self::Binary(_))
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<UploadForm> for RequestBody {
    fn from(form: UploadForm) -> Self {
        Self::Multipart(form)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

/// Everything needed to issue one logical request. Not changed between
/// attempts.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub body: Option<RequestBody>,
    /// Header overrides; a caller-supplied `Content-Type` wins.
    pub headers: HeaderMap,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }
}
