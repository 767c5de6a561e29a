use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tokio::time::{sleep, timeout};

use crate::{
    classify::{classify, human_message, retry_delay},
    decode::{decode_envelope, failure_from_response, join_url, terminal_failure},
    ClientError, ClientOptions, Failure, RequestBody, RequestDescriptor, RequestOptions,
    ResponseEnvelope, Result, UploadForm,
};

#[derive(Clone)]
/// Request client for the recruiting API.
///
/// Every call is raced against a timeout and retried with jittered
/// exponential backoff while the failure is classified as retryable.
/// Clones share the bearer token.
pub struct ApiClient {
    http: reqwest::Client,
    authorization: Arc<RwLock<Option<String>>>,
    options: ClientOptions,
    upload_options: RequestOptions,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.has_token() {
            "<redacted>"
        } else {
            "<none>"
        };
        f.debug_struct("ApiClient")
            .field("base_url", &self.options.base_url)
            .field("token", &token)
            .field("options", &self.options)
            .field("upload_options", &self.upload_options)
            .finish()
    }
}

impl ApiClient {
    /// Creates a client for `base_url` with default options and no token.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::from_options(ClientOptions {
            base_url: base_url.into(),
            ..ClientOptions::default()
        })
    }

    /// Creates a client from fully specified options.
    pub fn from_options(options: ClientOptions) -> Self {
        Self {
            http: reqwest::Client::new(),
            authorization: Arc::new(RwLock::new(None)),
            options,
            upload_options: RequestOptions::upload(),
        }
    }

    /// Creates a client from environment variables.
    ///
    /// See [`ClientOptions::from_env`] for the variables read.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use recruit_client::ApiClient;
    ///
    /// let api = ApiClient::from_env().expect("malformed RECRUIT_API_* env vars");
    /// ```
    pub fn from_env() -> std::result::Result<Self, String> {
        ClientOptions::from_env().map(Self::from_options)
    }

    /// Applies client options such as base address, timeout and retry behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    /// Replaces the budget used by [`ApiClient::upload`].
    pub fn with_upload_options(mut self, opts: RequestOptions) -> Self {
        self.upload_options = opts;
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn upload_options(&self) -> RequestOptions {
        self.upload_options
    }

    /// Replaces the bearer token used by all subsequent requests.
    ///
    /// The `Bearer ` prefix is added when missing. `None` or a blank
    /// token clears it. Last writer wins across clones.
    pub fn set_token(&self, token: Option<&str>) {
        let authorization = token
            .filter(|value| !value.trim().is_empty())
            .map(normalize_bearer_authorization);
        *self
            .authorization
            .write()
            .unwrap_or_else(PoisonError::into_inner) = authorization;
    }

    pub fn has_token(&self) -> bool {
        self.authorization
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn authorization(&self) -> Option<String> {
        self.authorization
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ResponseEnvelope<T>> {
        self.send(RequestDescriptor::get(path)).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<RequestBody>,
    ) -> Result<ResponseEnvelope<T>> {
        self.send(with_optional_body(RequestDescriptor::post(path), body))
            .await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<RequestBody>,
    ) -> Result<ResponseEnvelope<T>> {
        self.send(with_optional_body(RequestDescriptor::put(path), body))
            .await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<RequestBody>,
    ) -> Result<ResponseEnvelope<T>> {
        self.send(with_optional_body(RequestDescriptor::delete(path), body))
            .await
    }

    /// Posts a multipart form under the upload budget.
    ///
    /// The budget is passed to this call only; the client's own options
    /// are never touched, so overlapping calls keep their own budgets.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        form: UploadForm,
    ) -> Result<ResponseEnvelope<T>> {
        self.request(
            RequestDescriptor::post(path).with_body(form),
            self.upload_options,
        )
        .await
    }

    /// Issues an arbitrary request under an explicit budget.
    ///
    /// A 2xx body that does not decode as an envelope yields
    /// [`ClientError::Decode`] and is not retried.
    pub async fn request<T: DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
        budget: RequestOptions,
    ) -> Result<ResponseEnvelope<T>> {
        let body = self.issue(&descriptor, budget).await?;
        decode_envelope(&body)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
    ) -> Result<ResponseEnvelope<T>> {
        self.request(descriptor, self.options.request_options())
            .await
    }

    /// Runs attempts until one succeeds, a failure is not retryable, or
    /// the retry budget is spent. Returns the successful body.
    async fn issue(
        &self,
        descriptor: &RequestDescriptor,
        budget: RequestOptions,
    ) -> Result<String> {
        let url = reqwest::Url::parse(&join_url(&self.options.base_url, &descriptor.path))
            .map_err(|err| {
                ClientError::InvalidRequest(format!("invalid url for '{}': {err}", descriptor.path))
            })?;
        let headers = self.build_headers(descriptor)?;

        let mut attempt = 0usize;
        loop {
            let request = self.build_request(descriptor, url.clone(), headers.clone())?;
            let failure = match send_attempt(request, budget).await {
                Ok(body) => return Ok(body),
                Err(failure) => failure,
            };

            let judgment = classify(&failure);
            if judgment.retryable && attempt < budget.max_retries {
                let delay = retry_delay(attempt, self.options.retry_backoff());

                #[cfg(feature = "tracing")]
                tracing::debug!(
                    path = %descriptor.path,
                    attempt,
                    kind = %judgment.kind,
                    status = ?judgment.status,
                    "retrying request after {} ms",
                    delay.as_millis()
                );

                sleep(delay).await;
                attempt += 1;
                continue;
            }

            let failure = terminal_failure(failure, budget.timeout_ms);
            let user_message = human_message(&failure);

            #[cfg(feature = "tracing")]
            tracing::warn!(
                path = %descriptor.path,
                attempts = attempt + 1,
                kind = %judgment.kind,
                status = ?judgment.status,
                "request failed: {}",
                failure.message
            );

            return Err(ClientError::Request {
                failure,
                judgment,
                attempts: attempt + 1,
                user_message,
            });
        }
    }

    fn build_headers(&self, descriptor: &RequestDescriptor) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        if let Some(authorization) = self.authorization() {
            let value = HeaderValue::from_str(&authorization).map_err(|_| {
                ClientError::InvalidRequest("token contains invalid header characters".to_owned())
            })?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let binary = descriptor.body.as_ref().is_some_and(RequestBody::is_binary);
        if !binary && !descriptor.headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }

        for (name, value) in &descriptor.headers {
            headers.insert(name.clone(), value.clone());
        }
        Ok(headers)
    }

    fn build_request(
        &self,
        descriptor: &RequestDescriptor,
        url: reqwest::Url,
        headers: HeaderMap,
    ) -> Result<reqwest::RequestBuilder> {
        let request = self
            .http
            .request(descriptor.method.as_reqwest(), url)
            .headers(headers);

        Ok(match &descriptor.body {
            Some(RequestBody::Json(value)) => request.json(value),
            Some(RequestBody::Multipart(form)) => request.multipart(form.to_multipart()?),
            Some(RequestBody::Binary(bytes)) => request.body(bytes.clone()),
            None => request,
        })
    }
}

/// One attempt: send and read the body, raced against the deadline.
///
/// When the deadline wins, the in-flight exchange is dropped, which
/// closes its connection.
async fn send_attempt(
    request: reqwest::RequestBuilder,
    budget: RequestOptions,
) -> std::result::Result<String, Failure> {
    let exchange = async {
        let response = request.send().await.map_err(transport_failure)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_failure)?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(failure_from_response(status.as_u16(), &body))
        }
    };

    match timeout(budget.timeout(), exchange).await {
        Ok(outcome) => outcome,
        Err(_) => Err(Failure::timeout(budget.timeout_ms)),
    }
}

fn transport_failure(err: reqwest::Error) -> Failure {
    if err.is_timeout() {
        let mut failure = Failure::timeout(0);
        failure.message = err.to_string();
        return failure;
    }

    let mut message = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    Failure::network(message)
}

fn with_optional_body(
    descriptor: RequestDescriptor,
    body: Option<RequestBody>,
) -> RequestDescriptor {
    match body {
        Some(body) => descriptor.with_body(body),
        None => descriptor,
    }
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}
