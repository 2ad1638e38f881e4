//! The per-request response accumulator.

use crate::http::{Headers, Response, StatusCode};

/// Collects status, headers and body for one request.
///
/// [`send`](Self::send) commits the response; it is idempotent, and once committed
/// every further status, header or body write is ignored. Cookies are the one
/// exception so the session can still be saved after an early commit.
///
/// # Examples
///
/// ```
/// use rttp_mvc::context::ResponseWriter;
/// use rttp_mvc::StatusCode;
///
/// let mut writer = ResponseWriter::new();
/// writer.bad_request("Unable to verify your data submission.");
/// writer.set_body("ignored");
///
/// let response = writer.into_response();
/// assert_eq!(response.status(), StatusCode::BadRequest);
/// assert_eq!(response.body_text(), "Bad Request: Unable to verify your data submission.");
/// ```
#[derive(Debug)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: Headers,
    body: Vec<u8>,
    committed: bool,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self {
            status: StatusCode::Ok,
            headers: Headers::new(),
            body: Vec::new(),
            committed: false,
        }
    }

    fn writable(&self, what: &str) -> bool {
        if self.committed {
            tracing::debug!(write = what, "response already sent, ignoring write");
        }
        !self.committed
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        if self.writable("status") {
            self.status = status;
        }
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Replace any existing values of `name`.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        if self.writable("header") {
            self.headers.set(name, value);
        }
    }

    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        if self.writable("header") {
            self.headers.insert(name, value);
        }
    }

    /// Append a `Set-Cookie` header. Accepted after commit.
    pub fn set_cookie(&mut self, cookie: impl Into<String>) {
        self.headers.insert("Set-Cookie", cookie);
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        if self.writable("body") {
            self.body = body.into();
        }
    }

    pub fn append_body(&mut self, chunk: &str) {
        if self.writable("body") {
            self.body.extend_from_slice(chunk.as_bytes());
        }
    }

    pub fn set_html_header(&mut self) {
        self.set_header("Content-Type", "text/html; charset=utf-8");
    }

    pub fn set_json_header(&mut self) {
        self.set_header("Content-Type", "application/json; charset=utf-8");
    }

    pub fn set_jsonp_header(&mut self) {
        self.set_header("Content-Type", "application/javascript; charset=utf-8");
    }

    pub fn set_xml_header(&mut self) {
        self.set_header("Content-Type", "application/xml; charset=utf-8");
    }

    /// Commit the response. Later calls do nothing.
    pub fn send(&mut self) {
        self.committed = true;
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    // Status plus "<reason>: <detail>", then commit.
    fn fail(&mut self, status: StatusCode, detail: &str) {
        if self.writable("error") {
            self.status = status;
            self.body = format!("{}: {detail}", status.canonical_reason()).into_bytes();
            self.committed = true;
        }
    }

    pub fn bad_request(&mut self, detail: &str) {
        self.fail(StatusCode::BadRequest, detail);
    }

    pub fn forbidden(&mut self, detail: &str) {
        self.fail(StatusCode::Forbidden, detail);
    }

    pub fn not_found(&mut self, detail: &str) {
        self.fail(StatusCode::NotFound, detail);
    }

    pub fn internal_server_error(&mut self, detail: &str) {
        self.fail(StatusCode::InternalServerError, detail);
    }

    /// `302 Found` to `url`, then commit.
    pub fn redirect(&mut self, url: &str) {
        if self.writable("redirect") {
            self.status = StatusCode::Found;
            self.headers.set("Location", url);
            self.committed = true;
        }
    }

    /// Build the wire response.
    pub fn into_response(self) -> Response {
        let mut response = Response::new(self.status);
        for (name, value) in self.headers.iter() {
            response.add_header(name, value);
        }
        response.body_bytes(self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_is_idempotent_and_freezes_writes() {
        let mut writer = ResponseWriter::new();
        writer.set_body("first");
        writer.send();
        writer.send();
        writer.set_status(StatusCode::NotFound);
        writer.set_body("second");
        writer.set_header("X-Late", "1");
        assert!(writer.is_committed());
        assert_eq!(writer.status(), StatusCode::Ok);
        assert_eq!(writer.body(), b"first");
        assert!(!writer.headers().contains("x-late"));
    }

    #[test]
    fn cookies_survive_commit() {
        let mut writer = ResponseWriter::new();
        writer.forbidden("nope");
        writer.set_cookie("SID=1");
        let response = writer.into_response();
        assert_eq!(response.status(), StatusCode::Forbidden);
        assert_eq!(response.headers().get("set-cookie"), Some("SID=1"));
    }

    #[test]
    fn redirect_sets_location() {
        let mut writer = ResponseWriter::new();
        writer.redirect("/login");
        let response = writer.into_response();
        assert_eq!(response.status(), StatusCode::Found);
        assert_eq!(response.headers().get("location"), Some("/login"));
    }

    #[test]
    fn first_error_wins() {
        let mut writer = ResponseWriter::new();
        writer.not_found("missing");
        writer.internal_server_error("boom");
        assert_eq!(writer.status(), StatusCode::NotFound);
        assert_eq!(writer.body(), b"Not Found: missing");
    }
}
