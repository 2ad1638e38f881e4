//! Error pages for 404, 405 and 500 responses.

use crate::config::Mode;
use crate::http::{Request, Response, StatusCode};

/// What went wrong, as handed to an [`ErrorHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub status: StatusCode,
    /// The fault message, or the status reason when there is nothing more specific.
    pub message: String,
    /// `file:line` of the fault, when known.
    pub location: Option<String>,
    pub backtrace: Option<String>,
    pub mode: Mode,
}

impl ErrorReport {
    /// A report carrying only a status, as used for 404 and 405.
    pub fn status(status: StatusCode, mode: Mode) -> Self {
        Self {
            status,
            message: status.canonical_reason().to_owned(),
            location: None,
            backtrace: None,
            mode,
        }
    }

    /// A `500` for a fault raised while dispatching.
    pub fn fault(
        message: impl Into<String>,
        location: Option<String>,
        backtrace: Option<String>,
        mode: Mode,
    ) -> Self {
        Self {
            status: StatusCode::InternalServerError,
            message: message.into(),
            location,
            backtrace,
            mode,
        }
    }
}

/// Renders error responses. Replace it to customise error pages.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, request: &Request, report: &ErrorReport) -> Response;
}

/// The default handler: a small HTML page. Development mode adds the message,
/// location and stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlErrorHandler;

impl ErrorHandler for HtmlErrorHandler {
    fn handle(&self, _request: &Request, report: &ErrorReport) -> Response {
        let reason = report.status.canonical_reason();
        let mut body = format!("<h1>{} {reason}</h1>", report.status.as_u16());

        if report.mode == Mode::Development {
            body.push_str("<hr>");
            if let Some(location) = &report.location {
                body.push_str(&format!(r#"<div class="info">{}</div><br>"#, escape_html(location)));
            }
            body.push_str(&format!(r#"<div class="info">{}</div>"#, escape_html(&report.message)));
            if let Some(backtrace) = &report.backtrace {
                body.push_str(r#"<br><hr><h2>STACK INFO:</h2><hr><pre class="stack">"#);
                body.push_str(&escape_html(backtrace));
                body.push_str("</pre>");
            }
        }

        let page = format!(
            "<html>\n<head>\n<title>{reason}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{body}\n</body>\n</html>\n"
        );
        Response::new(report.status)
            .header("Content-Type", "text/html; charset=utf-8")
            .body(page)
    }
}

const STYLE: &str = "h1,h2{text-align:center}\
hr{border:1px dotted;color:rgba(3,169,244,.12);clear:both}\
.info{color:red;font-weight:bold;text-align:center}\
.stack{margin:20px 30px}";

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> Request {
        Request::parse(b"GET /x HTTP/1.1\r\nHost: a\r\n\r\n").unwrap().0
    }

    #[test]
    fn production_hides_details() {
        let report = ErrorReport::fault(
            "database password is hunter2",
            Some("src/post.rs:10".into()),
            Some("frame 0".into()),
            Mode::Production,
        );
        let response = HtmlErrorHandler.handle(&request(), &report);
        let body = response.body_text();
        assert_eq!(response.status(), StatusCode::InternalServerError);
        assert!(body.contains("<h1>500 Internal Server Error</h1>"));
        assert!(!body.contains("hunter2"));
        assert!(!body.contains("STACK INFO"));
    }

    #[test]
    fn development_shows_escaped_details() {
        let report = ErrorReport::fault(
            "bad <input>",
            Some("src/post.rs:10".into()),
            Some("frame 0".into()),
            Mode::Development,
        );
        let body = HtmlErrorHandler.handle(&request(), &report).body_text();
        assert!(body.contains("bad &lt;input&gt;"));
        assert!(body.contains("src/post.rs:10"));
        assert!(body.contains("STACK INFO"));
    }

    #[test]
    fn status_report_uses_reason() {
        let report = ErrorReport::status(StatusCode::NotFound, Mode::Production);
        assert_eq!(report.message, "Not Found");
        let response = HtmlErrorHandler.handle(&request(), &report);
        assert_eq!(response.status(), StatusCode::NotFound);
        assert_eq!(
            response.headers().get("content-type"),
            Some("text/html; charset=utf-8")
        );
    }
}
