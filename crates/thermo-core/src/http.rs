//! HTTP handling for the status endpoint
//!
//! Only the request line is interpreted. `GET /` answers with the status page,
//! every other request gets an empty `404 Not Found`.

use core::fmt::{self, Write};
use core::net::Ipv4Addr;

use heapless::String;
use thiserror_no_std::Error;

use crate::app_state::Temperature;

/// Upper bound for a complete serialized response (headers and body).
pub const MAX_RESPONSE_LEN: usize = 1536;

pub type Response = String<MAX_RESPONSE_LEN>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    #[error("request is not valid UTF-8")]
    NotUtf8,
    #[error("malformed request line")]
    MalformedRequestLine,
    #[error("response does not fit in {0} bytes")]
    ResponseTooLarge(usize),
}

/// The parts of a request line the router cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub method: &'a str,
    /// Request target with any query string removed.
    pub path: &'a str,
    pub version: &'a str,
}

impl<'a> RequestLine<'a> {
    /// Parse the first line of a raw request head.
    pub fn parse(raw: &'a [u8]) -> Result<Self, HttpError> {
        let head = core::str::from_utf8(raw).map_err(|_| HttpError::NotUtf8)?;
        let line = head.split("\r\n").next().unwrap_or_default();

        let mut parts = line.split(' ').filter(|p| !p.is_empty());
        let (Some(method), Some(target), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(HttpError::MalformedRequestLine);
        };

        if !version.starts_with("HTTP/") {
            return Err(HttpError::MalformedRequestLine);
        }

        let path = target.split(['?', '#']).next().unwrap_or(target);

        Ok(Self {
            method,
            path,
            version,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Status,
    NotFound,
}

impl Route {
    pub fn resolve(request: &RequestLine<'_>) -> Self {
        match (request.method, request.path) {
            ("GET", "/") => Route::Status,
            _ => Route::NotFound,
        }
    }

    const fn status_line(self) -> &'static str {
        match self {
            Route::Status => "200 OK",
            Route::NotFound => "404 Not Found",
        }
    }
}

/// Values interpolated into the status page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusPage {
    pub temperature: Temperature,
    pub address: Ipv4Addr,
}

impl StatusPage {
    pub const fn new(temperature: Temperature, address: Ipv4Addr) -> Self {
        Self {
            temperature,
            address,
        }
    }
}

impl fmt::Display for StatusPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(concat!(
            "<!DOCTYPE html>",
            "<html>",
            "<head>",
            "<meta charset='UTF-8'>",
            "<meta name='viewport' content='width=device-width, initial-scale=1.0'>",
            "<title>ESP32 Temperature</title>",
            "<style>",
            "body { font-family: Arial, sans-serif; text-align: center; margin: 50px; }",
            "h1 { color: #4CAF50; }",
            "p { font-size: 20px; }",
            "</style>",
            "</head>",
            "<body>",
            "<h1>Temperature Reading</h1>",
        ))?;
        write!(f, "<p>Current temperature: {} &deg;C</p>", self.temperature)?;
        write!(f, "<p>IP address: {}</p>", self.address)?;
        f.write_str("</body></html>")
    }
}

/// Serialize the full response for `route`.
pub fn respond(route: Route, page: &StatusPage) -> Result<Response, HttpError> {
    let mut body = String::<MAX_RESPONSE_LEN>::new();
    if route == Route::Status {
        write!(body, "{}", page).map_err(|_| HttpError::ResponseTooLarge(MAX_RESPONSE_LEN))?;
    }

    let content_type = match route {
        Route::Status => "text/html",
        Route::NotFound => "text/plain",
    };

    let mut response = Response::new();
    write!(
        response,
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        route.status_line(),
        content_type,
        body.len(),
        body
    )
    .map_err(|_| HttpError::ResponseTooLarge(MAX_RESPONSE_LEN))?;

    Ok(response)
}

/// Parse, route and answer one raw request head.
pub fn handle(raw: &[u8], page: &StatusPage) -> Result<(Route, Response), HttpError> {
    let request = RequestLine::parse(raw)?;
    let route = Route::resolve(&request);
    respond(route, page).map(|response| (route, response))
}
