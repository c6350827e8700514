//! Minimal HTTP/1.1 framing for the webhook endpoint: enough to read one
//! request off a socket buffer and write one response back.

use crate::engine::{HttpReply, SkillEngine, TEXT_CONTENT_TYPE};
use crate::verify::header_value;

const HEADER_END: &[u8] = b"\r\n\r\n";

/// What the socket loop should do with the bytes read so far.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completeness {
    NeedMore,
    Complete,
}

/// Request line and headers of one HTTP/1.1 request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
}

impl RequestHead {
    /// Parses the bytes before the blank line. `None` when the request line
    /// lacks a method or a target.
    pub fn parse(head: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(head);
        let mut lines = text.split("\r\n");
        let mut request_line = lines.next()?.split_whitespace();
        let method = request_line.next()?.to_string();
        let target = request_line.next()?.to_string();
        let headers = lines
            .filter_map(|line| {
                let (name, value) = line.split_once(':')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .collect();
        Some(Self { method, target, headers })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    pub fn content_length(&self) -> Option<usize> {
        self.header("Content-Length")?.parse().ok()
    }
}

/// Decides whether `buffer` holds a whole request: headers plus as many
/// body bytes as `Content-Length` announces.
pub fn request_completeness(buffer: &[u8]) -> Completeness {
    let Some(header_end) = find_header_end(buffer) else {
        return Completeness::NeedMore;
    };
    let body_len = buffer.len() - header_end - HEADER_END.len();
    match RequestHead::parse(&buffer[..header_end]).and_then(|head| head.content_length()) {
        Some(length) if body_len < length => Completeness::NeedMore,
        _ => Completeness::Complete,
    }
}

pub async fn handle_http_request(engine: &SkillEngine, request: &[u8]) -> Vec<u8> {
    let Some(header_end) = find_header_end(request) else {
        return build_error_response(400, "missing headers");
    };
    let Some(head) = RequestHead::parse(&request[..header_end]) else {
        return build_error_response(400, "invalid request line");
    };
    let body = &request[header_end + HEADER_END.len()..];
    let body = match head.content_length() {
        Some(length) if body.len() < length => {
            return build_error_response(400, "body incomplete");
        }
        Some(length) => &body[..length],
        None => body,
    };
    log::debug!("http: {} {} body_len={}", head.method, head.target, body.len());

    let reply = engine.handle(&head.method, &head.headers, body).await;
    build_response(&reply)
}

pub fn find_header_end(request: &[u8]) -> Option<usize> {
    request.windows(HEADER_END.len()).position(|window| window == HEADER_END)
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "HTTP/1.1 200 OK",
        400 => "HTTP/1.1 400 Bad Request",
        405 => "HTTP/1.1 405 Method Not Allowed",
        _ => "HTTP/1.1 500 Internal Server Error",
    }
}

pub fn build_response(reply: &HttpReply) -> Vec<u8> {
    let mut response = Vec::with_capacity(reply.body.len() + 128);
    response.extend_from_slice(status_line(reply.status).as_bytes());
    response.extend_from_slice(format!("\r\nContent-Type: {}\r\n", reply.content_type).as_bytes());
    response.extend_from_slice(format!("Content-Length: {}\r\n", reply.body.len()).as_bytes());
    if reply.status == 405 {
        response.extend_from_slice(b"Allow: POST\r\n");
    }
    response.extend_from_slice(b"Connection: close\r\n\r\n");
    response.extend_from_slice(&reply.body);
    response
}

pub fn build_error_response(status: u16, message: &str) -> Vec<u8> {
    build_response(&HttpReply {
        status,
        content_type: TEXT_CONTENT_TYPE,
        body: message.as_bytes().to_vec(),
    })
}
