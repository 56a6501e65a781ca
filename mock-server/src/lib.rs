//! Local stand-in for the parts of httpbin.org the client is tested against.
//!
//! Every endpoint answers the way httpbin does closely enough for substring
//! and status assertions: echo endpoints return JSON with `args`, `headers`,
//! `data`, `json`, `method` and `url`; auth endpoints return 401 on bad
//! credentials; `/status/{code}` returns that code.

use std::collections::BTreeMap;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Query},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{any, delete, get, patch, post, put},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

pub const EXAMPLE_PAGE: &str = r#"<!doctype html>
<html>
<head><title>Example Domain</title></head>
<body>
<div>
    <h1>Example Domain</h1>
    <p>This domain is for use in illustrative examples in documents.</p>
</div>
</body>
</html>
"#;

pub const TEAPOT: &str = r#"
    -=[ teapot ]=-

       _...._
     .'  _ _ `.
    | ."` ^ `". _,
    \_;`"---"`|//
      |       ;/
      \_     _/
        `"""`
"#;

/// Echo payload returned by `/get`, `/post`, `/anything` and friends.
#[derive(Debug, Serialize)]
pub struct Echo {
    pub args: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub data: String,
    pub json: Value,
    pub method: String,
    pub url: String,
}

/// JSON body with every non-ASCII character written as a `\uXXXX` escape,
/// the way httpbin (Python `json.dumps`) renders echoes.
pub struct AsciiJson<T>(pub T);

impl<T: Serialize> IntoResponse for AsciiJson<T> {
    fn into_response(self) -> Response {
        match to_ascii_json(&self.0) {
            Ok(bytes) => ([(header::CONTENT_TYPE, "application/json")], bytes).into_response(),
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        }
    }
}

pub fn to_ascii_json<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, AsciiEscape);
    value.serialize(&mut ser)?;
    Ok(out)
}

struct AsciiEscape;

impl Formatter for AsciiEscape {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}

pub fn app() -> Router {
    Router::new()
        .route("/html", get(html))
        .route("/status/{code}", any(status))
        .route("/get", get(echo))
        .route("/post", post(echo))
        .route("/put", put(echo))
        .route("/patch", patch(echo))
        .route("/delete", delete(echo))
        .route("/anything", any(echo))
        .route("/anything/{*rest}", any(echo))
        .route("/headers", get(headers))
        .route("/bearer", get(bearer))
        .route("/basic-auth/{user}/{passwd}", get(basic_auth))
        .route("/redirect/{n}", get(redirect))
        .route("/delay/{secs}", any(delay))
        .route("/uuid", get(uuid))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Bind an ephemeral port on 127.0.0.1 and serve `app()` from a background
/// thread with its own current-thread runtime. Returns the bound address.
pub fn spawn() -> Result<SocketAddr, std::io::Error> {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = std_listener.local_addr()?;
    std_listener.set_nonblocking(true)?;
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    std::thread::Builder::new()
        .name("mock-server".to_string())
        .spawn(move || {
            let served = rt.block_on(async {
                let listener = TcpListener::from_std(std_listener)?;
                run(listener).await
            });
            if let Err(e) = served {
                eprintln!("mock server stopped: {e}");
            }
        })?;

    Ok(addr)
}

async fn html() -> Html<&'static str> {
    Html(EXAMPLE_PAGE)
}

async fn status(Path(code): Path<u16>) -> Response {
    let Ok(status) = StatusCode::from_u16(code) else {
        return (StatusCode::BAD_REQUEST, "invalid status code").into_response();
    };
    if status == StatusCode::IM_A_TEAPOT {
        return (status, TEAPOT).into_response();
    }
    status.into_response()
}

async fn echo(
    method: Method,
    uri: Uri,
    Query(args): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> AsciiJson<Echo> {
    let data = String::from_utf8_lossy(&body).into_owned();
    let json = serde_json::from_str(&data).unwrap_or(Value::Null);
    AsciiJson(Echo {
        args,
        headers: flatten_headers(&headers),
        data,
        json,
        method: method.to_string(),
        url: uri.to_string(),
    })
}

async fn headers(headers: HeaderMap) -> AsciiJson<Value> {
    AsciiJson(json!({ "headers": flatten_headers(&headers) }))
}

async fn bearer(headers: HeaderMap) -> Response {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match token {
        Some(token) => Json(json!({ "authenticated": true, "token": token })).into_response(),
        None => unauthorized("Bearer"),
    }
}

async fn basic_auth(Path((user, passwd)): Path<(String, String)>, headers: HeaderMap) -> Response {
    let supplied = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .and_then(|b64| STANDARD.decode(b64).ok())
        .and_then(|raw| String::from_utf8(raw).ok());
    if supplied.as_deref() == Some(format!("{user}:{passwd}").as_str()) {
        Json(json!({ "authenticated": true, "user": user })).into_response()
    } else {
        unauthorized("Basic realm=\"Fake Realm\"")
    }
}

async fn redirect(Path(n): Path<u32>) -> Redirect {
    if n <= 1 {
        Redirect::to("/get")
    } else {
        Redirect::to(&format!("/redirect/{}", n - 1))
    }
}

async fn delay(Path(secs): Path<u64>) -> Json<Value> {
    let secs = secs.min(10);
    tokio::time::sleep(Duration::from_secs(secs)).await;
    Json(json!({ "delayed": secs }))
}

async fn uuid() -> Json<Value> {
    Json(json!({ "uuid": Uuid::new_v4() }))
}

fn unauthorized(challenge: &'static str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, challenge)],
    )
        .into_response()
}

/// Title-case header names and join repeated values with ", ", as httpbin does.
fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        out.entry(title_case(name.as_str()))
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    out
}

fn title_case(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
