#![allow(dead_code)]

extern crate lostfound;

use bytes::Bytes;
use lostfound::command_line_interface::CliOptions;
use lostfound::database_api;
use lostfound::database_init;
use lostfound::signed_cookie::CookieSigner;
use lostfound::warp_api;
use lostfound::warp_endpoints::AppState;
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use structopt::StructOpt;
use warp::test::RequestBuilder;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

const BOUNDARY: &str = "----lostfound-test-boundary";

/// A server state backed by a fresh database file and uploads directory,
/// both removed again when the value is dropped.
pub struct TestApp {
    pub dir: PathBuf,
    pub state: Arc<AppState>,
}

impl TestApp {
    /// Same upload limit as a server started without options.
    pub fn new() -> TestApp {
        let defaults = CliOptions::from_iter_safe(&["lostfound"]).expect("Failed to parse defaults");
        TestApp::with_max_upload(defaults.max_upload_bytes)
    }

    pub fn with_max_upload(max_upload_bytes: u64) -> TestApp {
        let dir = std::env::temp_dir().join(format!(
            "lostfound-test-{}",
            rand::thread_rng().gen::<u64>()
        ));
        let pool = database_init::init(&dir.join("lost_and_found.db"))
            .expect("Failed to initialize test database");
        let state = AppState {
            pool,
            uploads_dir: dir.join("uploads"),
            signer: CookieSigner::new(b"test-secret-key"),
            max_upload_bytes,
        };
        TestApp {
            dir,
            state: Arc::new(state),
        }
    }

    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        warp_api::routes(self.state.clone())
    }

    pub fn count(&self) -> i64 {
        let conn = self.state.pool.get().unwrap();
        database_api::count_items(&conn).unwrap()
    }

    pub fn items(&self) -> Vec<database_api::Item> {
        let conn = self.state.pool.get().unwrap();
        database_api::list_items(&conn).unwrap()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

pub fn sample_item() -> Vec<(&'static str, &'static str)> {
    vec![
        ("title", "Test Lost iPhone"),
        ("description", "Black iPhone 13 with cracked screen"),
        ("category", "Electronics"),
        ("location", "Library 2nd Floor"),
        ("contact", "test@example.com"),
    ]
}

pub fn with_field(
    mut fields: Vec<(&'static str, &'static str)>,
    name: &str,
    value: &'static str,
) -> Vec<(&'static str, &'static str)> {
    for field in fields.iter_mut() {
        if field.0 == name {
            field.1 = value;
        }
    }
    fields
}

/// `multipart/form-data` POST to `/post`, as a browser would send the post form.
pub fn post_request(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> RequestBuilder {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    warp::test::request()
        .method("POST")
        .path("/post")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(body)
}

/// `application/x-www-form-urlencoded` POST to `/post`.
/// Only spaces are encoded, the sample values need nothing else.
pub fn post_urlencoded_request(fields: &[(&str, &str)]) -> RequestBuilder {
    let body = fields
        .iter()
        .map(|(name, value)| format!("{}={}", name, value.replace(' ', "+")))
        .collect::<Vec<_>>()
        .join("&");
    warp::test::request()
        .method("POST")
        .path("/post")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(body)
}

/// `application/x-www-form-urlencoded` POST to `/delete`.
pub fn delete_request(item_id: &str, deletion_code: &str) -> RequestBuilder {
    warp::test::request()
        .method("POST")
        .path("/delete")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(format!("item_id={}&deletion_code={}", item_id, deletion_code))
}

/// GET `path`, optionally sending a cookie in `name=value` form.
pub fn get_request(path: &str, cookie: Option<&str>) -> RequestBuilder {
    let request = warp::test::request().method("GET").path(path);
    match cookie {
        Some(cookie) => request.header("cookie", cookie),
        None => request,
    }
}

/// The `name=value` part of the response's `Set-Cookie` header.
pub fn set_cookie(response: &warp::http::Response<Bytes>) -> Option<String> {
    let header = response.headers().get("set-cookie")?.to_str().ok()?;
    header.split(';').next().map(|pair| pair.trim().to_string())
}

pub fn location(response: &warp::http::Response<Bytes>) -> Option<String> {
    let header = response.headers().get("location")?.to_str().ok()?;
    Some(header.to_string())
}

pub fn body_text(response: &warp::http::Response<Bytes>) -> String {
    String::from_utf8_lossy(response.body()).to_string()
}
