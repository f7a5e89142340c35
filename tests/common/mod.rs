use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

/// `(method, path-with-query)` of every request the server answered.
pub type Seen = Arc<Mutex<Vec<(String, String)>>>;

pub struct FakeLinkding {
    pub base_url: String,
    pub seen: Seen,
}

type Route = dyn Fn(&str, &str, &str) -> (u16, &'static str, String) + Send + Sync;

impl FakeLinkding {
    /// `route(method, target, base_url)` returns `(status, content_type, body)`.
    pub fn start<F>(route: F) -> Self
    where
        F: Fn(&str, &str, &str) -> (u16, &'static str, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake linkding");
        let base_url = format!("http://{}", listener.local_addr().expect("addr"));
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let route: Arc<Route> = Arc::new(route);
        let base: Arc<str> = Arc::from(base_url.as_str());

        let seen_by_server = Arc::clone(&seen);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let route = Arc::clone(&route);
                let seen = Arc::clone(&seen_by_server);
                let base = Arc::clone(&base);
                thread::spawn(move || handle(stream, route.as_ref(), &seen, &base));
            }
        });

        Self { base_url, seen }
    }

    pub fn requests(&self) -> Vec<(String, String)> {
        self.seen.lock().expect("seen lock").clone()
    }
}

fn handle(stream: TcpStream, route: &Route, seen: &Mutex<Vec<(String, String)>>, base: &str) {
    let Ok(read_half) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(read_half);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).is_err() {
            return;
        }
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':')
            && name.trim().eq_ignore_ascii_case("content-length")
        {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }
    let mut body = vec![0u8; content_length];
    let _ = reader.read_exact(&mut body);

    let (status, content_type, payload) = route(&method, &target, base);
    seen.lock()
        .expect("seen lock")
        .push((method.clone(), target.clone()));

    let mut stream = stream;
    let head = format!(
        "HTTP/1.1 {status} Fake\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
        payload.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(payload.as_bytes());
    let _ = stream.flush();
}
