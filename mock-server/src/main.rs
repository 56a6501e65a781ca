//! Run the httpbin stand-in on a fixed address for manual testing of C
//! callers, e.g. `cargo run -p mock-server -- 127.0.0.1:8080`.

use std::net::SocketAddr;

use tokio::net::TcpListener;

const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let raw = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("MOCK_SERVER_ADDR").ok())
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());
    let addr: SocketAddr = raw
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("{raw}: {e}")))?;

    let listener = TcpListener::bind(addr).await?;
    println!("httpbin stand-in listening on http://{}", listener.local_addr()?);
    mock_server::run(listener).await
}
