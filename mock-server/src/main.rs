use tokio::net::TcpListener;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "8500".to_string());
    let addr = format!("127.0.0.1:{port}");

    let store = match std::env::var("CONSUL_ACL_TOKEN") {
        Ok(raw) => {
            let token = Uuid::parse_str(raw.trim())
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
            println!("ACL enabled, token required");
            mock_server::KvStore::with_acl(token)
        }
        Err(_) => mock_server::KvStore::new(),
    };

    let listener = TcpListener::bind(&addr).await?;
    println!("listening on {addr}");
    mock_server::run_with_store(listener, store).await
}
