#[tokio::main]
async fn main() {
    emotix_server::start_server().await;
}
