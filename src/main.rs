#[tokio::main]
async fn main() {
    eurorace::start_server().await;
}
