#[tokio::main]
async fn main() -> anyhow::Result<()> {
    daybook_lib::run().await
}
