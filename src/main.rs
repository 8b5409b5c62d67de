#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dockwidgets_lib::run().await
}
