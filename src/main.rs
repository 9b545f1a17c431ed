#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = exam_allocator::run().await {
        eprintln!("exam-allocator fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
