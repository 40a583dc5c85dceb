mod app;

fn main() -> anyhow::Result<()> {
    // Initialize the logger
    env_logger::init();
    log::info!("Starting Docuery");

    // One cooperative event loop, like the page it replaces
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(app::app_main())
}
