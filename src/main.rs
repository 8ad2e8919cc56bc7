use jitter_ticker::run_demo;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let mut config_path: Option<String> = None;
    while let Some(arg) = args.next() {
        if arg == "--config" {
            config_path = args.next();
        }
    }
    run_demo(config_path.as_deref()).await
}
