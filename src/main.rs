use std::process;

#[tokio::main]
async fn main() {
    let verbose = std::env::args().any(|arg| arg == "--verbose" || arg == "-v");
    init_logging(verbose);

    let result = conoha_vps::cli::run().await;

    if let Err(e) = result {
        // a closed prompt is not a failure
        if !matches!(e, conoha_vps::PanelError::Cancelled) {
            eprintln!("Error: {}", e);
            for hint in e.suggestions() {
                eprintln!("  hint: {}", hint);
            }
        }
        process::exit(e.exit_code());
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = if verbose {
        EnvFilter::new("debug")
            .add_directive("hyper=info".parse().expect("static directive"))
            .add_directive("reqwest=info".parse().expect("static directive"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
