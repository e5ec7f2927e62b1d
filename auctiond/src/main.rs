use auctiond::Cli;
use clap::Parser as _;

fn main() -> anyhow::Result<()> {
    // A `ProcessSandbox` worker re-execs this same binary with
    // `--sandbox-worker`; intercept that before doing anything else --
    // argument parsing, tracing init, or
    // building a Tokio runtime -- exactly as `auction_script_engine::sandbox`
    // documents. The worker speaks a length-prefixed frame protocol over its
    // own stdio and never touches the async runtime the rest of `main` uses.
    if std::env::args().any(|arg| arg == "--sandbox-worker") {
        #[cfg(feature = "sandbox")]
        {
            return auction_script_engine::sandbox::run_worker().map_err(Into::into);
        }
        #[cfg(not(feature = "sandbox"))]
        {
            anyhow::bail!(
                "received --sandbox-worker but this build was compiled without the \
                 `sandbox` feature"
            );
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(args.evaluate())
}
