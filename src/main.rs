//! release_bundler - build, zip and publish a native application release.

use release_bundler::cli;
use release_bundler::cli::RuntimeConfig;
use std::process;

#[tokio::main]
async fn main() {
    env_logger::init();

    match cli::run().await {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            cli::report_error(&RuntimeConfig::new(), &e);
            process::exit(1);
        }
    }
}
