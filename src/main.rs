/*!
 * lanebench CLI
 *
 * Thin shell around the library: parse argv, initialize logging, hand a
 * validated configuration to the harness, map errors to exit codes.
 */

use lanebench::error::{Result, EXIT_SUCCESS};
use lanebench::harness::Harness;
use lanebench::{config, logging};

fn main() {
    let code = match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            tracing::error!(category = %e.category(), "run aborted: {}", e);
            eprintln!("lanebench: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    logging::init()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let parsed = config::parse_args(&args)?;
    for warning in &parsed.warnings {
        eprintln!("{}", warning);
    }

    let harness = Harness::new(parsed.config);
    harness.run()?;
    Ok(())
}
