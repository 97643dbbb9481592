use std::io::Write as _;

use clap::Parser;
use miette::{IntoDiagnostic as _, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use inspect_run::{
    cli::Cli,
    interrupt,
    runner::{self, AssessmentRunner, PollEvent, SystemClock},
    service::inspector::InspectorService,
};

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,inspect_run=debug"
    } else {
        "warn,inspect_run=info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn watch_for_interrupt(runtime: &tokio::runtime::Runtime) -> CancellationToken {
    let cancel = CancellationToken::new();

    runtime.spawn(interrupt::relay_interrupts(
        tokio::signal::ctrl_c,
        cancel.clone(),
        || std::process::exit(interrupt::FORCED_EXIT_CODE),
    ));

    cancel
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let config = cli.run_config()?;

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let cancel = watch_for_interrupt(&runtime);

    let service = InspectorService::connect(runtime.handle().clone(), config.region.as_deref());
    let clock = SystemClock::new();

    let progress = |event: PollEvent<'_>| {
        let mut stderr = std::io::stderr();
        let _ = match event {
            PollEvent::Tick(_) => write!(stderr, "."),
            PollEvent::Done => writeln!(stderr),
        };
        let _ = stderr.flush();
    };

    let mut runner = AssessmentRunner::new(&service, &clock, config)
        .with_cancellation(cancel)
        .with_progress(&progress);

    let mut stdout = std::io::stdout().lock();
    let cleanup = runner::execute(&mut runner, &mut stdout)?;

    if cleanup.failures.is_empty() {
        info!("done");
    } else {
        warn!(
            failures = cleanup.failures.len(),
            "some resources could not be cleaned up and must be deleted by hand"
        );
    }

    Ok(())
}
