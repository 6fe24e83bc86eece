use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use handstream_client::{DatagramConfig, DatagramReceiver};
use tracing::info;

use crate::cmd::{parse_duration, ListenArgs};
use crate::exit::{client_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS, TIMEOUT};
use crate::output::{print_pose, OutputFormat};

const POLL: Duration = Duration::from_millis(5);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let deadline = args
        .timeout
        .as_deref()
        .map(parse_duration)
        .transpose()?
        .map(|timeout| Instant::now() + timeout);

    let mut receiver = DatagramReceiver::open(DatagramConfig::new(args.port))
        .map_err(|err| client_error("bind failed", err))?;
    info!(port = receiver.port(), "listening for hand poses");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0u64;
    while running.load(Ordering::SeqCst) {
        if let Some(message) = receiver.poll() {
            printed = printed.saturating_add(1);
            print_pose(&message, "udp", printed, format);
            if args.count.is_some_and(|count| printed >= count) {
                break;
            }
            continue;
        }

        if !receiver.is_running() {
            return Err(CliError::new(FAILURE, "datagram receiver stopped"));
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(CliError::new(
                TIMEOUT,
                format!("timed out after {printed} pose(s)"),
            ));
        }

        std::thread::sleep(POLL);
    }

    receiver.close();
    Ok(SUCCESS)
}

pub(crate) fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
