use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Exit status after a forced quit, as for a process killed by SIGINT.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Turns operator interrupts into cancellation.
///
/// The first signal cancels `cancel` so the run can wind down and clean up. A
/// second one calls `force_exit`, leaving whatever cleanup is still pending.
/// Stops listening as soon as `next_signal` fails.
pub async fn relay_interrupts<F, Fut>(
    mut next_signal: F,
    cancel: CancellationToken,
    force_exit: impl FnOnce(),
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if next_signal().await.is_err() {
        return;
    }

    warn!("interrupted, cleaning up before exiting (interrupt again to quit now)");
    cancel.cancel();

    if next_signal().await.is_err() {
        return;
    }

    warn!("interrupted again, exiting without finishing cleanup");
    force_exit();
}
