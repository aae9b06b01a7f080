//! Ctrl-C handling
//!
//! The first interrupt sets the shared [`CancelFlag`]; the runner then kills
//! the in-flight Godot process and unwinds normally so the environment guard
//! can clean up. A second interrupt removes the run's addon symlink through
//! the shared [`LinkTeardown`] and exits immediately.

use stagehand_harness::{CancelFlag, LinkTeardown};
use std::thread;
use tracing::{debug, warn};

/// Exit status used when a run is interrupted
pub const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Watch for Ctrl-C on a background thread
pub fn install(cancel: CancelFlag, teardown: LinkTeardown) {
    let spawned = thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!(error = %e, "could not start interrupt handler");
                    return;
                }
            };

            runtime.block_on(async {
                while tokio::signal::ctrl_c().await.is_ok() {
                    if cancel.is_cancelled() {
                        // exit() skips destructors, so the guard cannot clean up
                        teardown.run();
                        std::process::exit(i32::from(INTERRUPTED_EXIT_CODE));
                    }
                    debug!("interrupt received, cancelling run");
                    cancel.cancel();
                }
            });
        });

    if let Err(e) = spawned {
        warn!(error = %e, "could not spawn interrupt handler thread");
    }
}
