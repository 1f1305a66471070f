use std::future::Future;
use std::panic;
use std::thread;

use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

use crate::error::PrefResult;

/// Drive `future` to completion from synchronous code.
///
/// - Outside any runtime: on a private current-thread runtime.
/// - On a multi-thread runtime worker: in place, via `block_in_place`.
/// - On a current-thread runtime: on a helper thread with its own runtime,
///   since the calling thread is the only one that could drive the future.
pub(crate) fn run_blocking<F>(future: F) -> PrefResult<F::Output>
where
    F: Future + Send,
    F::Output: Send,
{
    match Handle::try_current() {
        Err(_) => Ok(private_runtime()?.block_on(future)),
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            Ok(tokio::task::block_in_place(|| handle.block_on(future)))
        }
        Ok(_) => thread::scope(|scope| {
            let worker = scope.spawn(move || -> PrefResult<F::Output> {
                Ok(private_runtime()?.block_on(future))
            });
            match worker.join() {
                Ok(output) => output,
                Err(payload) => panic::resume_unwind(payload),
            }
        }),
    }
}

fn private_runtime() -> PrefResult<Runtime> {
    Ok(Builder::new_current_thread().enable_all().build()?)
}
