//! Capturing where a request-time panic happened.
//!
//! A process-wide panic hook records the panic location in a thread-local slot
//! before the unwind reaches the dispatch boundary. The boundary then reads the
//! slot on the same thread. The previous hook still runs.
//!
//! Whether a backtrace is captured is decided per request: [`capturing`] turns it
//! on for the thread only while it polls the wrapped future.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::future::{Future, poll_fn};
use std::panic;
use std::pin::pin;
use std::sync::Once;

static INSTALL: Once = Once::new();

thread_local! {
    static LAST_FAULT: RefCell<Option<FaultSite>> = const { RefCell::new(None) };
    static CAPTURE_BACKTRACE: Cell<bool> = const { Cell::new(false) };
}

/// Where a panic was raised.
#[derive(Debug, Clone, Default)]
pub(crate) struct FaultSite {
    pub location: Option<String>,
    pub backtrace: Option<String>,
}

/// Install the recording hook once per process.
pub(crate) fn install_hook() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map(|l| format!("{}:{}", l.file(), l.line()));
            let backtrace = CAPTURE_BACKTRACE
                .get()
                .then(|| Backtrace::force_capture().to_string());
            LAST_FAULT.with(|slot| {
                *slot.borrow_mut() = Some(FaultSite { location, backtrace });
            });
            previous(info);
        }));
    });
}

/// Restores the thread's capture flag, also when the poll unwinds.
struct Restore(bool);

impl Drop for Restore {
    fn drop(&mut self) {
        CAPTURE_BACKTRACE.set(self.0);
    }
}

/// Drive `fut`, recording a backtrace for any panic it raises when `backtrace`
/// is set.
pub(crate) async fn capturing<F: Future>(fut: F, backtrace: bool) -> F::Output {
    let mut fut = pin!(fut);
    poll_fn(|cx| {
        let _restore = Restore(CAPTURE_BACKTRACE.replace(backtrace));
        fut.as_mut().poll(cx)
    })
    .await
}

/// Take whatever the hook recorded on this thread.
pub(crate) fn take_site() -> FaultSite {
    LAST_FAULT
        .with(|slot| slot.borrow_mut().take())
        .unwrap_or_default()
}

/// The message a panic was raised with.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_from_common_payloads() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }

    async fn explode() {
        panic!("request failed")
    }

    #[test]
    fn hook_records_location() {
        install_hook();
        let result = panic::catch_unwind(|| -> u8 { panic!("recorded") });
        assert!(result.is_err());
        let site = take_site();
        assert!(site.location.unwrap().contains("fault.rs"));
        assert!(take_site().location.is_none());
    }

    #[tokio::test]
    async fn backtrace_only_where_requested() {
        use futures_util::FutureExt;
        use std::panic::AssertUnwindSafe;

        install_hook();
        let result = AssertUnwindSafe(capturing(explode(), true)).catch_unwind().await;
        assert!(result.is_err());
        let site = take_site();
        assert!(site.location.is_some());
        assert!(site.backtrace.is_some());
        assert!(!CAPTURE_BACKTRACE.get());

        let result = AssertUnwindSafe(capturing(explode(), false)).catch_unwind().await;
        assert!(result.is_err());
        let site = take_site();
        assert!(site.location.unwrap().contains("fault.rs"));
        assert!(site.backtrace.is_none());
    }

    #[tokio::test]
    async fn capturing_passes_the_output_through() {
        assert_eq!(capturing(async { 7 }, true).await, 7);
        assert!(!CAPTURE_BACKTRACE.get());
    }
}
