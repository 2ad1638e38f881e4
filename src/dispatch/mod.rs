//! Request dispatch: one controller lifecycle per matched request.
//!
//! ```text
//! Created → Initialized → BeforeAction → [ActionInvoked] → ResponseFinalized
//! ```
//!
//! - **Created**: a fresh `C::default()`; nothing is shared with other requests.
//! - **Initialized**: session loaded, CSRF token computed and checked. A failure
//!   commits an error response.
//! - **BeforeAction**: [`Controller::before_action`] always runs and may veto the
//!   action. The action is also skipped when the response is already committed,
//!   so a rejected submission never reaches it.
//! - **ActionInvoked**: path parameters are coerced to the action's signature.
//!   An invalid value is a `500`.
//! - **ResponseFinalized**: [`Controller::before_response`] always runs, the session
//!   is saved and the response is committed once.
//!
//! A panic anywhere in the lifecycle is caught here and rendered as a `500` by the
//! application's [`ErrorHandler`]. Other requests are unaffected.

mod errors;
mod fault;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::Instrument;

use crate::context::{Context, Stage};
use crate::controller::{Action, Controller};
use crate::discovery::RouteDescriptor;
use crate::host::AppState;
use crate::http::{Request, Response};
use crate::router::{Handler, PathParams, handler};

pub use errors::{ErrorHandler, ErrorReport, HtmlErrorHandler};
pub(crate) use fault::install_hook as install_panic_hook;

/// Bind one route descriptor of `C` to a router handler.
pub(crate) fn route_handler<C: Controller>(
    state: Arc<AppState>,
    descriptor: Arc<RouteDescriptor>,
    action: Action<C>,
) -> Handler {
    let action = Arc::new(action);
    handler(move |request: Request, params: PathParams| {
        let state = Arc::clone(&state);
        let descriptor = Arc::clone(&descriptor);
        let action = Arc::clone(&action);
        async move { dispatch(state, descriptor, &action, request, params).await }
    })
}

/// Run the full lifecycle for one request, containing any panic.
pub async fn dispatch<C: Controller>(
    state: Arc<AppState>,
    descriptor: Arc<RouteDescriptor>,
    action: &Action<C>,
    request: Request,
    params: PathParams,
) -> Response {
    let span = tracing::info_span!(
        "dispatch",
        controller = %descriptor.controller.full_name,
        action = %descriptor.raw_action_name,
        method = %request.method(),
        path = %request.path(),
    );
    let fallback_request = request.clone();

    let backtrace = state.config().is_development();
    let run = lifecycle(Arc::clone(&state), descriptor, action, request, params);
    let outcome = AssertUnwindSafe(fault::capturing(run, backtrace))
        .catch_unwind()
        .instrument(span.clone())
        .await;

    match outcome {
        Ok(response) => response,
        Err(payload) => {
            let site = fault::take_site();
            let message = fault::panic_message(payload.as_ref());
            tracing::error!(
                parent: &span,
                panic = %message,
                location = site.location.as_deref().unwrap_or("unknown"),
                "request handler panicked"
            );
            let report = ErrorReport::fault(message, site.location, site.backtrace, state.config().mode);
            state.errors().handle(&fallback_request, &report)
        }
    }
}

async fn lifecycle<C: Controller>(
    state: Arc<AppState>,
    descriptor: Arc<RouteDescriptor>,
    action: &Action<C>,
    request: Request,
    params: PathParams,
) -> Response {
    let mut controller = C::default();
    let mut ctx = Context::new(request, params, descriptor, Arc::clone(&state));

    ctx.initialize().await;

    let mut failure = None;
    ctx.advance(Stage::BeforeAction);
    let proceed = controller.before_action(&mut ctx).await;
    if !proceed {
        tracing::debug!("before_action declined, skipping action");
    } else if ctx.response().is_committed() {
        tracing::debug!(
            status = ctx.response().status().as_u16(),
            "response already committed, skipping action"
        );
    } else {
        ctx.advance(Stage::ActionInvoked);
        let params = ctx.params().clone();
        if let Err(err) = action.invoke(&mut controller, &mut ctx, &params).await {
            tracing::error!(error = %err, "action failed");
            failure = Some(err);
        }
    }

    ctx.advance(Stage::ResponseFinalized);
    controller.before_response(&mut ctx).await;
    ctx.save_session().await;
    ctx.response_mut().send();

    let Some(err) = failure else {
        return ctx.into_response();
    };

    let report = ErrorReport::fault(err.to_string(), None, None, state.config().mode);
    let mut response = state.errors().handle(ctx.request(), &report);
    for cookie in ctx.response().headers().get_all("set-cookie") {
        response.add_header("Set-Cookie", cookie);
    }
    response
}
