//! The action table: raw action names bound to typed, invocable functions.

use std::fmt;
use std::sync::Arc;

use super::param::{ParamKind, RouteParam, extract};
use crate::BoxFuture;
use crate::DispatchError;
use crate::context::Context;
use crate::router::PathParams;

/// Future returned by an action.
pub type ActionFuture<'a> = BoxFuture<'a, Result<(), DispatchError>>;

pub(crate) type ErasedAction<C> = Arc<
    dyn for<'a> Fn(&'a mut C, &'a mut Context, &'a PathParams) -> ActionFuture<'a> + Send + Sync,
>;

// Pins the closure to the higher-ranked signature that `ErasedAction` needs.
fn erase<C, G>(g: G) -> ErasedAction<C>
where
    G: for<'a> Fn(&'a mut C, &'a mut Context, &'a PathParams) -> ActionFuture<'a>
        + Send
        + Sync
        + 'static,
{
    Arc::new(g)
}

fn fail<'a>(err: DispatchError) -> ActionFuture<'a> {
    Box::pin(std::future::ready(Err(err)))
}

/// Conversion from an action function to its erased form.
///
/// Implemented for functions taking the controller, the context and up to four
/// [`RouteParam`] arguments:
///
/// ```rust
/// use rttp_mvc::prelude::*;
///
/// #[derive(Default)]
/// struct PostController;
///
/// fn view<'a>(_c: &'a mut PostController, ctx: &'a mut Context, id: i64) -> ActionFuture<'a> {
///     Box::pin(async move {
///         ctx.render_text(format!("post {id}"));
///         Ok(())
///     })
/// }
///
/// let action = Action::new("ActionView", view);
/// assert_eq!(action.parameter_types().len(), 1);
/// ```
pub trait IntoAction<C, Args>: Send + Sync + 'static {
    fn parameter_types() -> Vec<ParamKind>;

    #[doc(hidden)]
    fn into_erased(self) -> ErasedAction<C>;
}

impl<C, F> IntoAction<C, ()> for F
where
    C: Send + 'static,
    F: for<'a> Fn(&'a mut C, &'a mut Context) -> ActionFuture<'a> + Send + Sync + 'static,
{
    fn parameter_types() -> Vec<ParamKind> {
        Vec::new()
    }

    fn into_erased(self) -> ErasedAction<C> {
        erase(move |controller, ctx, _params| (self)(controller, ctx))
    }
}

macro_rules! impl_into_action {
    ($(($ty:ident, $idx:tt)),+) => {
        impl<C, F, $($ty),+> IntoAction<C, ($($ty,)+)> for F
        where
            C: Send + 'static,
            $($ty: RouteParam,)+
            F: for<'a> Fn(&'a mut C, &'a mut Context, $($ty),+) -> ActionFuture<'a>
                + Send
                + Sync
                + 'static,
        {
            fn parameter_types() -> Vec<ParamKind> {
                vec![$($ty::KIND),+]
            }

            #[allow(non_snake_case)]
            fn into_erased(self) -> ErasedAction<C> {
                erase(move |controller, ctx, params| {
                    $(
                        let $ty = match extract::<$ty>(params, $idx) {
                            Ok(value) => value,
                            Err(err) => return fail(err),
                        };
                    )+
                    (self)(controller, ctx, $($ty),+)
                })
            }
        }
    };
}

impl_into_action!((A1, 0));
impl_into_action!((A1, 0), (A2, 1));
impl_into_action!((A1, 0), (A2, 1), (A3, 2));
impl_into_action!((A1, 0), (A2, 1), (A3, 2), (A4, 3));

/// One row of a controller's action table.
pub struct Action<C> {
    raw_name: String,
    parameter_types: Vec<ParamKind>,
    call: ErasedAction<C>,
}

impl<C: Send + 'static> Action<C> {
    /// Bind `raw_name` (for example `ActionCommentAdd`) to `f`.
    pub fn new<Args, F>(raw_name: impl Into<String>, f: F) -> Self
    where
        F: IntoAction<C, Args>,
    {
        Self {
            raw_name: raw_name.into(),
            parameter_types: F::parameter_types(),
            call: f.into_erased(),
        }
    }

    /// The unstripped identifier.
    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    /// The full declared signature, one entry per argument after the context.
    pub fn parameter_types(&self) -> &[ParamKind] {
        &self.parameter_types
    }

    /// Coerce `params` positionally and run the action.
    pub(crate) fn invoke<'a>(
        &self,
        controller: &'a mut C,
        ctx: &'a mut Context,
        params: &'a PathParams,
    ) -> ActionFuture<'a> {
        (self.call)(controller, ctx, params)
    }
}

impl<C> Clone for Action<C> {
    fn clone(&self) -> Self {
        Self {
            raw_name: self.raw_name.clone(),
            parameter_types: self.parameter_types.clone(),
            call: Arc::clone(&self.call),
        }
    }
}

impl<C> fmt::Debug for Action<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("raw_name", &self.raw_name)
            .field("parameter_types", &self.parameter_types)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct PostController;

    fn comment_add<'a>(
        _c: &'a mut PostController,
        ctx: &'a mut Context,
        title: String,
        page: u32,
    ) -> ActionFuture<'a> {
        Box::pin(async move {
            ctx.render_text(format!("{title}:{page}"));
            Ok(())
        })
    }

    #[test]
    fn clones_share_the_erased_call() {
        let action = Action::new("ActionCommentAdd", comment_add);
        let copy = action.clone();
        assert!(Arc::ptr_eq(&action.call, &copy.call));
        assert_eq!(copy.raw_name(), "ActionCommentAdd");
        assert_eq!(copy.parameter_types(), &[ParamKind::String, ParamKind::Integer]);
        assert!(format!("{copy:?}").contains("ActionCommentAdd"));
    }
}
