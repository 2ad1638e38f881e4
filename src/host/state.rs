//! State shared read-only by every handler after startup.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::dispatch::ErrorHandler;
use crate::session::SessionStore;
use crate::view::Renderer;

/// The application's collaborators and validated configuration.
///
/// Built once by [`Application`](super::Application) and handed to every
/// dispatch handler behind an [`Arc`].
pub struct AppState {
    config: Config,
    sessions: Option<Arc<dyn SessionStore>>,
    renderer: Arc<dyn Renderer>,
    errors: Arc<dyn ErrorHandler>,
}

impl AppState {
    pub(crate) fn new(
        config: Config,
        sessions: Option<Arc<dyn SessionStore>>,
        renderer: Arc<dyn Renderer>,
        errors: Arc<dyn ErrorHandler>,
    ) -> Self {
        Self {
            config,
            sessions,
            renderer,
            errors,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The session store, `None` when sessions are disabled.
    pub fn sessions(&self) -> Option<&Arc<dyn SessionStore>> {
        self.sessions.as_ref()
    }

    pub fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }

    pub fn errors(&self) -> &Arc<dyn ErrorHandler> {
        &self.errors
    }

    /// `<base_path>/<view.dir>`, the parent of every controller's view directory.
    pub fn view_root(&self) -> PathBuf {
        self.config.base_path.join(&self.config.view.dir)
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("sessions", &self.sessions.is_some())
            .finish_non_exhaustive()
    }
}
