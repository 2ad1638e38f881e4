//! Hosts and application bootstrap.
//!
//! Startup is single-threaded and fallible:
//!
//! 1. [`Application::builder`] validates the [`Config`] and wires the collaborators
//!    (session store, renderer, error handler) into one shared [`AppState`].
//! 2. [`Application::host`] returns a [`Host`] per domain. Controllers and static
//!    directories are registered on it; every mistake is a [`RegistrationError`].
//! 3. [`Application::into_registry`] binds every host's routes into its router and
//!    freezes the result as a [`HostRegistry`], which the server only reads.

mod assets;
mod state;

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::Config;
use crate::controller::Controller;
use crate::discovery::{ActionShape, Conventions, ControllerDescriptor, RouteDescriptor, discover};
use crate::dispatch::{self, ErrorHandler, HtmlErrorHandler};
use crate::error::{BootstrapError, RegistrationError};
use crate::http::{Method, Request, Response, StatusCode};
use crate::router::{Handler, PathParams, Router, RouterOptions};
use crate::session::{MemoryStore, SessionStore};
use crate::view::{FileRenderer, Renderer};

pub use state::AppState;

/// Body of the `GET /` fallback when no default route is registered.
pub const GREETING: &str = "Hello from rttp-mvc.";

/// A registered route and the dispatch handler bound to it.
#[derive(Clone)]
pub struct RouteEntry {
    pub descriptor: Arc<RouteDescriptor>,
    handler: Handler,
}

/// One independently routed domain.
pub struct Host {
    domain: String,
    state: Arc<AppState>,
    routes: BTreeMap<String, RouteEntry>,
    statics: Vec<(String, PathBuf)>,
}

impl Host {
    fn new(domain: String, state: Arc<AppState>) -> Self {
        Self {
            domain,
            state,
            routes: BTreeMap::new(),
            statics: Vec::new(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Routes registered so far, keyed by pattern.
    pub fn routes(&self) -> &BTreeMap<String, RouteEntry> {
        &self.routes
    }

    /// Derive `C`'s routes under `base_route` and bind them to dispatch handlers.
    ///
    /// A pattern registered earlier, by any controller, is replaced.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::RouteMissingSlash`] / [`RegistrationError::RouteTooShort`]
    ///   for a base route that is not `/` followed by at least one character.
    /// - [`RegistrationError::ControllerName`] when `C::NAME` does not follow the
    ///   configured controller prefix and suffix.
    pub fn register_controller<C: Controller>(&mut self, base_route: &str) -> Result<&mut Self, RegistrationError> {
        if !base_route.starts_with('/') {
            return Err(RegistrationError::RouteMissingSlash {
                route: base_route.to_owned(),
            });
        }
        if base_route.len() < 2 {
            return Err(RegistrationError::RouteTooShort {
                route: base_route.to_owned(),
            });
        }

        let state = Arc::clone(&self.state);
        let config = state.config();
        let conventions = Conventions::from(config);
        let controller = Arc::new(ControllerDescriptor::new(
            C::NAME,
            &conventions,
            &state.view_root(),
            &C::layout(),
            &config.view.layout,
        )?);

        let actions = C::actions();
        let shapes = actions.iter().map(|a| ActionShape {
            raw_name: a.raw_name(),
            parameter_types: a.parameter_types(),
        });
        let descriptors = discover(base_route, &controller, shapes, &C::method_filter(), &conventions);

        for descriptor in descriptors {
            let action = actions[descriptor.action_index].clone();
            let descriptor = Arc::new(descriptor);
            let handler = dispatch::route_handler(Arc::clone(&state), Arc::clone(&descriptor), action);
            debug!(
                host = %self.domain,
                pattern = %descriptor.pattern,
                controller = %descriptor.controller.full_name,
                action = %descriptor.raw_action_name,
                "route registered"
            );
            self.routes
                .insert(descriptor.pattern.clone(), RouteEntry { descriptor, handler });
        }

        Ok(self)
    }

    /// Serve files below `dir` on `GET <prefix>/*filepath`.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::StaticPrefix`] unless `prefix` is `/` followed by at
    /// least one character with no `:` or `*`.
    pub fn register_static_dir(
        &mut self,
        prefix: &str,
        dir: impl Into<PathBuf>,
    ) -> Result<&mut Self, RegistrationError> {
        let prefix = normalize_prefix(prefix)?;
        self.statics.push((prefix, dir.into()));
        Ok(self)
    }

    // Bind everything into a fresh router.
    fn build(self) -> Result<Router, RegistrationError> {
        let config = self.state.config();
        let mut router = Router::new(
            RouterOptions::from(&config.router),
            Arc::clone(self.state.errors()),
            config.mode,
        );

        for entry in self.routes.values() {
            for method in &entry.descriptor.allowed_methods {
                router.handle(method.clone(), &entry.descriptor.pattern, Arc::clone(&entry.handler));
            }
        }

        match self.routes.get(&config.router.default_route) {
            Some(entry) => {
                debug!(host = %self.domain, route = %config.router.default_route, "default route bound to /");
                router.handle(Method::Get, "/", Arc::clone(&entry.handler));
            }
            None => router.get("/", |_request: Request, _params: PathParams| async {
                Response::new(StatusCode::Ok)
                    .header("Content-Type", "text/plain; charset=utf-8")
                    .body(GREETING)
            }),
        }

        let mut statics = Vec::with_capacity(config.resources.len() + self.statics.len());
        for (prefix, dir) in &config.resources {
            let dir = if dir.is_relative() {
                config.base_path.join(dir)
            } else {
                dir.clone()
            };
            statics.push((normalize_prefix(prefix)?, dir));
        }
        statics.extend(self.statics);

        for (prefix, dir) in statics {
            debug!(host = %self.domain, prefix = %prefix, dir = %dir.display(), "static directory registered");
            let pattern = format!("{prefix}/*{}", assets::FILEPATH);
            router.handle(
                Method::Get,
                &pattern,
                assets::static_handler(Arc::clone(&self.state), dir),
            );
        }

        Ok(router)
    }
}

fn normalize_prefix(prefix: &str) -> Result<String, RegistrationError> {
    let trimmed = prefix.trim_end_matches('/');
    let valid = trimmed.starts_with('/') && trimmed.len() >= 2 && !trimmed.contains([':', '*']);
    if valid {
        Ok(trimmed.to_owned())
    } else {
        Err(RegistrationError::StaticPrefix {
            prefix: prefix.to_owned(),
        })
    }
}

/// Domain to router, frozen after startup.
pub struct HostRegistry {
    hosts: HashMap<String, Router>,
    default_host: String,
}

impl HostRegistry {
    pub fn default_host(&self) -> &str {
        &self.default_host
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// The router for `domain`, falling back to the default host.
    pub fn router_for(&self, domain: Option<&str>) -> &Router {
        domain
            .and_then(|d| self.hosts.get(d))
            .or_else(|| self.hosts.get(&self.default_host))
            .unwrap_or_else(|| unreachable!("registry always holds its default host"))
    }

    /// Route `request` by its `Host` header.
    pub async fn route(&self, request: Request) -> Response {
        let router = self.router_for(request.domain());
        router.route(request).await
    }
}

/// An application under construction.
pub struct Application {
    state: Arc<AppState>,
    hosts: BTreeMap<String, Host>,
    default_host: Option<String>,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::default()
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// The host for `domain`, created on first use.
    pub fn host(&mut self, domain: &str) -> &mut Host {
        let state = &self.state;
        self.hosts
            .entry(domain.to_owned())
            .or_insert_with(|| Host::new(domain.to_owned(), Arc::clone(state)))
    }

    /// Requests whose domain matches no host go to `domain`. Required when more
    /// than one host is registered.
    pub fn set_default_host(&mut self, domain: &str) -> &mut Self {
        self.default_host = Some(domain.to_owned());
        self
    }

    /// Bind every host and freeze the registry.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::NoHosts`] when no host was registered.
    /// - [`RegistrationError::MissingDefaultHost`] with several hosts and no default.
    /// - [`RegistrationError::UnknownDefaultHost`] when the default names no host.
    /// - [`RegistrationError::StaticPrefix`] for an invalid `[resources]` prefix.
    pub fn into_registry(self) -> Result<HostRegistry, RegistrationError> {
        let default_host = match (self.default_host, self.hosts.len()) {
            (_, 0) => return Err(RegistrationError::NoHosts),
            (Some(domain), _) if !self.hosts.contains_key(&domain) => {
                return Err(RegistrationError::UnknownDefaultHost { domain });
            }
            (Some(domain), _) => domain,
            (None, 1) => self.hosts.keys().next().cloned().unwrap_or_default(),
            (None, count) => return Err(RegistrationError::MissingDefaultHost { count }),
        };

        let mut hosts = HashMap::with_capacity(self.hosts.len());
        for (domain, host) in self.hosts {
            let router = host.build()?;
            info!(host = %domain, routes = router.len(), "host ready");
            hosts.insert(domain, router);
        }

        Ok(HostRegistry { hosts, default_host })
    }
}

/// Builder for [`Application`].
#[derive(Default)]
pub struct ApplicationBuilder {
    config: Option<Config>,
    sessions: Option<Arc<dyn SessionStore>>,
    renderer: Option<Arc<dyn Renderer>>,
    errors: Option<Arc<dyn ErrorHandler>>,
}

impl ApplicationBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Defaults to a [`MemoryStore`] when sessions are enabled.
    pub fn session_store(mut self, store: impl SessionStore + 'static) -> Self {
        self.sessions = Some(Arc::new(store));
        self
    }

    /// Defaults to [`FileRenderer`].
    pub fn renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    /// Defaults to [`HtmlErrorHandler`].
    pub fn error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.errors = Some(Arc::new(handler));
        self
    }

    /// Validate the configuration and assemble the application.
    pub fn build(self) -> Result<Application, BootstrapError> {
        let config = self.config.unwrap_or_default().validate()?;

        let sessions = if config.session.enable {
            let store = self.sessions.unwrap_or_else(|| {
                Arc::new(MemoryStore::new(Duration::from_secs(config.session.max_age)))
            });
            Some(store)
        } else {
            None
        };
        let renderer = self.renderer.unwrap_or_else(|| Arc::new(FileRenderer));
        let errors = self.errors.unwrap_or_else(|| Arc::new(HtmlErrorHandler));

        dispatch::install_panic_hook();
        info!(name = %config.name, mode = ?config.mode, "application configured");

        Ok(Application {
            state: Arc::new(AppState::new(config, sessions, renderer, errors)),
            hosts: BTreeMap::new(),
            default_host: None,
        })
    }
}
