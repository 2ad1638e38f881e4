//! Controller discovery: naming conventions to route descriptors.
//!
//! Given a controller's name and action table, [`discover`] derives every route
//! the controller answers on:
//!
//! | Action (prefix `Action`)       | Base     | Routes                                                 |
//! |--------------------------------|----------|--------------------------------------------------------|
//! | `ActionIndex()` (default)      | `/post`  | `/post`, `/post/index`                                 |
//! | `ActionView(i64)`              | `/post`  | `/post/view`, `/post/view/:a`                          |
//! | `ActionCommentAdd(String, i64)`| `/post`  | `/post/comment-add`, `…/:a`, `…/:a/:b`                 |
//!
//! Discovery is a pure function: it touches neither the router nor the
//! filesystem, so it can be tested with plain data.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::Method;
use crate::config::Config;
use crate::controller::{Layout, MethodFilter, ParamKind};
use crate::error::RegistrationError;
use crate::router::pretty_path;

/// Prefix/suffix conventions for controller and action identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conventions {
    pub controller_prefix: String,
    pub controller_suffix: String,
    pub action_prefix: String,
    pub action_suffix: String,
    pub default_action: String,
}

impl Default for Conventions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for Conventions {
    fn from(config: &Config) -> Self {
        Self {
            controller_prefix: config.controller.prefix.clone(),
            controller_suffix: config.controller.suffix.clone(),
            action_prefix: config.action.prefix.clone(),
            action_suffix: config.action.suffix.clone(),
            default_action: config.action.default.clone(),
        }
    }
}

impl Conventions {
    /// Strip the controller prefix and suffix from `full_name`.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::ControllerName`] when a configured edge is missing or
    /// nothing is left after stripping.
    pub fn controller_name(&self, full_name: &str) -> Result<String, RegistrationError> {
        strip_edges(full_name, &self.controller_prefix, &self.controller_suffix)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| RegistrationError::ControllerName {
                name: full_name.to_owned(),
                prefix: self.controller_prefix.clone(),
                suffix: self.controller_suffix.clone(),
            })
    }

    /// Strip the action prefix and suffix from `raw_name`.
    ///
    /// `None` means the identifier is not an action: an edge did not match, or the
    /// stripped name is empty or does not start with an uppercase letter.
    pub fn action_name<'a>(&self, raw_name: &'a str) -> Option<&'a str> {
        let name = strip_edges(raw_name, &self.action_prefix, &self.action_suffix)?;
        name.chars()
            .next()
            .is_some_and(|c| c.is_ascii_uppercase())
            .then_some(name)
    }

    pub fn is_default_action(&self, action_name: &str) -> bool {
        action_name.eq_ignore_ascii_case(&self.default_action)
    }
}

fn strip_edges<'a>(name: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    let name = if prefix.is_empty() {
        name
    } else {
        name.strip_prefix(prefix)?
    };
    if suffix.is_empty() {
        Some(name)
    } else {
        name.strip_suffix(suffix)
    }
}

/// Static facts about a registered controller, shared by all its routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerDescriptor {
    /// Stripped name, e.g. `Post`.
    pub name: String,
    /// Raw name, e.g. `PostController`.
    pub full_name: String,
    /// `<view root>/<pretty(name)>`.
    pub view_directory: PathBuf,
    /// Layout file name, or `None` when layouts are disabled.
    pub layout_name: Option<String>,
}

impl ControllerDescriptor {
    /// Build the descriptor for the controller type named `full_name`.
    ///
    /// `view_root` is the directory holding one sub-directory per controller.
    pub fn new(
        full_name: &str,
        conventions: &Conventions,
        view_root: &Path,
        layout: &Layout,
        global_layout: &str,
    ) -> Result<Self, RegistrationError> {
        let name = conventions.controller_name(full_name)?;
        Ok(Self {
            view_directory: view_root.join(pretty_path(&name)),
            full_name: full_name.to_owned(),
            name,
            layout_name: layout.resolve(global_layout),
        })
    }

    /// Layouts live next to the per-controller view directories:
    /// `<parent of view_directory>/<layout_dir>/<layout_name>`.
    pub fn layout_file(&self, layout_dir: &Path) -> Option<PathBuf> {
        let layout = self.layout_name.as_ref()?;
        let parent = self.view_directory.parent().unwrap_or(Path::new(""));
        Some(parent.join(layout_dir).join(layout))
    }
}

/// One derivable endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub pattern: String,
    pub allowed_methods: Vec<Method>,
    pub controller: Arc<ControllerDescriptor>,
    /// Stripped, e.g. `CommentAdd`.
    pub action_name: String,
    /// Unstripped, e.g. `ActionCommentAdd`.
    pub raw_action_name: String,
    /// One entry per `:x` placeholder in `pattern`.
    pub parameter_types: Vec<ParamKind>,
    /// Position of the action in the controller's action table.
    pub action_index: usize,
}

impl RouteDescriptor {
    pub fn placeholder_count(&self) -> usize {
        self.pattern.split('/').filter(|s| s.starts_with(':')).count()
    }
}

/// The discovery view of one action table row.
#[derive(Debug, Clone, Copy)]
pub struct ActionShape<'a> {
    pub raw_name: &'a str,
    pub parameter_types: &'a [ParamKind],
}

/// Derive the routes for one controller mounted at `base_route`.
///
/// Descriptors come out in derivation order. When two share a pattern, the
/// caller keeps the later one.
pub fn discover<'a>(
    base_route: &str,
    controller: &Arc<ControllerDescriptor>,
    actions: impl IntoIterator<Item = ActionShape<'a>>,
    filter: &MethodFilter,
    conventions: &Conventions,
) -> Vec<RouteDescriptor> {
    let mut routes = Vec::new();

    for (action_index, shape) in actions.into_iter().enumerate() {
        let Some(action_name) = conventions.action_name(shape.raw_name) else {
            tracing::trace!(action = shape.raw_name, "identifier is not an action, skipping");
            continue;
        };

        let allowed_methods = filter.methods_for(action_name);
        let make = |pattern: String, parameter_types: &[ParamKind]| RouteDescriptor {
            pattern,
            allowed_methods: allowed_methods.clone(),
            controller: Arc::clone(controller),
            action_name: action_name.to_owned(),
            raw_action_name: shape.raw_name.to_owned(),
            parameter_types: parameter_types.to_vec(),
            action_index,
        };

        if conventions.is_default_action(action_name) {
            routes.push(make(base_route.to_owned(), &[]));
        }

        let mut pattern = format!("{base_route}/{}", pretty_path(action_name));
        routes.push(make(pattern.clone(), &[]));

        for (k, _) in shape.parameter_types.iter().enumerate() {
            pattern.push_str("/:");
            pattern.push(char::from(b'a' + k as u8));
            routes.push(make(pattern.clone(), &shape.parameter_types[..=k]));
        }
    }

    routes
}
