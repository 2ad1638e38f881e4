//! A small blog served on two hosts.
//!
//! ```text
//! cargo run --example blog [config.toml]
//! curl http://localhost:8080/post/view/3
//! curl http://localhost:8080/post/comment-add/hello
//! curl -H 'Host: admin.localhost' http://localhost:8080/admin/dashboard
//! ```

use std::collections::HashMap;

use rttp_mvc::prelude::*;
use serde_json::json;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Default)]
struct PostController;

fn index<'a>(_c: &'a mut PostController, ctx: &'a mut Context) -> ActionFuture<'a> {
    Box::pin(async move {
        let csrf = ctx.csrf_token().to_owned();
        ctx.render_json(&json!({ "posts": [1, 2, 3], "csrf": csrf }))
    })
}

fn view<'a>(_c: &'a mut PostController, ctx: &'a mut Context, id: u64) -> ActionFuture<'a> {
    Box::pin(async move {
        let visits = ctx
            .session()
            .and_then(|s| s.get("visits"))
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0)
            + 1;
        if let Some(session) = ctx.session_mut() {
            session.insert("visits", visits.to_string());
        }
        ctx.render_text(format!("post {id} (visit {visits})"));
        Ok(())
    })
}

fn comment_add<'a>(_c: &'a mut PostController, ctx: &'a mut Context, title: String) -> ActionFuture<'a> {
    Box::pin(async move {
        if ctx.is_post() {
            let body = ctx.form_value("body").unwrap_or("").to_owned();
            ctx.render_json(&json!({ "post": title, "comment": body }))
        } else {
            ctx.render_text(format!("POST a comment on {title:?} with an X-CSRF-Token header"));
            Ok(())
        }
    })
}

impl Controller for PostController {
    const NAME: &'static str = "PostController";

    fn actions() -> Vec<Action<Self>> {
        vec![
            Action::new("ActionIndex", index),
            Action::new("ActionView", view),
            Action::new("ActionCommentAdd", comment_add),
        ]
    }

    fn method_filter() -> MethodFilter {
        MethodFilter::new().allow("View", [Method::Get])
    }
}

#[derive(Default)]
struct AdminController {
    user: Option<String>,
}

fn dashboard<'a>(c: &'a mut AdminController, ctx: &'a mut Context) -> ActionFuture<'a> {
    Box::pin(async move {
        let user = c.user.clone().unwrap_or_default();
        let stats: HashMap<&str, u32> = HashMap::from([("posts", 3), ("comments", 12)]);
        ctx.render_json(&json!({ "user": user, "stats": stats }))
    })
}

impl Controller for AdminController {
    const NAME: &'static str = "AdminController";

    fn actions() -> Vec<Action<Self>> {
        vec![Action::new("ActionDashboard", dashboard)]
    }

    fn before_action<'a>(&'a mut self, ctx: &'a mut Context) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            match ctx.request().query_param("user") {
                Some(user) => {
                    self.user = Some(user.to_owned());
                    true
                }
                None => {
                    ctx.response_mut().forbidden("pass ?user=<name>");
                    false
                }
            }
        })
    }

    fn before_response<'a>(&'a mut self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            tracing::info!(user = ?self.user, status = ctx.response().status().as_u16(), "admin request");
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,rttp_mvc=debug")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let mut app = Application::builder().config(config).build()?;
    app.host("localhost")
        .register_controller::<PostController>("/post")?;
    app.host("admin.localhost")
        .register_controller::<AdminController>("/admin")?;
    app.set_default_host("localhost");

    let server = Server::bind("127.0.0.1:8080").await?;
    tracing::info!(address = %server.local_addr(), "blog demo ready");
    server.serve(app.into_registry()?).await?;
    Ok(())
}
