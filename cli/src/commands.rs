//! Subcommands and their handlers.
//!
//! Every handler writes exactly one JSON document to `out`: the envelope the
//! backend returned, the error envelope when it failed, or an
//! `ActionResult` for session actions. Failures are also returned as `Err`
//! so the process exits non-zero.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use blog_admin_core::guard::Navigation;
use blog_admin_core::types::{SortField, SortOrder, UserPatch};
use blog_admin_core::{
    ActionResult, ApiError, AppContext, CreateCategory, CreatePost, Envelope, ImageUpload,
    LoginRequest, MockBackend, PostQuery, UpdateCategory, UpdatePost,
};
use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

#[derive(Subcommand)]
pub enum Command {
    /// Sign in and keep the session in storage
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// End the session
    Logout,
    /// Show the locally stored session
    Whoami,
    /// Fetch the profile from the backend, or edit the stored one
    Profile {
        #[command(subcommand)]
        action: Option<ProfileAction>,
    },
    ChangePassword {
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
    },
    /// Manage posts
    #[command(subcommand)]
    Posts(PostCommand),
    /// Manage categories
    #[command(subcommand)]
    Categories(CategoryCommand),
    /// Upload an image file
    Upload {
        path: PathBuf,
        /// Overrides the type guessed from the file extension
        #[arg(long)]
        mime_type: Option<String>,
    },
    /// Blog statistics
    Stats,
    /// Run the navigation guard for a public path
    Navigate { path: String },
    /// Write the default posts and categories where none are stored (mock mode)
    Seed,
    /// Replace stored posts and categories with the defaults (mock mode)
    Reset,
    /// Remove stored posts and categories (mock mode)
    Clear,
    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Edit the stored user
    Update {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum PostCommand {
    /// Query posts on the backend
    List(ListArgs),
    Get { id: String },
    /// Fetch a post by slug
    Slug { slug: String },
    Create(CreateArgs),
    Update {
        id: String,
        #[command(flatten)]
        changes: UpdateArgs,
    },
    Delete { id: String },
    /// Load every post and apply the search and category filter locally
    Browse {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value = "")]
        category: String,
    },
    Featured,
    /// The most recent posts
    Recent,
}

#[derive(Subcommand)]
pub enum CategoryCommand {
    List,
    Get { id: String },
    Slug { slug: String },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        slug: String,
        #[arg(long)]
        description: Option<String>,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        slug: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Delete { id: String },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SortBy {
    PublishedAt,
    UpdatedAt,
    Title,
}

impl From<SortBy> for SortField {
    fn from(value: SortBy) -> Self {
        match value {
            SortBy::PublishedAt => SortField::PublishedAt,
            SortBy::UpdatedAt => SortField::UpdatedAt,
            SortBy::Title => SortField::Title,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Order {
    Asc,
    Desc,
}

impl From<Order> for SortOrder {
    fn from(value: Order) -> Self {
        match value {
            Order::Asc => SortOrder::Asc,
            Order::Desc => SortOrder::Desc,
        }
    }
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(long)]
    page: Option<usize>,
    #[arg(long)]
    page_size: Option<usize>,
    #[arg(long)]
    category: Option<String>,
    /// Repeat or comma-separate to match any of several tags
    #[arg(long = "tag", value_delimiter = ',')]
    tags: Vec<String>,
    #[arg(long)]
    search: Option<String>,
    /// Only featured posts
    #[arg(long)]
    featured: bool,
    #[arg(long)]
    author: Option<String>,
    #[arg(long, value_enum)]
    sort_by: Option<SortBy>,
    #[arg(long, value_enum)]
    sort_order: Option<Order>,
}

impl From<ListArgs> for PostQuery {
    fn from(args: ListArgs) -> Self {
        PostQuery {
            page: args.page,
            page_size: args.page_size,
            category: args.category,
            tags: (!args.tags.is_empty()).then_some(args.tags),
            search: args.search,
            featured: args.featured.then_some(true),
            author: args.author,
            sort_by: args.sort_by.map(Into::into),
            sort_order: args.sort_order.map(Into::into),
        }
    }
}

#[derive(Args)]
pub struct CreateArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    slug: String,
    #[arg(long, default_value = "")]
    excerpt: String,
    #[arg(long, conflicts_with = "content_file", required_unless_present = "content_file")]
    content: Option<String>,
    /// Read the post body from a file
    #[arg(long)]
    content_file: Option<PathBuf>,
    /// Defaults to the signed-in user
    #[arg(long)]
    author: Option<String>,
    #[arg(long)]
    category: String,
    #[arg(long = "tag", value_delimiter = ',')]
    tags: Vec<String>,
    #[arg(long)]
    cover_image: Option<String>,
    #[arg(long)]
    featured: bool,
}

#[derive(Args)]
pub struct UpdateArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    slug: Option<String>,
    #[arg(long)]
    excerpt: Option<String>,
    #[arg(long, conflicts_with = "content_file")]
    content: Option<String>,
    #[arg(long)]
    content_file: Option<PathBuf>,
    #[arg(long)]
    author: Option<String>,
    #[arg(long)]
    category: Option<String>,
    /// Replaces the tag list
    #[arg(long = "tag", value_delimiter = ',')]
    tags: Option<Vec<String>>,
    #[arg(long)]
    cover_image: Option<String>,
    #[arg(long)]
    featured: Option<bool>,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Login { .. } => "login",
            Command::Logout => "logout",
            Command::Whoami => "whoami",
            Command::Profile { .. } => "profile",
            Command::ChangePassword { .. } => "change-password",
            Command::Posts(_) => "posts",
            Command::Categories(_) => "categories",
            Command::Upload { .. } => "upload",
            Command::Stats => "stats",
            Command::Navigate { .. } => "navigate",
            Command::Seed => "seed",
            Command::Reset => "reset",
            Command::Clear => "clear",
            Command::Config => "config",
        }
    }
}

pub async fn run(ctx: &AppContext, command: Command, out: &mut impl Write) -> anyhow::Result<()> {
    let name = command.name();
    info!(command = name, mode = ctx.backend().mode(), "running command");
    let result = dispatch(ctx, command, out).await;
    match &result {
        Ok(()) => debug!(command = name, "command finished"),
        Err(err) => warn!(command = name, error = %err, "command failed"),
    }
    result
}

async fn dispatch(ctx: &AppContext, command: Command, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Command::Login { username, password } => {
            let outcome = ctx.auth().login(&LoginRequest::new(username, password)).await;
            report(out, outcome)
        }
        Command::Logout => {
            ctx.auth().logout().await;
            report(out, ActionResult::ok("logged out"))
        }
        Command::Whoami => {
            let session = json!({
                "authenticated": ctx.auth().is_authenticated().await,
                "user": ctx.auth().user().await,
                "isAdmin": ctx.auth().is_admin().await,
                "isEditor": ctx.auth().is_editor().await,
            });
            print_json(out, &session)
        }
        Command::Profile { action: None } => emit(out, ctx.backend().profile().await),
        Command::Profile {
            action: Some(ProfileAction::Update { username, email, avatar }),
        } => {
            let patch = UserPatch {
                username,
                email,
                avatar,
                ..Default::default()
            };
            emit(out, ctx.auth().update_user(patch).await.map(Envelope::ok))
        }
        Command::ChangePassword { old, new } => report(out, ctx.auth().change_password(&old, &new).await),
        Command::Posts(command) => run_posts(ctx, command, out).await,
        Command::Categories(command) => run_categories(ctx, command, out).await,
        Command::Upload { path, mime_type } => {
            let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .with_context(|| format!("{} has no file name", path.display()))?;
            let image = ImageUpload {
                mime_type: mime_type.unwrap_or_else(|| mime_from_path(&path)),
                file_name,
                bytes,
            };
            emit(out, ctx.backend().upload_image(&image).await)
        }
        Command::Stats => emit(out, ctx.backend().blog_stats().await),
        Command::Navigate { path } => {
            let route = ctx.config().route_path(&path).into_owned();
            let decision = match ctx.guard().before_each(&route).await {
                Navigation::Proceed => json!({ "path": route, "navigation": "proceed" }),
                Navigation::Redirect(location) => {
                    json!({ "path": route, "navigation": "redirect", "location": location })
                }
            };
            print_json(out, &decision)
        }
        Command::Seed => {
            let seeded = mock_backend(ctx)?.seed_defaults().await?;
            let message = if seeded {
                "seeded default posts and categories"
            } else {
                "storage already holds posts and categories"
            };
            report(out, ActionResult::ok(message))
        }
        Command::Reset => {
            mock_backend(ctx)?.reset_to_default().await?;
            report(out, ActionResult::ok("restored default posts and categories"))
        }
        Command::Clear => {
            mock_backend(ctx)?.clear_all().await?;
            report(out, ActionResult::ok("cleared posts and categories"))
        }
        Command::Config => print_json(out, ctx.config()),
    }
}

async fn run_posts(ctx: &AppContext, command: PostCommand, out: &mut impl Write) -> anyhow::Result<()> {
    let backend = ctx.backend();
    match command {
        PostCommand::List(args) => emit(out, backend.list_posts(&args.into()).await),
        PostCommand::Get { id } => emit(out, backend.get_post(&id).await),
        PostCommand::Slug { slug } => emit(out, backend.get_post_by_slug(&slug).await),
        PostCommand::Create(args) => {
            let author = match args.author {
                Some(author) => author,
                None => ctx
                    .auth()
                    .user()
                    .await
                    .map(|user| user.username)
                    .context("--author is required when nobody is signed in")?,
            };
            let content = match (args.content, args.content_file) {
                (Some(content), _) => content,
                (None, Some(path)) => read_content(&path)?,
                (None, None) => anyhow::bail!("either --content or --content-file is required"),
            };
            let input = CreatePost {
                title: args.title,
                slug: args.slug,
                excerpt: args.excerpt,
                content,
                author,
                category: args.category,
                tags: args.tags,
                cover_image: args.cover_image,
                featured: args.featured.then_some(true),
            };
            emit(out, backend.create_post(&input).await)
        }
        PostCommand::Update { id, changes } => {
            let content = match (changes.content, changes.content_file) {
                (Some(content), _) => Some(content),
                (None, Some(path)) => Some(read_content(&path)?),
                (None, None) => None,
            };
            let input = UpdatePost {
                title: changes.title,
                slug: changes.slug,
                excerpt: changes.excerpt,
                content,
                author: changes.author,
                category: changes.category,
                tags: changes.tags,
                cover_image: changes.cover_image,
                featured: changes.featured,
            };
            emit(out, backend.update_post(&id, &input).await)
        }
        PostCommand::Delete { id } => emit(out, backend.delete_post(&id).await),
        PostCommand::Browse { search, category } => {
            let blog = ctx.blog();
            blog.load().await?;
            blog.set_search_query(search).await;
            blog.set_selected_category(category).await;
            print_json(out, &Envelope::ok(blog.filtered_posts().await))
        }
        PostCommand::Featured => {
            ctx.blog().load().await?;
            print_json(out, &Envelope::ok(ctx.blog().featured_posts().await))
        }
        PostCommand::Recent => {
            ctx.blog().load().await?;
            print_json(out, &Envelope::ok(ctx.blog().recent_posts().await))
        }
    }
}

async fn run_categories(
    ctx: &AppContext,
    command: CategoryCommand,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let backend = ctx.backend();
    match command {
        CategoryCommand::List => emit(out, backend.list_categories().await),
        CategoryCommand::Get { id } => emit(out, backend.get_category(&id).await),
        CategoryCommand::Slug { slug } => emit(out, backend.get_category_by_slug(&slug).await),
        CategoryCommand::Create { name, slug, description } => {
            let input = CreateCategory { name, slug, description };
            emit(out, backend.create_category(&input).await)
        }
        CategoryCommand::Update {
            id,
            name,
            slug,
            description,
        } => {
            let input = UpdateCategory { name, slug, description };
            emit(out, backend.update_category(&id, &input).await)
        }
        CategoryCommand::Delete { id } => emit(out, backend.delete_category(&id).await),
    }
}

pub fn print_json<T: Serialize>(out: &mut impl Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Print the envelope, or the error envelope and fail.
fn emit<T: Serialize>(out: &mut impl Write, result: Result<Envelope<T>, ApiError>) -> anyhow::Result<()> {
    match result {
        Ok(envelope) => print_json(out, &envelope),
        Err(err) => {
            print_json(out, &err.envelope())?;
            Err(err.into())
        }
    }
}

fn report(out: &mut impl Write, outcome: ActionResult) -> anyhow::Result<()> {
    print_json(out, &outcome)?;
    if !outcome.success {
        anyhow::bail!("{}", outcome.message);
    }
    Ok(())
}

fn mock_backend(ctx: &AppContext) -> anyhow::Result<&MockBackend> {
    ctx.mock()
        .context("only available in mock mode (set use_mock_api or pass --mock)")
}

fn read_content(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn mime_from_path(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use blog_admin_core::clock::ManualClock;
    use blog_admin_core::{AppConfig, MemoryStore};
    use chrono::{TimeZone, Utc};
    use clap::Parser;
    use serde_json::Value;

    #[derive(Parser)]
    struct Harness {
        #[command(subcommand)]
        command: Command,
    }

    async fn mock_context() -> AppContext {
        let config = AppConfig {
            use_mock_api: true,
            mock_latency: false,
            ..Default::default()
        };
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 2, 10, 12, 0, 0).unwrap());
        AppContext::build(config, Arc::new(MemoryStore::new()), Arc::new(clock))
            .await
            .unwrap()
    }

    async fn exec(ctx: &AppContext, args: &[&str]) -> (anyhow::Result<()>, Value) {
        let harness = Harness::try_parse_from(std::iter::once("blog-admin").chain(args.iter().copied()))
            .unwrap();
        let mut out = Vec::new();
        let result = run(ctx, harness.command, &mut out).await;
        let value = serde_json::from_slice(&out).unwrap();
        (result, value)
    }

    #[tokio::test]
    async fn login_session_and_guard() {
        let ctx = mock_context().await;

        let (result, value) = exec(&ctx, &["navigate", "/admin"]).await;
        assert!(result.is_ok());
        assert_eq!(value["location"], "/login?redirect=%2Fadmin");

        let (result, value) = exec(&ctx, &["login", "-u", "admin", "-p", "wrong"]).await;
        assert!(result.is_err());
        assert_eq!(value["success"], false);
        assert_eq!(value["message"], "invalid username or password");

        let (result, value) = exec(&ctx, &["login", "-u", "admin", "-p", "admin123"]).await;
        assert!(result.is_ok());
        assert_eq!(value["success"], true);

        let (_, value) = exec(&ctx, &["whoami"]).await;
        assert_eq!(value["authenticated"], true);
        assert_eq!(value["isAdmin"], true);
        assert_eq!(value["isEditor"], false);

        let (_, value) = exec(&ctx, &["navigate", "/admin"]).await;
        assert_eq!(value["navigation"], "proceed");
        let (_, value) = exec(&ctx, &["navigate", "/login"]).await;
        assert_eq!(value["location"], "/admin");

        exec(&ctx, &["logout"]).await.0.unwrap();
        let (_, value) = exec(&ctx, &["whoami"]).await;
        assert_eq!(value["authenticated"], false);
    }

    #[tokio::test]
    async fn post_lifecycle() {
        let ctx = mock_context().await;
        exec(&ctx, &["login", "-u", "admin", "-p", "admin123"]).await.0.unwrap();

        let (result, value) = exec(
            &ctx,
            &[
                "posts", "create", "--title", "CLI post", "--slug", "cli-post", "--content", "hello",
                "--category", "technology", "--tag", "Rust,CLI",
            ],
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(value["data"]["author"], "admin");
        assert_eq!(value["data"]["tags"], json!(["Rust", "CLI"]));
        let id = value["data"]["id"].as_str().unwrap().to_string();

        let (_, value) = exec(&ctx, &["posts", "update", &id, "--featured", "true"]).await;
        assert_eq!(value["data"]["featured"], true);

        let (_, value) = exec(&ctx, &["posts", "slug", "cli-post"]).await;
        assert_eq!(value["data"]["id"], id.as_str());

        exec(&ctx, &["posts", "delete", &id]).await.0.unwrap();
        let (result, value) = exec(&ctx, &["posts", "delete", &id]).await;
        assert!(result.is_err());
        assert_eq!(value["code"], 404);
    }

    #[tokio::test]
    async fn list_and_browse() {
        let ctx = mock_context().await;

        let (_, value) = exec(&ctx, &["posts", "list", "--category", "design"]).await;
        assert_eq!(value["data"]["total"], 1);

        let (_, value) = exec(&ctx, &["posts", "list", "--page-size", "2", "--sort-by", "title", "--sort-order", "asc"]).await;
        assert_eq!(value["data"]["items"].as_array().unwrap().len(), 2);
        assert_eq!(value["data"]["totalPages"], 2);

        let (_, value) = exec(&ctx, &["posts", "browse", "--category", "design"]).await;
        assert_eq!(value["data"].as_array().unwrap().len(), 1);

        let (_, value) = exec(&ctx, &["posts", "recent"]).await;
        assert_eq!(value["data"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn mock_maintenance_commands() {
        let ctx = mock_context().await;

        exec(&ctx, &["clear"]).await.0.unwrap();
        let (_, value) = exec(&ctx, &["stats"]).await;
        assert_eq!(value["data"]["totalPosts"], 0);

        let (_, value) = exec(&ctx, &["seed"]).await;
        assert_eq!(value["message"], "seeded default posts and categories");
        let (_, value) = exec(&ctx, &["seed"]).await;
        assert_eq!(value["message"], "storage already holds posts and categories");

        exec(&ctx, &["reset"]).await.0.unwrap();
        let (_, value) = exec(&ctx, &["categories", "list"]).await;
        assert_eq!(value["data"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn mime_type_follows_extension() {
        assert_eq!(mime_from_path(Path::new("cover.JPG")), "image/jpeg");
        assert_eq!(mime_from_path(Path::new("scan.bmp")), "image/bmp");
        assert_eq!(mime_from_path(Path::new("logo.svg")), "image/svg+xml");
        assert_eq!(mime_from_path(Path::new("notes")), "application/octet-stream");
    }

    #[test]
    fn command_names_follow_the_subcommand() {
        for (args, name) in [
            (vec!["blog-admin", "change-password", "--old", "a", "--new", "b"], "change-password"),
            (vec!["blog-admin", "posts", "recent"], "posts"),
            (vec!["blog-admin", "navigate", "/admin"], "navigate"),
        ] {
            assert_eq!(Harness::try_parse_from(args).unwrap().command.name(), name);
        }
    }

    #[test]
    fn list_args_drop_unset_filters() {
        let harness = Harness::try_parse_from(["blog-admin", "posts", "list", "--featured"]).unwrap();
        let Command::Posts(PostCommand::List(args)) = harness.command else {
            panic!("expected posts list");
        };
        let query = PostQuery::from(args);
        assert_eq!(query.featured, Some(true));
        assert_eq!(query.tags, None);
        assert_eq!(query.page, None);
    }
}
