use std::io::Write;

use async_trait::async_trait;
use url::Url;

use crate::app::{AppContext, GatorError, Result};
use crate::cli::{Arity, AuthenticatedHandler, Command, CommandRegistry, Handler};
use crate::domain::{Feed, FeedFollow, User};

/// Feed fetched by `agg` when no URL is given.
pub const DEFAULT_AGG_URL: &str = "https://www.wagslane.dev/index.xml";

/// Build the registry with every gator command.
pub fn registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry.register_public("login", Login);
    registry.register_public("register", Register);
    registry.register_public("reset", Reset);
    registry.register_public("users", Users);
    registry.register_public("agg", Agg);
    registry.register_public("feeds", Feeds);

    registry.register_authenticated("addfeed", AddFeed);
    registry.register_authenticated("follow", Follow);
    registry.register_authenticated("following", Following);
    registry.register_authenticated("unfollow", Unfollow);
    registry
}

pub struct Login;

#[async_trait]
impl Handler for Login {
    fn arity(&self) -> Arity {
        Arity::Exactly(1)
    }

    fn usage(&self) -> &'static str {
        "login <username>"
    }

    async fn run(&self, ctx: &mut AppContext, cmd: &Command) -> Result<()> {
        let user = ctx.users.get_user(&cmd.args[0])?;
        ctx.session.set_current_user(&user.name)?;
        writeln!(ctx.out, "User name has been set to {}", user.name)?;
        Ok(())
    }
}

pub struct Register;

#[async_trait]
impl Handler for Register {
    fn arity(&self) -> Arity {
        Arity::Exactly(1)
    }

    fn usage(&self) -> &'static str {
        "register <username>"
    }

    async fn run(&self, ctx: &mut AppContext, cmd: &Command) -> Result<()> {
        let user = User::new(cmd.args[0].clone());
        ctx.users.create_user(&user)?;
        ctx.session.set_current_user(&user.name)?;
        writeln!(ctx.out, "Created user {} and logged in", user.name)?;
        tracing::info!("Registered user {} ({})", user.name, user.id);
        Ok(())
    }
}

pub struct Reset;

#[async_trait]
impl Handler for Reset {
    fn usage(&self) -> &'static str {
        "reset"
    }

    async fn run(&self, ctx: &mut AppContext, _cmd: &Command) -> Result<()> {
        ctx.users.reset_users()?;
        writeln!(ctx.out, "Reset all users")?;
        Ok(())
    }
}

pub struct Users;

#[async_trait]
impl Handler for Users {
    fn usage(&self) -> &'static str {
        "users"
    }

    async fn run(&self, ctx: &mut AppContext, _cmd: &Command) -> Result<()> {
        let users = ctx.users.list_users()?;

        if users.is_empty() {
            writeln!(ctx.out, "No users")?;
            return Ok(());
        }

        for user in users {
            if ctx.session.is_current(&user.name) {
                writeln!(ctx.out, "* {} (current)", user.name)?;
            } else {
                writeln!(ctx.out, "* {}", user.name)?;
            }
        }

        Ok(())
    }
}

pub struct Agg;

#[async_trait]
impl Handler for Agg {
    fn arity(&self) -> Arity {
        Arity::AtMost(1)
    }

    fn usage(&self) -> &'static str {
        "agg [feed_url]"
    }

    async fn run(&self, ctx: &mut AppContext, cmd: &Command) -> Result<()> {
        let url = cmd.args.first().map(String::as_str).unwrap_or(DEFAULT_AGG_URL);
        let feed = ctx.feed_fetcher.fetch_feed(url).await?;
        write!(ctx.out, "{}", feed)?;
        Ok(())
    }
}

pub struct Feeds;

#[async_trait]
impl Handler for Feeds {
    fn usage(&self) -> &'static str {
        "feeds"
    }

    async fn run(&self, ctx: &mut AppContext, _cmd: &Command) -> Result<()> {
        let feeds = ctx.feeds.list_feeds()?;

        if feeds.is_empty() {
            writeln!(ctx.out, "No feeds")?;
            return Ok(());
        }

        for feed in feeds {
            let owner = ctx.users.get_user_by_id(feed.user_id)?;
            writeln!(ctx.out, "* {}", feed.display_name())?;
            writeln!(ctx.out, "  URL: {}", feed.url)?;
            writeln!(ctx.out, "  Owner: {}", owner.name)?;
        }

        Ok(())
    }
}

pub struct AddFeed;

#[async_trait]
impl AuthenticatedHandler for AddFeed {
    fn arity(&self) -> Arity {
        Arity::Exactly(2)
    }

    fn usage(&self) -> &'static str {
        "addfeed <name> <url>"
    }

    async fn run(&self, ctx: &mut AppContext, cmd: &Command, user: &User) -> Result<()> {
        Url::parse(&cmd.args[1])?;
        let feed = Feed::new(cmd.args[0].clone(), cmd.args[1].clone(), user.id);
        let follow = FeedFollow::new(user.id, feed.id);

        ctx.feeds.create_feed_and_follow(&feed, &follow)?;

        writeln!(ctx.out, "Feed created successfully:")?;
        writeln!(ctx.out, "ID: {}", feed.id)?;
        writeln!(ctx.out, "Name: {}", feed.name)?;
        writeln!(ctx.out, "URL: {}", feed.url)?;
        writeln!(ctx.out, "User ID: {}", feed.user_id)?;
        writeln!(ctx.out, "Created At: {}", feed.created_at.to_rfc3339())?;
        writeln!(ctx.out, "Updated At: {}", feed.updated_at.to_rfc3339())?;
        Ok(())
    }
}

pub struct Follow;

#[async_trait]
impl AuthenticatedHandler for Follow {
    fn arity(&self) -> Arity {
        Arity::Exactly(1)
    }

    fn usage(&self) -> &'static str {
        "follow <url>"
    }

    async fn run(&self, ctx: &mut AppContext, cmd: &Command, user: &User) -> Result<()> {
        let feed = ctx.feeds.get_feed_by_url(&cmd.args[0])?;
        let view = ctx
            .feeds
            .create_feed_follow(&FeedFollow::new(user.id, feed.id))?;

        writeln!(ctx.out, "{} is now following {}", view.user_name, view.feed_name)?;
        Ok(())
    }
}

pub struct Following;

#[async_trait]
impl AuthenticatedHandler for Following {
    fn usage(&self) -> &'static str {
        "following"
    }

    async fn run(&self, ctx: &mut AppContext, _cmd: &Command, user: &User) -> Result<()> {
        let follows = ctx.feeds.feed_follows_for_user(user.id)?;

        if follows.is_empty() {
            writeln!(ctx.out, "Not following any feeds")?;
            return Ok(());
        }

        for view in follows {
            writeln!(ctx.out, "* {}", view.feed_name)?;
        }

        Ok(())
    }
}

pub struct Unfollow;

#[async_trait]
impl AuthenticatedHandler for Unfollow {
    fn arity(&self) -> Arity {
        Arity::Exactly(1)
    }

    fn usage(&self) -> &'static str {
        "unfollow <url>"
    }

    async fn run(&self, ctx: &mut AppContext, cmd: &Command, user: &User) -> Result<()> {
        let url = &cmd.args[0];
        let feed = ctx.feeds.get_feed_by_url(url)?;

        ctx.feeds
            .delete_feed_follow(user.id, feed.id)
            .map_err(|e| match e {
                GatorError::NotFollowing(_) => GatorError::NotFollowing(url.clone()),
                other => other,
            })?;

        writeln!(ctx.out, "Unfollowed {}", url)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use uuid::Uuid;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::app::Session;
    use crate::config::MemoryConfigStore;
    use crate::domain::FeedFollowView;
    use crate::fetcher::HttpFetcher;
    use crate::store::{FeedStore, SqliteStore, UserStore};

    const FEED_URL: &str = "http://x/feed.xml";

    /// Store that counts every call and refuses to do anything.
    #[derive(Default)]
    struct SpyStore {
        calls: AtomicUsize,
    }

    impl SpyStore {
        fn touch<T>(&self) -> Result<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(GatorError::UserNotFound("spy".into()))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl UserStore for SpyStore {
        fn create_user(&self, _user: &User) -> Result<()> {
            self.touch()
        }
        fn get_user(&self, _name: &str) -> Result<User> {
            self.touch()
        }
        fn get_user_by_id(&self, _id: Uuid) -> Result<User> {
            self.touch()
        }
        fn list_users(&self) -> Result<Vec<User>> {
            self.touch()
        }
        fn reset_users(&self) -> Result<()> {
            self.touch()
        }
    }

    impl FeedStore for SpyStore {
        fn create_feed_and_follow(&self, _feed: &Feed, _follow: &FeedFollow) -> Result<()> {
            self.touch()
        }
        fn list_feeds(&self) -> Result<Vec<Feed>> {
            self.touch()
        }
        fn get_feed_by_url(&self, _url: &str) -> Result<Feed> {
            self.touch()
        }
        fn create_feed_follow(&self, _follow: &FeedFollow) -> Result<FeedFollowView> {
            self.touch()
        }
        fn feed_follows_for_user(&self, _user_id: Uuid) -> Result<Vec<FeedFollowView>> {
            self.touch()
        }
        fn delete_feed_follow(&self, _user_id: Uuid, _feed_id: Uuid) -> Result<()> {
            self.touch()
        }
    }

    /// Captures what handlers print.
    #[derive(Clone, Default)]
    struct Output(Arc<Mutex<Vec<u8>>>);

    impl Output {
        /// Everything written since the last call.
        fn take(&self) -> String {
            let bytes = std::mem::take(&mut *self.0.lock().unwrap());
            String::from_utf8(bytes).unwrap()
        }
    }

    impl Write for Output {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn sqlite_context() -> (AppContext, Arc<SqliteStore>, Output) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let out = Output::default();
        let ctx = AppContext::from_parts(
            Session::load(Box::new(MemoryConfigStore::new())),
            store.clone(),
            store.clone(),
            Arc::new(HttpFetcher::new().unwrap()),
        )
        .with_output(out.clone());
        (ctx, store, out)
    }

    fn spy_context(current_user: &str) -> (AppContext, Arc<SpyStore>) {
        let spy = Arc::new(SpyStore::default());
        let ctx = AppContext::from_parts(
            Session::load(Box::new(MemoryConfigStore::with_user(current_user))),
            spy.clone(),
            spy.clone(),
            Arc::new(HttpFetcher::new().unwrap()),
        );
        (ctx.with_output(Output::default()), spy)
    }

    async fn run(ctx: &mut AppContext, name: &str, args: &[&str]) -> Result<()> {
        registry().run(ctx, &Command::new(name, args)).await
    }

    #[test]
    fn test_registry_has_every_command() {
        let registry = registry();
        assert_eq!(
            registry.names(),
            vec![
                "addfeed",
                "agg",
                "feeds",
                "follow",
                "following",
                "login",
                "register",
                "reset",
                "unfollow",
                "users"
            ]
        );
        for name in ["addfeed", "follow", "following", "unfollow"] {
            assert!(registry.get(name).unwrap().requires_login());
        }
        for name in ["login", "register", "reset", "users", "agg", "feeds"] {
            assert!(!registry.get(name).unwrap().requires_login());
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (mut ctx, _store, out) = sqlite_context();

        run(&mut ctx, "register", &["alice"]).await.unwrap();
        run(&mut ctx, "register", &["bob"]).await.unwrap();
        assert_eq!(ctx.session.current_user(), Some("bob"));
        assert_eq!(
            out.take(),
            "Created user alice and logged in\nCreated user bob and logged in\n"
        );

        run(&mut ctx, "login", &["alice"]).await.unwrap();
        assert_eq!(ctx.session.current_user(), Some("alice"));
        assert_eq!(out.take(), "User name has been set to alice\n");
    }

    #[tokio::test]
    async fn test_login_unknown_user_keeps_session() {
        let (mut ctx, _store, _out) = sqlite_context();
        run(&mut ctx, "register", &["alice"]).await.unwrap();

        let err = run(&mut ctx, "login", &["nobody"]).await.unwrap_err();
        assert!(matches!(err, GatorError::UserNotFound(_)));
        assert_eq!(ctx.session.current_user(), Some("alice"));
    }

    #[tokio::test]
    async fn test_register_duplicate_fails() {
        let (mut ctx, store, _out) = sqlite_context();
        run(&mut ctx, "register", &["alice"]).await.unwrap();

        let err = run(&mut ctx, "register", &["alice"]).await.unwrap_err();
        assert!(matches!(err, GatorError::Database(_)));
        assert_eq!(store.list_users().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_users_marks_current() {
        let (mut ctx, _store, out) = sqlite_context();
        run(&mut ctx, "register", &["bob"]).await.unwrap();
        run(&mut ctx, "register", &["alice"]).await.unwrap();
        out.take();

        run(&mut ctx, "users", &[]).await.unwrap();
        assert_eq!(out.take(), "* alice (current)\n* bob\n");
    }

    #[tokio::test]
    async fn test_reset_then_users_is_empty() {
        let (mut ctx, store, out) = sqlite_context();
        run(&mut ctx, "register", &["alice"]).await.unwrap();
        run(&mut ctx, "register", &["bob"]).await.unwrap();
        out.take();

        run(&mut ctx, "reset", &[]).await.unwrap();
        run(&mut ctx, "users", &[]).await.unwrap();

        assert!(store.list_users().unwrap().is_empty());
        assert_eq!(out.take(), "Reset all users\nNo users\n");
    }

    #[tokio::test]
    async fn test_addfeed_creates_feed_and_follow() {
        let (mut ctx, store, out) = sqlite_context();
        run(&mut ctx, "register", &["alice"]).await.unwrap();
        let alice = store.get_user("alice").unwrap();
        out.take();

        run(&mut ctx, "addfeed", &["Blog", FEED_URL]).await.unwrap();

        let feeds = store.list_feeds().unwrap();
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].name, "Blog");
        assert_eq!(feeds[0].url, FEED_URL);
        assert_eq!(feeds[0].user_id, alice.id);

        let follows = store.feed_follows_for_user(alice.id).unwrap();
        assert_eq!(follows.len(), 1);
        assert_eq!(follows[0].follow.feed_id, feeds[0].id);

        let printed = out.take();
        assert!(printed.starts_with("Feed created successfully:\n"));
        assert!(printed.contains(&format!("ID: {}\n", feeds[0].id)));
        assert!(printed.contains("Name: Blog\n"));
        assert!(printed.contains(&format!("URL: {}\n", FEED_URL)));
        assert!(printed.contains(&format!("User ID: {}\n", alice.id)));

        run(&mut ctx, "following", &[]).await.unwrap();
        assert_eq!(out.take(), "* Blog\n");

        run(&mut ctx, "feeds", &[]).await.unwrap();
        assert_eq!(
            out.take(),
            format!("* Blog\n  URL: {}\n  Owner: alice\n", FEED_URL)
        );
    }

    #[tokio::test]
    async fn test_listings_when_empty() {
        let (mut ctx, _store, out) = sqlite_context();
        run(&mut ctx, "feeds", &[]).await.unwrap();
        assert_eq!(out.take(), "No feeds\n");

        run(&mut ctx, "register", &["alice"]).await.unwrap();
        out.take();
        run(&mut ctx, "following", &[]).await.unwrap();
        assert_eq!(out.take(), "Not following any feeds\n");
    }

    #[tokio::test]
    async fn test_addfeed_rejects_invalid_url() {
        let (mut ctx, store, _out) = sqlite_context();
        run(&mut ctx, "register", &["alice"]).await.unwrap();

        let err = run(&mut ctx, "addfeed", &["Blog", "not a url"])
            .await
            .unwrap_err();
        assert!(matches!(err, GatorError::InvalidUrl(_)));
        assert!(store.list_feeds().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_addfeed_stores_url_as_given() {
        let (mut ctx, store, _out) = sqlite_context();
        run(&mut ctx, "register", &["alice"]).await.unwrap();

        run(&mut ctx, "addfeed", &["Blog", "HTTP://Example.com"])
            .await
            .unwrap();
        assert_eq!(store.list_feeds().unwrap()[0].url, "HTTP://Example.com");

        run(&mut ctx, "unfollow", &["HTTP://Example.com"]).await.unwrap();
    }

    #[tokio::test]
    async fn test_unfollow_keeps_feed() {
        let (mut ctx, store, out) = sqlite_context();
        run(&mut ctx, "register", &["alice"]).await.unwrap();
        run(&mut ctx, "addfeed", &["Blog", FEED_URL]).await.unwrap();
        let alice = store.get_user("alice").unwrap();
        out.take();

        run(&mut ctx, "unfollow", &[FEED_URL]).await.unwrap();
        assert_eq!(out.take(), format!("Unfollowed {}\n", FEED_URL));

        assert!(store.feed_follows_for_user(alice.id).unwrap().is_empty());
        assert_eq!(store.list_feeds().unwrap().len(), 1);

        run(&mut ctx, "following", &[]).await.unwrap();
        assert_eq!(out.take(), "Not following any feeds\n");
        run(&mut ctx, "feeds", &[]).await.unwrap();
        assert!(out.take().contains("Owner: alice"));

        let err = run(&mut ctx, "unfollow", &[FEED_URL]).await.unwrap_err();
        assert!(matches!(err, GatorError::NotFollowing(url) if url == FEED_URL));
    }

    #[tokio::test]
    async fn test_follow_other_users_feed() {
        let (mut ctx, store, out) = sqlite_context();
        run(&mut ctx, "register", &["alice"]).await.unwrap();
        run(&mut ctx, "addfeed", &["Blog", FEED_URL]).await.unwrap();
        run(&mut ctx, "register", &["bob"]).await.unwrap();
        out.take();

        run(&mut ctx, "follow", &[FEED_URL]).await.unwrap();
        assert_eq!(out.take(), "bob is now following Blog\n");

        let bob = store.get_user("bob").unwrap();
        let follows = store.feed_follows_for_user(bob.id).unwrap();
        assert_eq!(follows.len(), 1);
        assert_eq!(follows[0].feed_url, FEED_URL);
    }

    #[tokio::test]
    async fn test_follow_unknown_feed() {
        let (mut ctx, _store, _out) = sqlite_context();
        run(&mut ctx, "register", &["alice"]).await.unwrap();

        let err = run(&mut ctx, "follow", &["http://nowhere/rss"])
            .await
            .unwrap_err();
        assert!(matches!(err, GatorError::FeedNotFound(_)));
    }

    #[tokio::test]
    async fn test_authenticated_commands_require_login() {
        let (mut ctx, _store, _out) = sqlite_context();

        for (name, args) in [
            ("addfeed", vec!["Blog", FEED_URL]),
            ("follow", vec![FEED_URL]),
            ("following", vec![]),
            ("unfollow", vec![FEED_URL]),
        ] {
            let err = run(&mut ctx, name, &args).await.unwrap_err();
            assert!(matches!(err, GatorError::NotLoggedIn), "{name}");
        }
    }

    #[tokio::test]
    async fn test_wrong_arity_touches_no_store() {
        let (mut ctx, spy) = spy_context("alice");

        for (name, args) in [
            ("login", vec![]),
            ("login", vec!["a", "b"]),
            ("register", vec![]),
            ("agg", vec!["a", "b"]),
            ("addfeed", vec!["Blog"]),
            ("follow", vec![]),
            ("unfollow", vec!["a", "b"]),
        ] {
            let err = run(&mut ctx, name, &args).await.unwrap_err();
            assert!(matches!(err, GatorError::Argument { .. }), "{name}");
        }

        assert_eq!(spy.calls(), 0);
    }

    #[tokio::test]
    async fn test_agg_fetches_given_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<rss><channel><title>Mock</title><item><title>One</title></item></channel></rss>",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let (mut ctx, _store, out) = sqlite_context();
        let url = format!("{}/index.xml", server.uri());
        run(&mut ctx, "agg", &[url.as_str()]).await.unwrap();

        let printed = out.take();
        assert!(printed.starts_with("Mock\n"));
        assert!(printed.contains("* One\n"));
    }

    #[tokio::test]
    async fn test_agg_surfaces_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<rss><channel>"))
            .mount(&server)
            .await;

        let (mut ctx, _store, _out) = sqlite_context();
        let url = format!("{}/index.xml", server.uri());
        let err = run(&mut ctx, "agg", &[url.as_str()]).await.unwrap_err();
        assert!(matches!(err, GatorError::Parse(_)));
    }
}
