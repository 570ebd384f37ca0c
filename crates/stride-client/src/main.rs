//! # stride
//!
//! Command-line front end for the Stride feeds: browse the activity feed,
//! read and write comments, like activities and follow people.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::info;

use stride_client::{init_tracing, ClientConfig, Session};
use stride_feed::{
    ActivityFeed, ActivityFilter, FeedEvent, LoadMore, MutationOutcome, TriggerOutcome,
    ViewportSample,
};
use stride_shared::constants::APP_NAME;
use stride_shared::{Activity, ActivityId, Comment, CommentId, GoalId, UserId};

#[derive(Parser)]
#[command(name = "stride")]
#[command(about = "Browse and interact with Stride feeds")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the activity feed
    Feed {
        #[command(flatten)]
        filter: FilterArgs,

        /// Number of pages to load
        #[arg(long, short, default_value_t = 1)]
        pages: u32,
    },

    /// Show an activity's comments, optionally posting one
    Comments {
        /// Activity ID
        activity_id: String,

        /// Text to post
        #[arg(long)]
        post: Option<String>,

        /// Post as a reply to this comment or reply
        #[arg(long, requires = "post")]
        reply_to: Option<String>,
    },

    /// Like or unlike an activity from the public feed
    Like {
        /// Activity ID
        activity_id: String,
    },

    /// Show people to follow, optionally following one
    Discover {
        /// User ID to follow or unfollow
        #[arg(long)]
        follow: Option<String>,
    },
}

#[derive(clap::Args)]
struct FilterArgs {
    /// All public activities instead of followed users
    #[arg(long, conflicts_with_all = ["goal", "user"])]
    everyone: bool,

    /// Stories of one goal
    #[arg(long, conflicts_with = "user")]
    goal: Option<String>,

    /// Activities of one user
    #[arg(long)]
    user: Option<String>,
}

impl FilterArgs {
    fn filter(&self) -> ActivityFilter {
        if let Some(goal) = &self.goal {
            ActivityFilter::Goal(GoalId::new(goal.as_str()))
        } else if let Some(user) = &self.user {
            ActivityFilter::User(UserId::new(user.as_str()))
        } else if self.everyone {
            ActivityFilter::Everyone
        } else {
            ActivityFilter::Following
        }
    }
}

/// Viewport position that puts the sentinel just inside the prefetch margin.
const SENTINEL_IN_VIEW: ViewportSample = ViewportSample {
    viewport_bottom: 800.0,
    sentinel_top: 800.0,
};

/// Pages searched for an activity before liking it.
const LIKE_SEARCH_PAGES: u32 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Tracing and configuration
    // -----------------------------------------------------------------------
    init_tracing();
    let cli = Cli::parse();
    info!("Starting {} client v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    info!(
        api_url = %config.api_url,
        timeout_secs = config.request_timeout.as_secs(),
        feed = ?config.feed,
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 2. Session and toasts
    // -----------------------------------------------------------------------
    let (session, events) = Session::connect(&config).context("Failed to create session")?;
    let toasts = tokio::spawn(print_toasts(events));

    // -----------------------------------------------------------------------
    // 3. Command
    // -----------------------------------------------------------------------
    let result = match cli.command {
        None => overview(&session).await,
        Some(Commands::Feed { filter, pages }) => show_feed(&session, filter.filter(), pages).await,
        Some(Commands::Comments {
            activity_id,
            post,
            reply_to,
        }) => show_comments(&session, ActivityId::new(activity_id), post, reply_to).await,
        Some(Commands::Like { activity_id }) => like(&session, ActivityId::new(activity_id)).await,
        Some(Commands::Discover { follow }) => discover(&session, follow.map(UserId::new)).await,
    };

    toasts.abort();
    result
}

async fn print_toasts(mut events: broadcast::Receiver<FeedEvent>) {
    loop {
        match events.recv().await {
            Ok(FeedEvent::MutationFailed { target, error, .. }) => {
                eprintln!("! Could not update {target}: {error}");
            }
            Ok(FeedEvent::LoadFailed { feed, page, error }) => {
                eprintln!("! Could not load {feed} page {page}: {error}");
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn overview(session: &Session) -> anyhow::Result<()> {
    let feed = session.activity_feed(ActivityFilter::Following);
    let people = session.discover();

    let (activities, users) =
        futures::try_join!(feed.load_first_page(false), people.load_first_page(false))?;

    println!("== Following ==");
    activities.items.iter().for_each(print_activity);
    println!();
    println!("== People to follow ==");
    for user in &users.items {
        println!(
            "{:<20} @{:<16} {} followers{}",
            user.display_name,
            user.username,
            user.followers_count,
            if user.is_following { "  (following)" } else { "" }
        );
    }
    Ok(())
}

async fn show_feed(session: &Session, filter: ActivityFilter, pages: u32) -> anyhow::Result<()> {
    let feed = session.activity_feed(filter);
    feed.load_first_page(false).await?;
    scroll(session, &feed, pages.saturating_sub(1)).await?;

    for activity in feed.items() {
        print_activity(&activity);
    }
    let pagination = feed.pagination();
    if pagination.has_more {
        println!("... more after page {}", pagination.page);
    }
    Ok(())
}

/// Scroll to the bottom `pages` times, or until the feed runs out.
async fn scroll(session: &Session, feed: &Arc<ActivityFeed>, pages: u32) -> anyhow::Result<()> {
    let trigger = session.scroll_trigger(Arc::clone(feed));
    for _ in 0..pages {
        match trigger.on_viewport(SENTINEL_IN_VIEW).await? {
            TriggerOutcome::Loaded(LoadMore::Appended { has_more: false, .. })
            | TriggerOutcome::Stopped => break,
            _ => {}
        }
    }
    trigger.disconnect();
    Ok(())
}

async fn show_comments(
    session: &Session,
    activity_id: ActivityId,
    post: Option<String>,
    reply_to: Option<String>,
) -> anyhow::Result<()> {
    let thread = session.comment_thread(activity_id);
    thread.load_first_page(false).await?;

    if let Some(text) = post {
        if let Some(parent) = reply_to {
            thread.start_reply(&CommentId::new(parent))?;
        }
        thread.set_draft(text);
        thread.submit().await?;
    }

    for comment in thread.items() {
        print_comment(&comment);
    }
    Ok(())
}

async fn like(session: &Session, activity_id: ActivityId) -> anyhow::Result<()> {
    let feed = session.activity_feed(ActivityFilter::Everyone);
    feed.load_first_page(false).await?;
    let mut searched = 1;
    while feed.get(&activity_id).is_none() && searched < LIKE_SEARCH_PAGES {
        match feed.load_more().await? {
            LoadMore::Appended { .. } => searched += 1,
            LoadMore::Skipped | LoadMore::Stale => break,
        }
    }

    match feed.toggle_like(&activity_id).await? {
        MutationOutcome::Applied(state) => println!(
            "{} {activity_id} ({} likes)",
            if state.active { "Liked" } else { "Unliked" },
            state.count
        ),
        MutationOutcome::Skipped | MutationOutcome::Discarded => {}
    }
    Ok(())
}

async fn discover(session: &Session, follow: Option<UserId>) -> anyhow::Result<()> {
    let people = session.discover();
    people.load_first_page(false).await?;

    if let Some(user_id) = follow {
        if let Some(state) = people.toggle_follow(&user_id).await?.applied() {
            println!(
                "{} {user_id} ({} followers)",
                if state.active { "Following" } else { "Unfollowed" },
                state.count
            );
        }
    }

    for user in people.items() {
        let marker = if user.is_following { "*" } else { " " };
        println!("{marker} {} (@{}) {} goals", user.display_name, user.username, user.goals_count);
    }
    Ok(())
}

fn print_activity(activity: &Activity) {
    println!(
        "{}  {}  [{} likes, {} comments]  #{}",
        activity.created_at.format("%Y-%m-%d %H:%M"),
        activity.summary(),
        activity.like_count,
        activity.comment_count,
        activity.id
    );
}

fn print_comment(comment: &Comment) {
    println!(
        "{} ({}): {}  [{} likes]  #{}",
        comment.author.display_name,
        comment.created_at.format("%Y-%m-%d %H:%M"),
        comment.text,
        comment.like_count,
        comment.id
    );
    for reply in &comment.replies {
        let mention = reply
            .mention
            .as_ref()
            .map(|m| format!("@{} ", m.username))
            .unwrap_or_default();
        println!(
            "    {}: {mention}{}  #{}",
            reply.author.display_name, reply.text, reply.id
        );
    }
}
