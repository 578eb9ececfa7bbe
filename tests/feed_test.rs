use std::sync::Arc;

use redblack::config::Config;
use redblack::db::{self, models::MediaKind, models::Post, records::RecordStore, RECORD_MIGRATIONS};
use redblack::error::ErrorKind;
use redblack::feed::MediaView;
use redblack::state::{AppState, MediaUpload};
use redblack::storage::{DynMediaStore, MediaStore, SqliteMediaStore};
use tempfile::TempDir;

struct Harness {
    state: AppState,
    records: RecordStore,
    media: Arc<SqliteMediaStore>,
    _temp: TempDir,
}

fn harness() -> Harness {
    let temp = TempDir::new().unwrap();
    let pool = db::open(&temp.path().join("records.db"), RECORD_MIGRATIONS)
        .expect("Failed to open record store");
    let records = RecordStore::new(pool);
    let media = Arc::new(SqliteMediaStore::open(&temp.path().join("media.db")).unwrap());
    let dyn_media: DynMediaStore = media.clone();

    let state = AppState::from_parts(records.clone(), dyn_media, Config::default()).unwrap();
    Harness {
        state,
        records,
        media,
        _temp: temp,
    }
}

fn image() -> Option<MediaUpload> {
    Some(MediaUpload::new("image/jpeg", &b"\xff\xd8\xff"[..]))
}

#[tokio::test]
async fn test_toggle_like_twice_is_identity() {
    let mut h = harness();
    h.state.register("alice", "secret1").unwrap();
    let post = h.state.create_post(image(), "hello").await.unwrap();

    let before = h.state.find_post(&post.id).unwrap().likes;
    h.state.toggle_like(&post.id).unwrap();
    assert_eq!(h.state.find_post(&post.id).unwrap().likes.len(), 1);
    h.state.toggle_like(&post.id).unwrap();

    let after = h.state.find_post(&post.id).unwrap().likes;
    assert_eq!(before, after);
    assert!(after.is_empty());
}

#[tokio::test]
async fn test_usernames_are_unique_ignoring_case() {
    let mut h = harness();
    h.state.register("Alice", "secret1").unwrap();
    h.state.logout();

    let err = h.state.register("alice", "another1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_created_post_reads_back_unchanged() {
    let mut h = harness();
    h.state.register("alice", "secret1").unwrap();

    let video = Some(MediaUpload::new("video/mp4", &b"\x00\x00\x00\x18ftyp"[..]));
    let post = h.state.create_post(video, "skate clip").await.unwrap();
    let found = h.state.find_post(&post.id).unwrap();
    assert_eq!(found.description, "skate clip");
    assert_eq!(found.media_kind, MediaKind::Video);
    assert_eq!(found.mime, "video/mp4");

    let long = "z".repeat(1200);
    let post = h.state.create_post(image(), &long).await.unwrap();
    let found = h.state.find_post(&post.id).unwrap();
    assert_eq!(found.description, "z".repeat(1000));
}

#[tokio::test]
async fn test_feed_is_newest_first() {
    let mut h = harness();
    for ts in [100, 300, 200] {
        let post = Post::new("alice", "p", format!("m{}", ts), MediaKind::Image, "image/png", ts);
        redblack::posts::PostStore::new(h.records.clone())
            .insert(post)
            .unwrap();
    }

    let feed = h.state.build_feed("").await.unwrap();
    let order: Vec<i64> = feed.posts.iter().map(|p| p.created_at).collect();
    assert_eq!(order, vec![300, 200, 100]);
}

#[tokio::test]
async fn test_feed_search_filters() {
    let mut h = harness();
    h.state.register("alice", "secret1").unwrap();
    h.state.create_post(image(), "cat video").await.unwrap();
    let dog = h.state.create_post(image(), "dog photo").await.unwrap();

    let feed = h.state.build_feed("dog").await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed.posts[0].id, dog.id);
}

#[tokio::test]
async fn test_mutations_require_session() {
    let mut h = harness();
    h.state.register("alice", "secret1").unwrap();
    let post = h.state.create_post(image(), "mine").await.unwrap();
    h.state.logout();

    assert_eq!(
        h.state.create_post(image(), "x").await.unwrap_err().kind(),
        ErrorKind::Unauthenticated
    );
    assert_eq!(
        h.state.toggle_like(&post.id).unwrap_err().kind(),
        ErrorKind::Unauthenticated
    );
    assert_eq!(
        h.state.add_comment(&post.id, "hi").unwrap_err().kind(),
        ErrorKind::Unauthenticated
    );

    // Nothing changed while signed out
    let unchanged = h.state.find_post(&post.id).unwrap();
    assert!(unchanged.likes.is_empty());
    assert!(unchanged.comments.is_empty());

    h.state.login("ALICE", "secret1").unwrap();
    let liked = h.state.toggle_like(&post.id).unwrap();
    assert!(liked.is_liked_by("alice"));
    let comment = h.state.add_comment(&post.id, "  first!  ").unwrap();
    assert_eq!(comment.text, "first!");
    assert_eq!(comment.user, "alice");
    h.state.create_post(image(), "second").await.unwrap();
}

#[tokio::test]
async fn test_comment_display_cap() {
    let mut h = harness();
    h.state.register("alice", "secret1").unwrap();
    let busy = h.state.create_post(image(), "busy").await.unwrap();
    let quiet = h.state.create_post(image(), "quiet").await.unwrap();
    for i in 0..15 {
        h.state.add_comment(&busy.id, &format!("comment {}", i)).unwrap();
    }
    for i in 0..10 {
        h.state.add_comment(&quiet.id, &format!("comment {}", i)).unwrap();
    }

    let feed = h.state.build_feed("").await.unwrap();
    let busy_view = feed.posts.iter().find(|p| p.id == busy.id).unwrap();
    assert_eq!(busy_view.comments.len(), 12);
    assert!(busy_view.more_comments);
    assert_eq!(busy_view.comments[0].text, "comment 14");

    let quiet_view = feed.posts.iter().find(|p| p.id == quiet.id).unwrap();
    assert_eq!(quiet_view.comments.len(), 10);
    assert!(!quiet_view.more_comments);
}

#[tokio::test]
async fn test_missing_media_is_not_an_error() {
    let mut h = harness();
    h.state.register("alice", "secret1").unwrap();
    let post = h.state.create_post(image(), "ephemeral").await.unwrap();

    // Blob store cleared independently of the records
    assert!(h.media.delete(&post.media_id).await.unwrap());

    let feed = h.state.build_feed("").await.unwrap();
    assert_eq!(feed.posts[0].media, MediaView::Unavailable);
    assert!(h.state.post_media(&post.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_viewer_relative_like_state() {
    let mut h = harness();
    h.state.register("alice", "secret1").unwrap();
    let post = h.state.create_post(image(), "p").await.unwrap();
    h.state.toggle_like(&post.id).unwrap();
    h.state.logout();

    h.state.register("bob_2", "secret2").unwrap();
    let feed = h.state.build_feed("").await.unwrap();
    assert!(!feed.posts[0].liked);
    assert_eq!(feed.posts[0].like_count, 1);

    h.state.toggle_like(&post.id).unwrap();
    let feed = h.state.build_feed("").await.unwrap();
    assert!(feed.posts[0].liked);
    assert_eq!(feed.posts[0].like_count, 2);
}

#[tokio::test]
async fn test_corrupt_posts_collection_reads_as_empty() {
    let mut h = harness();
    h.records
        .set(redblack::db::records::POSTS_KEY, "[{\"broken\":")
        .unwrap();

    let feed = h.state.build_feed("").await.unwrap();
    assert!(feed.is_empty());
}

#[tokio::test]
async fn test_unknown_post_is_not_found() {
    let mut h = harness();
    h.state.register("alice", "secret1").unwrap();
    assert_eq!(
        h.state.toggle_like("post_0_0").unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        h.state.add_comment("post_0_0", "hi").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}
