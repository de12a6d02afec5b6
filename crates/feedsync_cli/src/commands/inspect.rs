//! Inspect command implementation.

use feedsync_core::{Collection, Database};
use serde::Serialize;
use std::path::Path;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store path.
    pub path: String,
    /// Content journal size in bytes.
    pub content_journal_bytes: u64,
    /// Preference journal size in bytes.
    pub prefs_journal_bytes: u64,
    /// Last content commit sequence.
    pub sequence: u64,
    /// Committed cursor per collection.
    pub cursors: Vec<CursorInfo>,
    /// Number of topics, shells included.
    pub topic_count: usize,
    /// Number of topics still awaiting content.
    pub shell_count: usize,
    /// Number of news resources.
    pub news_resource_count: usize,
    /// Number of resource-topic relationship rows.
    pub relationship_count: usize,
    /// Followed topic count.
    pub followed_topics: usize,
    /// Bookmark count.
    pub bookmarked: usize,
    /// Viewed resource count.
    pub viewed: usize,
    /// Per-topic statistics (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<TopicStats>>,
}

/// One collection's cursor.
#[derive(Debug, Serialize)]
pub struct CursorInfo {
    /// Collection name.
    pub collection: String,
    /// Cursor value.
    pub value: u64,
}

/// Statistics for a single topic.
#[derive(Debug, Serialize)]
pub struct TopicStats {
    /// Topic id.
    pub id: String,
    /// Topic name, empty for shells.
    pub name: String,
    /// Resources tagged with the topic.
    pub resource_count: usize,
    /// Whether the user follows the topic.
    pub followed: bool,
}

/// Collects inspection data from an open store.
pub fn inspect(db: &Database, show_topics: bool) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let snapshot = db.content().snapshot();
    let prefs = db.preferences().get();

    let topics = show_topics.then(|| {
        snapshot
            .topics()
            .map(|topic| TopicStats {
                id: topic.id.clone(),
                name: topic.name.clone(),
                resource_count: snapshot.resources_for_topic(&topic.id).len(),
                followed: prefs.is_following(&topic.id),
            })
            .collect()
    });

    Ok(InspectResult {
        path: db
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        content_journal_bytes: db.content().journal_size()?,
        prefs_journal_bytes: db.preferences().journal_size()?,
        sequence: snapshot.sequence(),
        cursors: snapshot
            .cursors()
            .iter()
            .map(|c| CursorInfo {
                collection: c.collection.to_string(),
                value: c.value,
            })
            .collect(),
        topic_count: snapshot.len(Collection::Topic),
        shell_count: snapshot.topics().filter(|t| t.is_shell()).count(),
        news_resource_count: snapshot.len(Collection::NewsResource),
        relationship_count: snapshot.relationship_count(),
        followed_topics: prefs.followed_topics.len(),
        bookmarked: prefs.bookmarked.len(),
        viewed: prefs.viewed.len(),
        topics,
    })
}

/// Runs the inspect command.
pub fn run(path: &Path, show_topics: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let db = super::open_store(path, false)?;
    let result = inspect(&db, show_topics)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("feedsync store: {}", result.path);
    println!();
    println!("Journals:");
    println!("  Content:     {} bytes", result.content_journal_bytes);
    println!("  Preferences: {} bytes", result.prefs_journal_bytes);
    println!("  Sequence:    {}", result.sequence);
    println!();
    println!("Cursors:");
    for cursor in &result.cursors {
        println!("  {:<14} {}", cursor.collection, cursor.value);
    }
    println!();
    println!("Content:");
    println!(
        "  Topics:         {} ({} awaiting content)",
        result.topic_count, result.shell_count
    );
    println!("  News resources: {}", result.news_resource_count);
    println!("  Relationships:  {}", result.relationship_count);
    println!();
    println!("Preferences:");
    println!("  Followed topics: {}", result.followed_topics);
    println!("  Bookmarked:      {}", result.bookmarked);
    println!("  Viewed:          {}", result.viewed);

    if let Some(topics) = &result.topics {
        println!();
        println!("Topics:");
        for topic in topics {
            let name = if topic.name.is_empty() { "(shell)" } else { &topic.name };
            println!(
                "  {}{:<10} {:<30} {} resources",
                if topic.followed { "*" } else { " " },
                topic.id,
                name,
                topic.resource_count
            );
        }
    }
}
