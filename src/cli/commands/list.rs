//! List and delete commands for stored video metadata.

use crate::cli::Output;
use crate::config::Settings;
use crate::store::{MetadataStore, SqliteMetadataStore};
use anyhow::Result;

/// Run the list command.
pub async fn run_list(limit: Option<usize>, settings: Settings) -> Result<()> {
    let store = SqliteMetadataStore::new(&settings.sqlite_path())?;

    match store.list(limit).await {
        Ok(videos) => {
            if videos.is_empty() {
                Output::info("No videos yet. Use 'reelsmith generate <topic>' to make one.");
            } else {
                Output::header(&format!("Generated Videos ({})", videos.len()));
                println!();

                for video in &videos {
                    Output::video_info(
                        video.id,
                        &video.title,
                        &video.content_type.to_string(),
                        &video.created_at.format("%Y-%m-%d %H:%M").to_string(),
                        &video.video_path,
                    );
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list videos: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

/// Run the delete command.
pub async fn run_delete(id: i64, purge: bool, settings: Settings) -> Result<()> {
    let store = SqliteMetadataStore::new(&settings.sqlite_path())?;

    let Some(video) = store.get(id).await? else {
        Output::warning(&format!("No video with id {}", id));
        return Ok(());
    };

    store.delete(id).await?;
    Output::success(&format!("Deleted metadata for #{} ({})", id, video.title));

    if purge {
        match std::fs::remove_file(&video.video_path) {
            Ok(()) => Output::info(&format!("Removed {}", video.video_path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Output::warning(&format!("{} was already gone", video.video_path));
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
