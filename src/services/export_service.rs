use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as Base64, Engine as _};
use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use sha2::{Digest, Sha256};
use tar::{Builder, Header};
use tracing::{info, warn};

use crate::db::repositories::note_repository::NoteRepository;
use crate::db::repositories::photo_repository::PhotoRepository;
use crate::db::repositories::weight_repository::WeightRepository;
use crate::db::repositories::workout_log_repository::WorkoutLogRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::tracker::ProgressPhotoRecord;
use crate::services::settings_service::SettingsService;

const BUNDLE_VERSION: u32 = 1;

#[derive(Debug, Clone)]
pub struct ExportBundle {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Packages the full progress history (weights, notes, workout log, photos)
/// into a portable `.tar.gz` bundle.
pub struct ExportService {
    db: DbPool,
    settings: Arc<SettingsService>,
}

impl ExportService {
    pub fn new(db: DbPool, settings: Arc<SettingsService>) -> Self {
        Self { db, settings }
    }

    pub fn build_bundle(&self) -> AppResult<ExportBundle> {
        let (weights, notes, logs, photos) = self.db.with_connection(|conn| {
            Ok((
                WeightRepository::list_all(conn)?,
                NoteRepository::list_all(conn)?,
                WorkoutLogRepository::list_all(conn)?,
                PhotoRepository::list_all(conn)?,
            ))
        })?;

        let settings = self.settings.get()?;
        let exported_at = Utc::now();
        let (weight_count, note_count, photo_count) = (weights.len(), notes.len(), photos.len());

        let photo_index: Vec<_> = photos
            .iter()
            .map(|photo| {
                json!({
                    "id": photo.id,
                    "entryDate": photo.entry_date,
                    "note": photo.note,
                    "createdAt": photo.created_at,
                    "file": photo_file_name(photo),
                })
            })
            .collect();

        let progress = json!({
            "exportedAt": exported_at.to_rfc3339(),
            "settings": settings,
            "weights": weights,
            "notes": notes,
            "workoutLog": logs,
            "photos": photo_index,
        });
        let progress_json = serde_json::to_string_pretty(&progress)?;

        let manifest = json!({
            "version": BUNDLE_VERSION,
            "checksum": checksum(&progress_json),
        });
        let manifest_json = serde_json::to_string_pretty(&manifest)?;

        let mtime = exported_at.timestamp().max(0) as u64;
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = Builder::new(encoder);

        append_file(&mut builder, "manifest.json", manifest_json.as_bytes(), mtime)?;
        append_file(&mut builder, "progress.json", progress_json.as_bytes(), mtime)?;

        let mut skipped = 0usize;
        for photo in &photos {
            match decode_data_url(&photo.data_url) {
                Some(bytes) => {
                    let path = format!("photos/{}", photo_file_name(photo));
                    append_file(&mut builder, &path, &bytes, mtime)?;
                }
                None => {
                    skipped += 1;
                    warn!(
                        target: "app::export",
                        photo_id = %photo.id,
                        "photo payload is not a decodable data URL, skipping"
                    );
                }
            }
        }

        let encoder = builder
            .into_inner()
            .map_err(|err| AppError::other(format!("打包导出文件失败: {err}")))?;
        let bytes = encoder
            .finish()
            .map_err(|err| AppError::other(format!("压缩导出文件失败: {err}")))?;

        info!(
            target: "app::export",
            weights = weight_count,
            notes = note_count,
            photos = photo_count - skipped,
            skipped,
            "export bundle built"
        );

        Ok(ExportBundle {
            filename: format!(
                "getfit-export-{}.tar.gz",
                exported_at.format("%Y%m%d%H%M%S")
            ),
            bytes,
        })
    }
}

fn append_file(
    builder: &mut Builder<GzEncoder<Vec<u8>>>,
    path: &str,
    data: &[u8],
    mtime: u64,
) -> AppResult<()> {
    let mut header = Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(mtime);
    header.set_cksum();
    builder.append_data(&mut header, path, data)?;
    Ok(())
}

fn checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn photo_file_name(photo: &ProgressPhotoRecord) -> String {
    let short_id: String = photo.id.chars().take(8).collect();
    format!(
        "{}-{}.{}",
        photo.entry_date,
        short_id,
        data_url_extension(&photo.data_url)
    )
}

fn data_url_extension(data_url: &str) -> &'static str {
    let mime = data_url
        .strip_prefix("data:")
        .and_then(|rest| rest.split(';').next())
        .unwrap_or("");

    match mime {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

fn decode_data_url(data_url: &str) -> Option<Vec<u8>> {
    let encoded = data_url.split("base64,").nth(1)?;
    Base64.decode(encoded.trim().as_bytes()).ok()
}
