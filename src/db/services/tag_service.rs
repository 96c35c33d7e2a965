use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::error::TagStoreError;
use crate::db::models::{FilterCriteria, NewTag, PhotoTag, TagPatch};
use crate::db::sql_http::{row_text, Row, SqlExecutor, Statement};

/// Result of a sparse tag update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    /// The patch carried no fields; nothing was written and `updatedAt` is untouched.
    Unchanged,
}

/// Persistence contract for photo tags.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// `false` when no database is configured. Reads then return nothing and writes fail.
    fn is_configured(&self) -> bool;

    async fn init_schema(&self) -> Result<(), TagStoreError>;

    /// Tags for one photo, newest first.
    async fn get_tags(&self, photo_id: &str) -> Result<Vec<PhotoTag>, TagStoreError>;

    async fn add_tag(&self, photo_id: &str, tag: &NewTag) -> Result<String, TagStoreError>;

    async fn update_tag(&self, tag_id: &str, patch: &TagPatch) -> Result<UpdateOutcome, TagStoreError>;

    /// Deleting an unknown id is a no-op.
    async fn delete_tag(&self, tag_id: &str) -> Result<(), TagStoreError>;

    /// Returns the number of tags removed.
    async fn delete_tags_for_photo(&self, photo_id: &str) -> Result<u64, TagStoreError>;

    /// Substring match per supplied field, ANDed, newest first.
    async fn search_tags(&self, criteria: &FilterCriteria) -> Result<Vec<PhotoTag>, TagStoreError>;
}

const SCHEMA: [&str; 5] = [
    "CREATE TABLE IF NOT EXISTS photo_tags (
        id TEXT PRIMARY KEY,
        photoId TEXT NOT NULL,
        recordId TEXT,
        bandNumber TEXT,
        date TEXT,
        location TEXT,
        species TEXT,
        age TEXT,
        sex TEXT,
        firstPhotoNumber TEXT,
        lastPhotoNumber TEXT,
        wrpPlumageCode TEXT,
        notes TEXT,
        createdAt TEXT NOT NULL,
        updatedAt TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_photo_tags_photoId ON photo_tags(photoId)",
    "CREATE INDEX IF NOT EXISTS idx_photo_tags_recordId ON photo_tags(recordId)",
    "CREATE INDEX IF NOT EXISTS idx_photo_tags_bandNumber ON photo_tags(bandNumber)",
    "CREATE INDEX IF NOT EXISTS idx_photo_tags_species ON photo_tags(species)",
];

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `tag_<unix millis>_<9 random base36 chars>`.
pub fn generate_tag_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..9)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("tag_{}_{}", Utc::now().timestamp_millis(), suffix)
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn escape_like(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len() + 2);
    escaped.push('%');
    for c in pattern.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

const INSERT_COLUMNS: [&str; 14] = [
    "id",
    "photoId",
    "recordId",
    "bandNumber",
    "date",
    "location",
    "species",
    "age",
    "sex",
    "firstPhotoNumber",
    "lastPhotoNumber",
    "wrpPlumageCode",
    "notes",
    "createdAt",
];

/// Absent optionals are NULL; a present value is stored as given, blank included.
fn optional(value: Option<&str>) -> serde_json::Value {
    value.map_or(serde_json::Value::Null, Into::into)
}

pub fn build_insert_statement(tag_id: &str, photo_id: &str, tag: &NewTag, created_at: &str) -> Statement {
    let placeholders = vec!["?"; INSERT_COLUMNS.len()].join(", ");
    Statement::new(format!(
        "INSERT INTO photo_tags ({}) VALUES ({placeholders})",
        INSERT_COLUMNS.join(", ")
    ))
    .bind(tag_id)
    .bind(photo_id)
    .bind(tag.record_id.as_str())
    .bind(tag.band_number.as_str())
    .bind(tag.date.as_str())
    .bind(tag.location.as_str())
    .bind(tag.species.as_str())
    .bind(tag.age.as_str())
    .bind(tag.sex.as_str())
    .bind(optional(tag.first_photo_number.as_deref()))
    .bind(optional(tag.last_photo_number.as_deref()))
    .bind(optional(tag.wrp_plumage_code.as_deref()))
    .bind(optional(tag.notes.as_deref()))
    .bind(created_at)
}

/// `None` when the patch has no fields.
pub fn build_update_statement(tag_id: &str, patch: &TagPatch, updated_at: &str) -> Option<Statement> {
    let assignments = patch.assignments();
    if assignments.is_empty() {
        return None;
    }

    let set_clause = assignments
        .iter()
        .map(|(column, _)| format!("{column} = ?"))
        .chain(std::iter::once("updatedAt = ?".to_string()))
        .collect::<Vec<_>>()
        .join(", ");

    let mut statement = Statement::new(format!(
        "UPDATE photo_tags SET {set_clause} WHERE id = ? RETURNING id"
    ));
    for (_, value) in assignments {
        statement = statement.bind(value);
    }
    Some(statement.bind(updated_at).bind(tag_id))
}

pub fn build_search_statement(criteria: &FilterCriteria) -> Statement {
    let active = criteria.active_fields();
    let mut query = String::from("SELECT * FROM photo_tags WHERE 1=1");
    for (field, _) in &active {
        query.push_str(&format!(" AND {} LIKE ? ESCAPE '\\'", field.column()));
    }
    query.push_str(" ORDER BY createdAt DESC");

    active
        .into_iter()
        .fold(Statement::new(query), |statement, (_, pattern)| {
            statement.bind(escape_like(pattern))
        })
}

pub fn row_to_photo_tag(row: &Row) -> Result<PhotoTag, TagStoreError> {
    let id = row_text(row, "id").ok_or_else(|| TagStoreError::Decode("tag row without id".to_string()))?;
    let text = |column: &str| row_text(row, column).unwrap_or_default();
    Ok(PhotoTag {
        id,
        photo_id: text("photoId"),
        record_id: text("recordId"),
        band_number: text("bandNumber"),
        date: text("date"),
        location: text("location"),
        species: text("species"),
        age: text("age"),
        sex: text("sex"),
        first_photo_number: row_text(row, "firstPhotoNumber"),
        last_photo_number: row_text(row, "lastPhotoNumber"),
        wrp_plumage_code: row_text(row, "wrpPlumageCode"),
        notes: row_text(row, "notes"),
        created_at: text("createdAt"),
        updated_at: row_text(row, "updatedAt"),
    })
}

fn rows_to_tags(rows: Vec<Row>) -> Result<Vec<PhotoTag>, TagStoreError> {
    rows.iter().map(row_to_photo_tag).collect()
}

/// Tag store backed by the SQL-over-HTTP database.
#[derive(Clone)]
pub struct TagService {
    executor: Option<Arc<dyn SqlExecutor>>,
}

impl TagService {
    pub fn new(executor: Arc<dyn SqlExecutor>) -> Self {
        Self {
            executor: Some(executor),
        }
    }

    pub fn unconfigured() -> Self {
        warn!("Tag database not configured. Tag reads will be empty and writes will fail.");
        Self { executor: None }
    }

    fn executor(&self) -> Result<&Arc<dyn SqlExecutor>, TagStoreError> {
        self.executor.as_ref().ok_or(TagStoreError::NotConfigured)
    }
}

#[async_trait]
impl TagRepository for TagService {
    fn is_configured(&self) -> bool {
        self.executor.is_some()
    }

    async fn init_schema(&self) -> Result<(), TagStoreError> {
        let executor = self.executor()?;
        info!("Creating photo_tags table and indexes.");
        executor
            .execute_batch(SCHEMA.iter().map(|q| Statement::new(*q)).collect())
            .await?;
        Ok(())
    }

    async fn get_tags(&self, photo_id: &str) -> Result<Vec<PhotoTag>, TagStoreError> {
        let Some(executor) = &self.executor else {
            return Ok(Vec::new());
        };
        let rows = executor
            .execute(
                Statement::new("SELECT * FROM photo_tags WHERE photoId = ? ORDER BY createdAt DESC")
                    .bind(photo_id),
            )
            .await?;
        debug!(photo_id, count = rows.len(), "Fetched tags for photo.");
        rows_to_tags(rows)
    }

    async fn add_tag(&self, photo_id: &str, tag: &NewTag) -> Result<String, TagStoreError> {
        let executor = self.executor()?;
        let tag_id = generate_tag_id();
        executor
            .execute(build_insert_statement(&tag_id, photo_id, tag, &now_iso()))
            .await?;
        info!(photo_id, tag_id = %tag_id, "Tag inserted.");
        Ok(tag_id)
    }

    async fn update_tag(&self, tag_id: &str, patch: &TagPatch) -> Result<UpdateOutcome, TagStoreError> {
        let executor = self.executor()?;
        let Some(statement) = build_update_statement(tag_id, patch, &now_iso()) else {
            debug!(tag_id, "Empty tag patch, nothing to update.");
            return Ok(UpdateOutcome::Unchanged);
        };
        let rows = executor.execute(statement).await?;
        if rows.is_empty() {
            return Err(TagStoreError::NotFound(format!("Tag with id {tag_id} not found")));
        }
        Ok(UpdateOutcome::Updated)
    }

    async fn delete_tag(&self, tag_id: &str) -> Result<(), TagStoreError> {
        let executor = self.executor()?;
        let rows = executor
            .execute(Statement::new("DELETE FROM photo_tags WHERE id = ? RETURNING id").bind(tag_id))
            .await?;
        if rows.is_empty() {
            debug!(tag_id, "Delete matched no tag.");
        }
        Ok(())
    }

    async fn delete_tags_for_photo(&self, photo_id: &str) -> Result<u64, TagStoreError> {
        let executor = self.executor()?;
        let rows = executor
            .execute(Statement::new("DELETE FROM photo_tags WHERE photoId = ? RETURNING id").bind(photo_id))
            .await?;
        info!(photo_id, count = rows.len(), "Deleted tags for photo.");
        Ok(rows.len() as u64)
    }

    async fn search_tags(&self, criteria: &FilterCriteria) -> Result<Vec<PhotoTag>, TagStoreError> {
        let Some(executor) = &self.executor else {
            return Ok(Vec::new());
        };
        let rows = executor.execute(build_search_statement(criteria)).await?;
        rows_to_tags(rows)
    }
}
