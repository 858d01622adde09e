//! CSV-backed durable store.

use std::path::{Path, PathBuf};

use csv_async::{AsyncReader, AsyncWriter};
use futures::StreamExt;
use magpie_types::{Post, PostedAt};
use tokio::fs::File;

use crate::StoreError;

/// Column order of the durable store, fixed for the life of a run.
pub const COLUMNS: [&str; 7] = [
    "author",
    "text",
    "reposts",
    "likes",
    "replies",
    "posted_at",
    "link",
];

/// The durable dataset file, rewritten wholesale on every flush.
///
/// The store assumes a single writer at a time: it is read back in full and
/// atomically replaced (temp file + rename) on each rewrite, so concurrent
/// external mutation between the read and the rename is silently lost.
/// That trade-off is acceptable here because all writes are funneled
/// through one serialized batching writer.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    /// Creates a handle to the store at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the store file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wipes any previous store and writes an empty one with the fixed
    /// header.
    ///
    /// Every harvest starts from a fresh store; resuming into an existing
    /// file is deliberately unsupported.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub async fn init(&self) -> Result<(), StoreError> {
        self.write_all(&[]).await
    }

    /// Reads every row of the store.
    ///
    /// A missing file reads as an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded.
    pub async fn read_all(&self) -> Result<Vec<Post>, StoreError> {
        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source: err,
                });
            }
        };

        let mut reader = AsyncReader::from_reader(file);
        let mut rows = Vec::new();
        let mut records = reader.records();

        while let Some(record) = records.next().await {
            let record = record.map_err(|e| StoreError::Csv {
                path: self.path.clone(),
                source: e,
            })?;
            rows.push(self.decode_row(&record)?);
        }

        Ok(rows)
    }

    /// Atomically replaces the store with the given rows.
    ///
    /// The header is always written, so an empty slice produces a valid
    /// empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the temp file cannot be written or moved into
    /// place.
    pub async fn write_all(&self, posts: &[Post]) -> Result<(), StoreError> {
        let tmp_path = self.tmp_path();
        let write_err = |e: std::io::Error| StoreError::Write {
            path: self.path.clone(),
            source: e,
        };
        let csv_err = |e: csv_async::Error| StoreError::Csv {
            path: self.path.clone(),
            source: e,
        };

        let file = File::create(&tmp_path).await.map_err(write_err)?;
        let mut writer = AsyncWriter::from_writer(file);

        writer.write_record(&COLUMNS).await.map_err(csv_err)?;
        for post in posts {
            let reposts = post.reposts.to_string();
            let likes = post.likes.to_string();
            let replies = post.replies.to_string();
            writer
                .write_record(&[
                    post.author.as_str(),
                    post.text.as_str(),
                    reposts.as_str(),
                    likes.as_str(),
                    replies.as_str(),
                    post.posted_at.as_str(),
                    post.link.as_str(),
                ])
                .await
                .map_err(csv_err)?;
        }
        writer.flush().await.map_err(|e| StoreError::Write {
            path: self.path.clone(),
            source: std::io::Error::other(e),
        })?;
        drop(writer);

        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(write_err)
    }

    fn decode_row(&self, record: &csv_async::StringRecord) -> Result<Post, StoreError> {
        let malformed = |detail: String| StoreError::Malformed {
            path: self.path.clone(),
            detail,
        };

        if record.len() != COLUMNS.len() {
            return Err(malformed(format!(
                "expected {} columns, found {}",
                COLUMNS.len(),
                record.len()
            )));
        }

        let count = |index: usize| -> Result<u64, StoreError> {
            let field = &record[index];
            field.parse().map_err(|_| {
                malformed(format!("column '{}' is not a count: {field:?}", COLUMNS[index]))
            })
        };

        Ok(Post {
            author: record[0].to_string(),
            text: record[1].to_string(),
            reposts: count(2)?,
            likes: count(3)?,
            replies: count(4)?,
            posted_at: PostedAt::parse(&record[5]),
            link: record[6].to_string(),
        })
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn post(link: &str, at: &str) -> Post {
        Post {
            author: "alice".to_string(),
            text: "hello".to_string(),
            reposts: 1,
            likes: 2,
            replies: 3,
            posted_at: PostedAt::parse(at),
            link: link.to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = CsvStore::new(temp_dir.path().join("missing.csv"));

        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_init_writes_header_only() {
        let temp_dir = TempDir::new().unwrap();
        let store = CsvStore::new(temp_dir.path().join("posts.csv"));

        store.init().await.unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            content.trim_end(),
            "author,text,reposts,likes,replies,posted_at,link"
        );
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_init_wipes_previous_content() {
        let temp_dir = TempDir::new().unwrap();
        let store = CsvStore::new(temp_dir.path().join("posts.csv"));

        store
            .write_all(&[post("https://example.net/1", "2018-01-01 00:00:00")])
            .await
            .unwrap();
        store.init().await.unwrap();

        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_preserves_awkward_text() {
        let temp_dir = TempDir::new().unwrap();
        let store = CsvStore::new(temp_dir.path().join("posts.csv"));

        let mut tricky = post("https://example.net/1", "2018-01-01 12:00:00");
        tricky.text = "line one\nline two, with \"quotes\" and , commas".to_string();
        let rows = vec![tricky, post("https://example.net/2", "not a date")];

        store.write_all(&rows).await.unwrap();
        let read_back = store.read_all().await.unwrap();

        assert_eq!(read_back, rows);
        assert_eq!(read_back[1].posted_at.timestamp(), None);
    }

    #[tokio::test]
    async fn test_round_trip_preserves_timestamps() {
        let temp_dir = TempDir::new().unwrap();
        let store = CsvStore::new(temp_dir.path().join("posts.csv"));
        let at = Utc.with_ymd_and_hms(2018, 6, 15, 12, 30, 45).unwrap();

        let mut row = post("https://example.net/1", "ignored");
        row.posted_at = PostedAt::from_datetime(at);

        store.write_all(std::slice::from_ref(&row)).await.unwrap();
        let read_back = store.read_all().await.unwrap();

        assert_eq!(read_back[0].posted_at.timestamp(), Some(at));
    }

    #[tokio::test]
    async fn test_malformed_count_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("posts.csv");
        std::fs::write(
            &path,
            "author,text,reposts,likes,replies,posted_at,link\n\
             alice,hi,many,2,3,2018-01-01 00:00:00,https://example.net/1\n",
        )
        .unwrap();

        let store = CsvStore::new(path);
        assert!(matches!(
            store.read_all().await,
            Err(StoreError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn test_rewrite_replaces_not_appends() {
        let temp_dir = TempDir::new().unwrap();
        let store = CsvStore::new(temp_dir.path().join("posts.csv"));

        store
            .write_all(&[
                post("https://example.net/1", "2018-01-01 00:00:00"),
                post("https://example.net/2", "2018-01-02 00:00:00"),
            ])
            .await
            .unwrap();
        store
            .write_all(&[post("https://example.net/3", "2018-01-03 00:00:00")])
            .await
            .unwrap();

        let rows = store.read_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].link, "https://example.net/3");
    }
}
