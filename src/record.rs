//! Commits read from existing history.

use thiserror::Error;

/// Separates fields within one log record.
pub const FIELD_SEPARATOR: char = '\x1f';

/// Separates records in `git log -z` output.
pub const RECORD_SEPARATOR: char = '\0';

/// The `--format` string whose output [`parse_log`] understands.
///
/// Used together with `-z`, so the raw message body (`%B`) may contain any
/// text, newlines included.
pub const LOG_FORMAT: &str = "%H%x1f%T%x1f%an%x1f%ae%x1f%B";

/// Number of hex characters shown for abbreviated hashes.
pub const SHORT_HASH_LEN: usize = 8;

/// One commit from the source history.
///
/// The hash doubles as the handle on the commit's tree snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub id: String,

    /// Tree hash as reported when the record was read. A replayed commit
    /// must end up with exactly this tree.
    pub tree: String,

    pub author_name: String,
    pub author_email: String,

    /// Raw message exactly as stored, trailing newline included.
    pub message: String,
}

impl CommitRecord {
    pub fn short_id(&self) -> &str {
        &self.id[..SHORT_HASH_LEN.min(self.id.len())]
    }

    /// First line of the message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

/// Parse `git log -z --format=LOG_FORMAT` output, newest first as git
/// prints it.
pub fn parse_log(output: &str) -> Result<Vec<CommitRecord>, ParseError> {
    output
        .split(RECORD_SEPARATOR)
        .map(|chunk| chunk.trim_start_matches('\n'))
        .filter(|chunk| !chunk.is_empty())
        .enumerate()
        .map(|(index, chunk)| parse_record(index, chunk))
        .collect()
}

fn parse_record(index: usize, chunk: &str) -> Result<CommitRecord, ParseError> {
    let mut fields = chunk.splitn(5, FIELD_SEPARATOR);
    let (Some(id), Some(tree), Some(author_name), Some(author_email), Some(message)) = (
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
    ) else {
        return Err(ParseError::Malformed {
            index,
            reason: "expected hash, tree, author name, author email and message".to_string(),
        });
    };

    for hash in [id, tree] {
        if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseError::Malformed {
                index,
                reason: format!("'{hash}' is not an object hash"),
            });
        }
    }

    Ok(CommitRecord {
        id: id.to_string(),
        tree: tree.to_string(),
        author_name: author_name.to_string(),
        author_email: author_email.to_string(),
        message: message.to_string(),
    })
}

/// Errors from reading log output.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed log record #{index}: {reason}")]
    Malformed { index: usize, reason: String },
}
