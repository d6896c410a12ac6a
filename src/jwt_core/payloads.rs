use crate::config::{FilePayloadSource, PayloadSource};
use crate::error::JWTFuzzerError;
use crate::fuzzers::context::CancellationFlag;
use futures::future::BoxFuture;
use tracing::debug;

impl PayloadSource {
    /// Materializes the candidate values, in order.
    pub fn load(&self) -> Result<Vec<String>, JWTFuzzerError> {
        match self {
            PayloadSource::Inline { values } => Ok(values.clone()),
            PayloadSource::File(source) => source.load(),
        }
    }
}

impl FilePayloadSource {
    pub fn load(&self) -> Result<Vec<String>, JWTFuzzerError> {
        let content = std::fs::read_to_string(&self.file)?;
        Ok(self.select_lines(&content))
    }

    fn select_lines(&self, content: &str) -> Vec<String> {
        let comment_token = self.comment_token.as_deref().filter(|t| !t.is_empty());
        let lines = content
            .lines()
            .skip(usize::from(self.ignore_first_line))
            .filter(|line| !comment_token.map_or(false, |token| line.starts_with(token)))
            .filter(|line| !(self.ignore_trimmed_empty_lines && line.trim().is_empty()))
            .map(String::from);

        match self.limit {
            Some(limit) => lines.take(limit).collect(),
            None => lines.collect(),
        }
    }
}

/// Feeds every payload of `source` to `predicate` until one returns `true`.
///
/// Cancellation is polled before each candidate. Returns `Ok(false)` when the
/// source is exhausted or the scan was stopped.
pub async fn for_each_payload<'a, F>(
    source: &PayloadSource,
    cancellation: &CancellationFlag,
    mut predicate: F,
) -> Result<bool, JWTFuzzerError>
where
    F: FnMut(String) -> BoxFuture<'a, Result<bool, JWTFuzzerError>>,
{
    let payloads = source.load()?;
    debug!("Iterating {} payloads", payloads.len());

    for payload in payloads {
        if cancellation.is_cancelled() {
            return Ok(false);
        }
        if predicate(payload).await? {
            return Ok(true);
        }
    }
    Ok(false)
}
