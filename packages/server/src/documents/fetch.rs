use std::time::Duration;

use common::storage::BoxReader;
use futures::TryStreamExt;
use reqwest::{Client, StatusCode, Url};
use tokio_util::io::StreamReader;
use tracing::{debug, instrument};

use super::service::DocumentError;

/// Body of a remote document, ready to be streamed into the blob store.
pub struct FetchedContent {
    pub reader: BoxReader,
    /// Last non-empty segment of the URL path, if any.
    pub filename: Option<String>,
}

/// Downloads documents referenced by URL.
#[derive(Clone)]
pub struct RemoteFetcher {
    client: Client,
}

impl RemoteFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Start downloading `url`. Only `200 OK` responses are accepted.
    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<FetchedContent, DocumentError> {
        let url = parse_url(url)?;
        let filename = filename_from_url(&url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DocumentError::Fetch(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(DocumentError::Fetch(format!(
                "remote returned status {}",
                response.status().as_u16()
            )));
        }
        debug!(content_length = ?response.content_length(), "Remote document accepted");

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        let reader: BoxReader = Box::new(StreamReader::new(Box::pin(stream)));

        Ok(FetchedContent { reader, filename })
    }
}

fn parse_url(raw: &str) -> Result<Url, DocumentError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| DocumentError::Validation(format!("Invalid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DocumentError::Validation(format!(
            "Unsupported URL scheme '{other}'"
        ))),
    }
}

fn filename_from_url(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}
