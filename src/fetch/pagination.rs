use super::FetchError;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;
use reqwest::header::{HeaderMap, LINK};
use std::fmt;
use std::pin::Pin;
use tracing::debug;
use url::Url;

type PageBody = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Streaming reader over a paginated log response.
///
/// Each page's `Link: <...>; rel="next"` header points at the following
/// page; the reader follows those links as the current page drains, so a
/// consumer sees one continuous byte stream. Once the last page is
/// exhausted the reader stays at end of stream.
pub struct PaginatedReader {
    http: Client,
    headers: HeaderMap,
    body: Option<PageBody>,
    next: Option<Url>,
}

impl fmt::Debug for PaginatedReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginatedReader")
            .field("next", &self.next.as_ref().map(Url::as_str))
            .field("exhausted", &self.body.is_none())
            .finish_non_exhaustive()
    }
}

impl PaginatedReader {
    pub(crate) async fn start(
        http: Client,
        headers: HeaderMap,
        url: Url,
    ) -> Result<Self, FetchError> {
        let mut reader = Self {
            http,
            headers,
            body: None,
            next: None,
        };
        reader.load_page(url).await?;
        Ok(reader)
    }

    /// The next non-empty chunk of log content, crossing page boundaries
    /// transparently. `Ok(None)` means the content is exhausted and is
    /// stable under repeated calls.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, FetchError> {
        loop {
            let Some(body) = self.body.as_mut() else {
                return Ok(None);
            };
            match body.next().await {
                Some(Ok(chunk)) => {
                    if chunk.is_empty() {
                        continue;
                    }
                    return Ok(Some(chunk));
                }
                Some(Err(err)) => return Err(err.into()),
                None => match self.next.take() {
                    Some(next) => self.load_page(next).await?,
                    None => {
                        self.body = None;
                        return Ok(None);
                    }
                },
            }
        }
    }

    /// Drains the reader into one buffer, following every page.
    pub async fn read_to_end(mut self) -> Result<Vec<u8>, FetchError> {
        let mut out = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }

    /// Adapts the reader into a `Stream` of chunks.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, FetchError>> + Send {
        futures::stream::try_unfold(self, |mut reader| async move {
            match reader.next_chunk().await {
                Ok(Some(chunk)) => Ok(Some((chunk, reader))),
                Ok(None) => Ok(None),
                Err(err) => Err(err),
            }
        })
    }

    async fn load_page(&mut self, url: Url) -> Result<(), FetchError> {
        debug!(url = %url, "fetching log page");
        let response = self
            .http
            .get(url.clone())
            .headers(self.headers.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Http {
                status: status.as_u16(),
                message,
            });
        }

        self.next = next_page_url(response.headers(), &url)?;
        self.body = Some(Box::pin(response.bytes_stream()));
        Ok(())
    }
}

/// Extracts the target of a `rel="next"` web link from response headers,
/// resolved against the URL of the page that carried it.
fn next_page_url(headers: &HeaderMap, page_url: &Url) -> Result<Option<Url>, FetchError> {
    for value in headers.get_all(LINK) {
        let Ok(raw) = value.to_str() else {
            continue;
        };
        if let Some(target) = parse_next_target(raw) {
            let next = page_url.join(target).map_err(|err| {
                FetchError::MalformedResponse(format!("bad next link '{target}': {err}"))
            })?;
            return Ok(Some(next));
        }
    }
    Ok(None)
}

fn parse_next_target(header: &str) -> Option<&str> {
    // Commas may appear inside a target URL; scan for '<' instead of
    // splitting on ','.
    let mut rest = header;
    loop {
        let start = rest.find('<')?;
        let (target, tail) = rest[start + 1..].split_once('>')?;
        let params = tail.find('<').map_or(tail, |next_value| &tail[..next_value]);
        if params.split(';').any(is_next_rel) {
            return Some(target);
        }
        rest = tail;
    }
}

fn is_next_rel(param: &str) -> bool {
    param
        .trim()
        .trim_end_matches(',')
        .trim_end()
        .strip_prefix("rel=")
        .is_some_and(|rel| rel.trim_matches('"') == "next")
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn page() -> Url {
        Url::parse("http://cedar.example.com/rest/v1/buildlogger/abc?paginate=true").unwrap()
    }

    #[test]
    fn test_parse_next_target_picks_rel_next() {
        let single = "<http://cedar.example.com/page2>; rel=\"next\"";
        assert_eq!(
            parse_next_target(single),
            Some("http://cedar.example.com/page2")
        );

        let multi = "<http://cedar.example.com/page0>; rel=\"prev\", \
                     <http://cedar.example.com/page2>; rel=\"next\"";
        assert_eq!(
            parse_next_target(multi),
            Some("http://cedar.example.com/page2")
        );
    }

    #[test]
    fn test_parse_next_target_keeps_commas_inside_urls() {
        let single = "<http://x/export?cols=a,b,c&page=2>; rel=\"next\"";
        assert_eq!(
            parse_next_target(single),
            Some("http://x/export?cols=a,b,c&page=2")
        );

        let multi = "<http://x/export?cols=a,b>; rel=\"prev\", <http://x/2>; rel=\"next\"";
        assert_eq!(parse_next_target(multi), Some("http://x/2"));
    }

    #[test]
    fn test_parse_next_target_accepts_unquoted_rel() {
        assert_eq!(parse_next_target("<http://x/2>; rel=next"), Some("http://x/2"));
    }

    #[test]
    fn test_parse_next_target_without_next_link() {
        assert_eq!(parse_next_target("<http://x/0>; rel=\"prev\""), None);
        assert_eq!(parse_next_target("not a link header"), None);
    }

    #[test]
    fn test_next_page_url_resolves_relative_targets() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static("</rest/v1/buildlogger/abc?page=2>; rel=\"next\""),
        );
        let next = next_page_url(&headers, &page()).unwrap().unwrap();
        assert_eq!(
            next.as_str(),
            "http://cedar.example.com/rest/v1/buildlogger/abc?page=2"
        );
    }

    #[test]
    fn test_next_page_url_absent() {
        assert!(next_page_url(&HeaderMap::new(), &page()).unwrap().is_none());
    }
}
