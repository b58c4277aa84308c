use super::FetchError;
use chrono::{DateTime, SecondsFormat, Utc};
use url::Url;

/// Selects which stored log content to fetch and how to render it.
///
/// Exactly one of `id` or `task_id` must be set. `test_name` and `group_id`
/// narrow a task-wide query; `meta` asks for record metadata instead of log
/// content and suppresses the line-rendering parameters.
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    /// Fetch one record by its id.
    pub id: Option<String>,
    /// Fetch the merged logs of a task.
    pub task_id: Option<String>,
    /// Narrow a task query to one test.
    pub test_name: Option<String>,
    /// Narrow a task query to a test group.
    pub group_id: Option<String>,
    /// Fetch record metadata instead of log content.
    pub meta: bool,

    /// Task execution number.
    pub execution: Option<i32>,
    /// Lower time bound on returned lines.
    pub start: Option<DateTime<Utc>>,
    /// Upper time bound on returned lines.
    pub end: Option<DateTime<Utc>>,
    /// Only lines captured by this process.
    pub process_name: Option<String>,
    /// Filter to records carrying these tags.
    pub tags: Vec<String>,
    /// Prefix each line with its capture time.
    pub print_time: bool,
    /// Prefix each line with its priority.
    pub print_priority: bool,
    /// Only the last `n` lines.
    pub tail: Option<usize>,
    /// Hard cap on returned lines. Tail and limit both disable pagination.
    pub limit: Option<usize>,
}

impl LogQuery {
    pub fn validate(&self) -> Result<(), FetchError> {
        let id = self.id.as_deref().unwrap_or("");
        let task_id = self.task_id.as_deref().unwrap_or("");
        let test_name = self.test_name.as_deref().unwrap_or("");
        let group_id = self.group_id.as_deref().unwrap_or("");

        if id.is_empty() && task_id.is_empty() {
            return Err(FetchError::InvalidQuery(
                "must provide an id or task id".to_string(),
            ));
        }
        if !id.is_empty() && !task_id.is_empty() {
            return Err(FetchError::InvalidQuery(
                "cannot provide both id and task id".to_string(),
            ));
        }
        if !test_name.is_empty() && task_id.is_empty() {
            return Err(FetchError::InvalidQuery(
                "must provide a task id when a test name is specified".to_string(),
            ));
        }
        if !group_id.is_empty() && task_id.is_empty() {
            return Err(FetchError::InvalidQuery(
                "must provide a task id when a group id is specified".to_string(),
            ));
        }
        if !group_id.is_empty() && self.meta {
            return Err(FetchError::InvalidQuery(
                "cannot specify a group id and set meta to true".to_string(),
            ));
        }
        Ok(())
    }

    /// Renders the query as a request URL under `base`. Pagination is
    /// requested unless a tail, a limit, or `meta` makes it meaningless.
    pub(crate) fn to_url(&self, base: &Url) -> Result<Url, FetchError> {
        let id = self.id.as_deref().unwrap_or("");
        let task_id = self.task_id.as_deref().unwrap_or("");
        let test_name = self.test_name.as_deref().unwrap_or("");
        let group_id = self.group_id.as_deref().unwrap_or("");

        let mut url = base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| FetchError::InvalidQuery("base URL cannot be a base".to_string()))?;
            path.pop_if_empty();
            path.extend(["rest", "v1", "buildlogger"]);
            if !id.is_empty() {
                path.push(id);
            } else if !test_name.is_empty() {
                path.extend(["test_name", task_id, test_name]);
            } else {
                path.extend(["task_id", task_id]);
            }
            if !group_id.is_empty() {
                path.extend(["group", group_id]);
            } else if self.meta {
                path.push("meta");
            }
        }

        let tail = self.tail.unwrap_or(0);
        let limit = self.limit.unwrap_or(0);
        {
            let mut params = url.query_pairs_mut();
            if let Some(execution) = self.execution {
                params.append_pair("execution", &execution.to_string());
            }
            if let Some(start) = self.start {
                params.append_pair("start", &start.to_rfc3339_opts(SecondsFormat::Secs, true));
            }
            if let Some(end) = self.end {
                params.append_pair("end", &end.to_rfc3339_opts(SecondsFormat::Secs, true));
            }
            if !self.meta
                && let Some(name) = self.process_name.as_deref()
                && !name.is_empty()
            {
                params.append_pair("proc_name", name);
            }
            for tag in &self.tags {
                params.append_pair("tags", tag);
            }
            if self.print_time && !self.meta {
                params.append_pair("print_time", "true");
            }
            if self.print_priority && !self.meta {
                params.append_pair("print_priority", "true");
            }
            if tail > 0 && !self.meta {
                params.append_pair("n", &tail.to_string());
            }
            if limit > 0 && !self.meta {
                params.append_pair("limit", &limit.to_string());
            }
            if limit == 0 && tail == 0 && !self.meta {
                params.append_pair("paginate", "true");
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        Ok(url)
    }
}
