//! Export-filter execution: task creation, status polling, result
//! pagination, and CSV output.
//!
//! Export filters are saved server-side queries. Executing one spawns an
//! asynchronous task that moves Created -> {Pending, Running} -> Finished
//! or Error; the only way to observe the transition is to poll.

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::time::Duration;

use log::{debug, warn};
use serde_json::Value;
use tokio::time::sleep;

use super::client::RadiusClient;
use super::constants::{params, ENTITY_ID_FIELD, EXPORT_FILTERS_MODULE};
use super::models::{id_string, ExecutionTask, PagedResult, TaskStatus};
use super::request::RequestKind;
use crate::error::{ApiError, Result};

/// Bounds for the execution-task poll loop.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Status re-checks after the initial fetch.
    pub checks: u32,
    /// Sleep before each re-check.
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            checks: 3,
            interval: Duration::from_secs(2),
        }
    }
}

impl PollConfig {
    pub fn new(checks: u32) -> Self {
        Self {
            checks,
            ..Self::default()
        }
    }

    /// Longer leash for filters known to take a while server-side.
    pub fn patient() -> Self {
        Self {
            checks: 15,
            interval: Duration::from_secs(2),
        }
    }

    /// Total time the loop may spend sleeping before it gives up.
    pub fn max_wait(&self) -> Duration {
        self.interval * self.checks
    }
}

impl RadiusClient {
    /// Create an execution task for an export filter. Returns the task id.
    pub async fn export_filter_create_task(&self, filter_id: &str) -> Result<String> {
        let url = self.endpoint(
            EXPORT_FILTERS_MODULE,
            &format!("createExecutionTask/{}", filter_id),
        );
        let payload = self
            .post_at(&url, Some(EXPORT_FILTERS_MODULE), None, &[])
            .await?;
        payload
            .get("Execution Task ID")
            .and_then(id_string)
            .ok_or_else(|| ApiError::MalformedResponse {
                url,
                reason: "task creation response missing 'Execution Task ID'".to_string(),
            })
    }

    async fn fetch_execution_task(&self, task_id: &str) -> Result<ExecutionTask> {
        let url = self.endpoint(
            EXPORT_FILTERS_MODULE,
            &format!("getExecutionTask/{}", task_id),
        );
        let payload = self.get_at(&url, Some(EXPORT_FILTERS_MODULE), &[]).await?;
        ExecutionTask::from_payload(&payload, &url)
    }

    /// Wait for an execution task to finish and return all result records.
    ///
    /// A task reporting `Error` yields an empty list rather than a failure:
    /// the service uses that status, with no further diagnostic, when the
    /// filter simply matches zero rows. A task still unfinished after the
    /// polling bound fails with `Timeout`.
    pub async fn get_export_filter_as_list(
        &self,
        task_id: &str,
        poll: &PollConfig,
    ) -> Result<Vec<Value>> {
        let mut task = self.fetch_execution_task(task_id).await?;
        if task.status == TaskStatus::Error {
            warn!(
                "execution task {} reported Error status; treating as empty result",
                task_id
            );
            return Ok(Vec::new());
        }

        if task.status != TaskStatus::Finished {
            let mut finished = false;
            for check in 0..poll.checks {
                sleep(poll.interval).await;
                task = self.fetch_execution_task(task_id).await?;
                debug!(
                    "execution task {} status after check {}: {}",
                    task_id,
                    check + 1,
                    task.status
                );
                match task.status {
                    TaskStatus::Finished => {
                        finished = true;
                        break;
                    }
                    TaskStatus::Error => {
                        warn!(
                            "execution task {} reported Error status; treating as empty result",
                            task_id
                        );
                        return Ok(Vec::new());
                    }
                    _ => {}
                }
            }
            if !finished {
                return Err(ApiError::Timeout {
                    task_id: task_id.to_string(),
                    waited_secs: poll.max_wait().as_secs(),
                    status: task.status.to_string(),
                });
            }
        }

        if task.total_records == 0 {
            return Ok(Vec::new());
        }

        let url = self.endpoint(
            EXPORT_FILTERS_MODULE,
            &format!("getExecutionTaskResult/{}", task_id),
        );
        let first = PagedResult::from_payload(
            self.get_at(&url, Some(EXPORT_FILTERS_MODULE), &[]).await?,
            &url,
        )?;
        if !first.has_more() {
            return Ok(first.entities);
        }

        let total_pages = first.total_pages;
        let query_id = first.query_id(&url)?.to_string();
        let mut entities = first.entities;
        for page in 2..=total_pages {
            let parameters = [
                (params::PAGE, page.to_string()),
                (params::QUERY_ID, query_id.clone()),
            ];
            let next = PagedResult::from_payload(
                self.get_at(&url, Some(EXPORT_FILTERS_MODULE), &parameters)
                    .await?,
                &url,
            )?;
            entities.extend(next.entities);
        }
        debug!(
            "execution task {} returned {} records across {} pages",
            task_id,
            entities.len(),
            total_pages
        );
        Ok(entities)
    }

    /// Write an export filter's results to a comma-delimited file: header
    /// row from the first record's field names, one row per record in
    /// result order. An empty result leaves a deterministic empty file.
    pub async fn get_export_filter_as_file(
        &self,
        task_id: &str,
        path: impl AsRef<Path>,
        poll: &PollConfig,
    ) -> Result<()> {
        let records = self.get_export_filter_as_list(task_id, poll).await?;
        let path = path.as_ref();
        if records.is_empty() {
            warn!(
                "execution task {} produced no records; writing empty file to {}",
                task_id,
                path.display()
            );
        }
        write_records(&records, std::fs::File::create(path)?)
    }

    /// All active export filters in the instance, with their descriptive
    /// fields.
    pub async fn get_active_export_filters(&self) -> Result<Vec<Value>> {
        let fields = HashMap::from([("Status".to_string(), Value::String("Active".to_string()))]);
        let return_fields = [
            "Filter Name",
            "Description",
            "Primary Module",
            ENTITY_ID_FIELD,
        ]
        .map(String::from)
        .to_vec();
        let request = self
            .create_request_object(
                EXPORT_FILTERS_MODULE,
                &fields,
                RequestKind::Search,
                &return_fields,
                false,
            )
            .await?;
        self.search_entities(EXPORT_FILTERS_MODULE, &request).await
    }

    /// Look up an export filter id by exact name. Fails with `NotFound`
    /// when nothing matches; with several matches the first is used and a
    /// warning logged (filter names are assumed unique but the service
    /// does not enforce it).
    pub async fn get_export_filter_id_by_name(&self, filter_name: &str) -> Result<String> {
        let fields = HashMap::from([(
            "Filter Name".to_string(),
            Value::String(filter_name.to_string()),
        )]);
        let return_fields = vec![ENTITY_ID_FIELD.to_string()];
        let request = self
            .create_request_object(
                EXPORT_FILTERS_MODULE,
                &fields,
                RequestKind::Search,
                &return_fields,
                false,
            )
            .await?;
        let matches = self.search_entities(EXPORT_FILTERS_MODULE, &request).await?;

        if matches.len() > 1 {
            warn!(
                "{} export filters named <{}>; using the first",
                matches.len(),
                filter_name
            );
        }
        let first = matches.first().ok_or_else(|| {
            ApiError::NotFound(format!("export filter <{}> not found", filter_name))
        })?;
        first
            .get(ENTITY_ID_FIELD)
            .and_then(id_string)
            .ok_or_else(|| ApiError::MalformedResponse {
                url: self.endpoint(EXPORT_FILTERS_MODULE, "search"),
                reason: "search match missing 'Entity ID'".to_string(),
            })
    }

    /// Name lookup, task creation and poll-and-fetch in one call.
    pub async fn get_export_filter_by_name_as_list(
        &self,
        filter_name: &str,
        poll: &PollConfig,
    ) -> Result<Vec<Value>> {
        let filter_id = self.get_export_filter_id_by_name(filter_name).await?;
        let task_id = self.export_filter_create_task(&filter_id).await?;
        self.get_export_filter_as_list(&task_id, poll).await
    }
}

/// Write mapping-records as comma-delimited text. The header comes from
/// the first record's field names; every row renders those fields in
/// header order.
fn write_records<W: io::Write>(records: &[Value], writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    let headers: Vec<String> = records
        .first()
        .and_then(Value::as_object)
        .map(|record| record.keys().cloned().collect())
        .unwrap_or_default();
    if headers.is_empty() {
        writer.flush()?;
        return Ok(());
    }

    writer.write_record(&headers)?;
    for record in records {
        let row: Vec<String> = headers
            .iter()
            .map(|header| render_scalar(record.get(header)))
            .collect();
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn render_scalar(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn written(records: &[Value]) -> String {
        let mut buffer = Vec::new();
        write_records(records, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_poll_config_defaults() {
        let poll = PollConfig::default();
        assert_eq!(poll.checks, 3);
        assert_eq!(poll.interval, Duration::from_secs(2));
        assert_eq!(poll.max_wait(), Duration::from_secs(6));

        assert_eq!(PollConfig::new(5).checks, 5);
        assert_eq!(PollConfig::patient().max_wait(), Duration::from_secs(30));
    }

    #[test]
    fn test_write_records_header_and_rows() {
        let records = vec![
            json!({"Email": "ada@example.com", "Entity ID": 1, "Verified": true}),
            json!({"Email": "grace@example.com", "Entity ID": 2, "Verified": false}),
        ];
        let output = written(&records);
        let mut lines = output.lines();
        assert_eq!(lines.next(), Some("Email,Entity ID,Verified"));
        assert_eq!(lines.next(), Some("ada@example.com,1,true"));
        assert_eq!(lines.next(), Some("grace@example.com,2,false"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_write_records_missing_and_null_fields_render_empty() {
        let records = vec![
            json!({"Email": "ada@example.com", "Phone": Value::Null}),
            json!({"Email": "grace@example.com"}),
        ];
        let output = written(&records);
        let mut lines = output.lines();
        assert_eq!(lines.next(), Some("Email,Phone"));
        assert_eq!(lines.next(), Some("ada@example.com,"));
        assert_eq!(lines.next(), Some("grace@example.com,"));
    }

    #[test]
    fn test_write_records_empty_result_is_empty_output() {
        assert_eq!(written(&[]), "");
    }
}
