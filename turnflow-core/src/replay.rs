//! JSONL replay: feed recorded activities through a router, one per line.
//!
//! Each input line is a Bot Framework activity. For every line the writer
//! receives one `reply` record per queued outbound activity, followed by a
//! `result` record (captured value, label path, completion) or an `error`
//! record when the line is malformed or the dispatch fails. A line that is not
//! valid UTF-8 counts as malformed. Blank lines are skipped.

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use crate::controller::activity_router::ActivityRouter;
use crate::controller::event_label::EventLabel;
use crate::error::AppResult;
use crate::model::activity::Activity;
use crate::model::turn_context::TurnContext;

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum ReplayRecord<'a> {
    Reply {
        line: usize,
        activity: &'a Activity,
    },

    Result {
        line: usize,
        value: Option<Value>,
        path: Vec<EventLabel>,
        completed: bool,
    },

    Error {
        line: usize,
        message: String,
    },
}

/// Line counts of one replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub dispatched: usize,
    pub malformed: usize,
    pub failed: usize,
}

pub async fn replay_jsonl<R, W>(
    router: &ActivityRouter,
    reader: R,
    writer: &mut W,
) -> AppResult<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = reader;
    let mut summary = ReplaySummary::default();
    let mut buf: Vec<u8> = Vec::new();
    let mut line_no: usize = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        line_no += 1;

        let raw: &str = match std::str::from_utf8(&buf) {
            Ok(raw) => raw,

            Err(e) => {
                warn!(
                    marker = "REPLAY_MALFORMED_LINE",
                    operation_type = "replay",
                    line = line_no,
                    error = %e,
                    "Skipping line that is not valid UTF-8"
                );
                summary.malformed += 1;
                write_record(
                    writer,
                    &ReplayRecord::Error {
                        line: line_no,
                        message: format!("invalid UTF-8: {e}"),
                    },
                )
                .await?;
                continue;
            }
        };

        if raw.trim().is_empty() {
            continue;
        }

        let activity: Activity = match serde_json::from_str(raw) {
            Ok(activity) => activity,

            Err(e) => {
                warn!(
                    marker = "REPLAY_MALFORMED_LINE",
                    operation_type = "replay",
                    line = line_no,
                    error = %e,
                    "Skipping malformed activity"
                );
                summary.malformed += 1;
                write_record(
                    writer,
                    &ReplayRecord::Error {
                        line: line_no,
                        message: format!("malformed activity: {e}"),
                    },
                )
                .await?;
                continue;
            }
        };

        let mut ctx = TurnContext::new(activity);

        match router.dispatch(&mut ctx).await {
            Ok(report) => {
                summary.dispatched += 1;

                for reply in ctx.responses() {
                    write_record(
                        writer,
                        &ReplayRecord::Reply {
                            line: line_no,
                            activity: reply,
                        },
                    )
                    .await?;
                }

                write_record(
                    writer,
                    &ReplayRecord::Result {
                        line: line_no,
                        value: report.value,
                        path: report.path.into_vec(),
                        completed: report.completed,
                    },
                )
                .await?;
            }

            Err(e) => {
                summary.failed += 1;
                write_record(
                    writer,
                    &ReplayRecord::Error {
                        line: line_no,
                        message: e.to_string(),
                    },
                )
                .await?;
            }
        }
    }

    writer.flush().await?;

    info!(
        marker = "REPLAY_FINISHED",
        operation_type = "replay",
        dispatched = summary.dispatched,
        malformed = summary.malformed,
        failed = summary.failed,
        "Replay finished"
    );

    Ok(summary)
}

async fn write_record<W>(writer: &mut W, record: &ReplayRecord<'_>) -> AppResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut encoded: Vec<u8> = serde_json::to_vec(record)?;
    encoded.push(b'\n');
    writer.write_all(&encoded).await?;
    Ok(())
}
