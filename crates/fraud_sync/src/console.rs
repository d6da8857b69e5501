// Rust guideline compliant 2026-10-16

//! Line-oriented operator console over stdin/stdout.
//!
//! The read-only views (`stats`, `list`, `show`, `status`) render straight
//! from the cache; `transition` goes through the Case Lifecycle Controller.

use anyhow::Context as _;
use connection::ConnectionManager;
use domain::{CaseId, CaseStatus, Clock, DashboardStats, FraudCase, StatusWriter};
use lifecycle::LifecycleController;
use reconciler::Reconciler;
use std::fmt::Write as _;
use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader};
use tokio::sync::watch;

const HELP: &str = "\
commands:
  stats                                    dashboard statistics
  list                                     every cached case
  show <id>                                one case in full
  transition <id> <STATUS> <actor> [notes] change a case status
  status                                   connectivity and last snapshot
  quit";

// ---------------------------------------------------------------------------
// Command parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Stats,
    List,
    Show(CaseId),
    Transition { case_id: CaseId, status: CaseStatus, actor: String, notes: Option<String> },
    Status,
    Help,
    Quit,
}

/// Console input errors; printed back to the operator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command `{command}`; try `help`")]
    Unknown { command: String },
    #[error("usage: {usage}")]
    Usage { usage: &'static str },
    #[error("{reason}")]
    InvalidArgument { reason: String },
}

fn parse_id(raw: &str) -> Result<CaseId, CommandError> {
    raw.parse().map_err(|e: std::num::ParseIntError| CommandError::InvalidArgument {
        reason: format!("`{raw}` is not a case id: {e}"),
    })
}

/// Parse one input line. `Ok(None)` for a blank line.
///
/// # Errors
///
/// Returns [`CommandError`] for unknown commands or malformed arguments.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let command = match head.to_lowercase().as_str() {
        "stats" => Command::Stats,
        "list" => Command::List,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "show" => {
            let usage = CommandError::Usage { usage: "show <id>" };
            Command::Show(parse_id(words.next().ok_or(usage)?)?)
        }
        "transition" => {
            const USAGE: &str = "transition <id> <STATUS> <actor> [notes]";
            let (Some(id), Some(status), Some(actor)) = (words.next(), words.next(), words.next())
            else {
                return Err(CommandError::Usage { usage: USAGE });
            };
            let status = status
                .parse::<CaseStatus>()
                .map_err(|e: domain::DecodeError| CommandError::InvalidArgument { reason: e.to_string() })?;
            let notes = words.collect::<Vec<_>>().join(" ");
            Command::Transition {
                case_id: parse_id(id)?,
                status,
                actor: actor.to_owned(),
                notes: (!notes.is_empty()).then_some(notes),
            }
        }
        other => return Err(CommandError::Unknown { command: other.to_owned() }),
    };
    Ok(Some(command))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn render_stats(stats: &DashboardStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "total cases     {}", stats.total_cases);
    let _ = writeln!(out, "total amount    {:.2}", stats.total_amount);
    let _ = writeln!(out, "detected today  {}", stats.detection_rate_today);
    let _ = writeln!(out, "detected 7d     {}", stats.detection_rate_week);
    for (status, count) in &stats.cases_by_status {
        let _ = writeln!(out, "  {status:<14}{count}");
    }
    for (severity, count) in &stats.cases_by_severity {
        let _ = writeln!(out, "  {severity:<14}{count}");
    }
    for (detector, count) in &stats.cases_by_detector {
        let _ = writeln!(out, "  {:<24}{count}", format!("{detector:?}"));
    }
    let recent: Vec<String> = stats.recent_cases.iter().map(ToString::to_string).collect();
    let _ = write!(out, "recent          [{}]", recent.join(", "));
    out
}

pub fn render_row(case: &FraudCase) -> String {
    format!(
        "{:>6}  {:<16} {:<13} {:<8} {:>12}",
        case.id,
        case.case_number,
        case.status.as_str(),
        case.severity.as_str(),
        case.amount.map_or_else(|| "-".to_owned(), |a| format!("{a:.2}")),
    )
}

pub fn render_case(case: &FraudCase) -> String {
    let optional = |value: Option<&str>| value.unwrap_or("-").to_owned();
    let mut out = String::new();
    let _ = writeln!(out, "case         {} (#{})", case.case_number, case.id);
    let _ = writeln!(out, "status       {}", case.status);
    let _ = writeln!(out, "severity     {}", case.severity);
    let _ = writeln!(out, "detector     {:?}", case.detector_type);
    let _ = writeln!(out, "title        {}", optional(case.title.as_deref()));
    let _ = writeln!(out, "client       {} {}", optional(case.client_code.as_deref()), optional(case.client_name.as_deref()));
    let _ = writeln!(out, "amount       {}", case.amount.map_or_else(|| "-".to_owned(), |a| format!("{a:.2}")));
    let _ = writeln!(out, "confidence   {}", case.confidence_score.map_or_else(|| "-".to_owned(), |c| format!("{c:.1}")));
    let _ = writeln!(out, "detected     {}", case.detection_date.to_rfc3339());
    let _ = write!(
        out,
        "updated      {}",
        case.updated_at.map_or_else(|| "-".to_owned(), |t| t.to_rfc3339())
    );
    out
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

async fn execute<C, W>(
    command: Command,
    reconciler: &Reconciler<C>,
    controller: &LifecycleController<W>,
    connection: &ConnectionManager,
) -> String
where
    C: Clock,
    W: StatusWriter,
{
    match command {
        Command::Stats => render_stats(&reconciler.stats()),
        Command::List => {
            let rows: Vec<String> = reconciler.snapshot().cases().map(render_row).collect();
            if rows.is_empty() { "no cases".to_owned() } else { rows.join("\n") }
        }
        Command::Show(id) => reconciler
            .case(id)
            .map_or_else(|| format!("case {id} not found"), |case| render_case(&case)),
        Command::Transition { case_id, status, actor, notes } => {
            match controller.transition(reconciler, case_id, status, notes, &actor).await {
                Ok(case) => format!("case {} is now {}", case.id, case.status),
                Err(e) => format!("error: {e}"),
            }
        }
        Command::Status => {
            let cache = reconciler.snapshot();
            format!(
                "connection   {}\nreconnects   {}\nlast poll    {}\nfetch notice {}",
                connection.state().map_or_else(|| "IDLE".to_owned(), |s| s.to_string()),
                connection.reconnect_attempts(),
                cache.last_snapshot_at().map_or_else(|| "never".to_owned(), |t| t.to_rfc3339()),
                cache.fetch_notice().unwrap_or("-"),
            )
        }
        Command::Help => HELP.to_owned(),
        Command::Quit => String::new(),
    }
}

/// Serve commands until `quit` or until `stop` fires.
///
/// On end of input the console goes quiet and waits for `stop`, so the
/// process keeps syncing when stdin is not a terminal.
///
/// # Errors
///
/// Fails when stdin cannot be read or stdout cannot be written.
pub async fn run<C, W>(
    reconciler: &Reconciler<C>,
    controller: &LifecycleController<W>,
    connection: &ConnectionManager,
    mut stop: watch::Receiver<bool>,
) -> anyhow::Result<()>
where
    C: Clock,
    W: StatusWriter,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = tokio::select! {
            biased;
            _ = stop.wait_for(|stopped| *stopped) => return Ok(()),
            line = lines.next_line() => line.context("failed to read stdin")?,
        };
        let Some(line) = line else {
            tracing::debug!("console.stdin.closed");
            let _ = stop.wait_for(|stopped| *stopped).await;
            return Ok(());
        };

        let reply = match parse(&line) {
            Ok(None) => continue,
            Ok(Some(Command::Quit)) => return Ok(()),
            Ok(Some(command)) => execute(command, reconciler, controller, connection).await,
            Err(e) => e.to_string(),
        };
        stdout
            .write_all(format!("{reply}\n").as_bytes())
            .await
            .context("failed to write stdout")?;
        stdout.flush().await.context("failed to flush stdout")?;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{Command, CommandError, parse, render_case, render_row, render_stats};
    use chrono::{TimeZone as _, Utc};
    use domain::{CaseStatus, DashboardStats, DetectorType, FraudCase, Severity};

    fn make_case() -> FraudCase {
        FraudCase {
            id: 12,
            case_number: "FRD-2024-00012".to_owned(),
            detector_type: DetectorType::FuelTheft,
            severity: Severity::Critical,
            status: CaseStatus::Investigating,
            title: Some("Tank drop at night".to_owned()),
            description: None,
            amount: Some(8_250.5),
            confidence_score: Some(93.0),
            client_code: Some("C-77".to_owned()),
            client_name: Some("Transportes Norte".to_owned()),
            detection_date: Utc.with_ymd_and_hms(2024, 5, 1, 3, 15, 0).unwrap(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn parses_simple_commands() {
        assert_eq!(parse("stats"), Ok(Some(Command::Stats)));
        assert_eq!(parse("  LIST "), Ok(Some(Command::List)));
        assert_eq!(parse("show 4"), Ok(Some(Command::Show(4))));
        assert_eq!(parse(""), Ok(None));
        assert_eq!(parse("exit"), Ok(Some(Command::Quit)));
    }

    #[test]
    fn parses_transition_with_notes() {
        assert_eq!(
            parse("transition 1 confirmado analyst verified with client"),
            Ok(Some(Command::Transition {
                case_id: 1,
                status: CaseStatus::Confirmed,
                actor: "analyst".to_owned(),
                notes: Some("verified with client".to_owned()),
            }))
        );
        assert_eq!(
            parse("transition 1 RESOLVED analyst"),
            Ok(Some(Command::Transition {
                case_id: 1,
                status: CaseStatus::Resolved,
                actor: "analyst".to_owned(),
                notes: None,
            }))
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(parse("transition 1 CONFIRMED"), Err(CommandError::Usage { .. })));
        assert!(matches!(parse("transition x CONFIRMED a"), Err(CommandError::InvalidArgument { .. })));
        assert!(matches!(parse("transition 1 ARCHIVED a"), Err(CommandError::InvalidArgument { .. })));
        assert!(matches!(parse("show"), Err(CommandError::Usage { .. })));
        assert_eq!(parse("reboot"), Err(CommandError::Unknown { command: "reboot".to_owned() }));
    }

    #[test]
    fn renders_zero_stats_for_every_status() {
        let text = render_stats(&DashboardStats::default());
        assert!(text.contains("total cases     0"));
        for status in CaseStatus::ALL {
            assert!(text.contains(status.as_str()), "{status} missing");
        }
    }

    #[test]
    fn renders_case_views() {
        let case = make_case();
        let row = render_row(&case);
        assert!(row.contains("FRD-2024-00012"));
        assert!(row.contains("INVESTIGATING"));
        assert!(row.contains("8250.50"));

        let full = render_case(&case);
        assert!(full.contains("Transportes Norte"));
        assert!(full.contains("FuelTheft"));
        assert!(full.contains("updated      -"));
    }
}
