use std::io::{self, Write};

use chrono::{DateTime, Local};
use revolve_core::{
    LogEntry, LogKind, NotificationId, NotificationKind, Role, SessionView, TurnOutcome,
};
use revolve_engine::{SessionEvent, SessionSignal};

/// Prints session events as plain text, showing each entry once.
#[derive(Debug, Default)]
pub struct Console {
    transcript_shown: usize,
    /// Arrival time of each system log entry printed so far.
    log_arrivals: Vec<DateTime<Local>>,
    notifications_shown: Vec<NotificationId>,
    last_view: SessionView,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> &SessionView {
        &self.last_view
    }

    pub fn apply(&mut self, event: SessionEvent, out: &mut impl Write) -> io::Result<()> {
        match event {
            SessionEvent::Snapshot(view) => self.render(view, out),
            SessionEvent::Signal(SessionSignal::TurnStarted { turn }) => {
                writeln!(out, "… turn {turn} sent, waiting for the agent")
            }
            SessionEvent::Signal(SessionSignal::LoadingChanged(_)) => Ok(()),
            SessionEvent::Signal(SessionSignal::TurnFinished { turn, outcome }) => match outcome {
                TurnOutcome::Completed => writeln!(out, "✓ turn {turn} complete"),
                TurnOutcome::Failed(failure) => {
                    writeln!(out, "✗ turn {turn} failed: {failure}")?;
                    if let Some(partial) = &self.last_view.partial_reply {
                        writeln!(out, "  (partial reply) {partial}")?;
                    }
                    Ok(())
                }
            },
        }
    }

    /// Prints the whole system log, including entries already shown.
    pub fn print_log(&self, out: &mut impl Write) -> io::Result<()> {
        if self.last_view.system_log.is_empty() {
            return writeln!(out, "No messages yet...");
        }
        for (entry, arrived) in self.last_view.system_log.iter().zip(&self.log_arrivals) {
            write_log_entry(entry, arrived, out)?;
        }
        Ok(())
    }

    fn render(&mut self, view: SessionView, out: &mut impl Write) -> io::Result<()> {
        for entry in view.system_log.iter().skip(self.log_arrivals.len()) {
            let arrived = Local::now();
            write_log_entry(entry, &arrived, out)?;
            self.log_arrivals.push(arrived);
        }

        for notification in &view.notifications {
            if self.notifications_shown.contains(&notification.id) {
                continue;
            }
            let marker = match notification.kind {
                NotificationKind::Info => "(i)",
                NotificationKind::Error => "(!)",
            };
            writeln!(
                out,
                "{marker} #{} {}: {}",
                notification.id,
                notification.name.as_deref().unwrap_or("notice"),
                notification.text.as_deref().unwrap_or("")
            )?;
            self.notifications_shown.push(notification.id);
        }
        self.notifications_shown
            .retain(|id| view.notifications.iter().any(|n| n.id == *id));

        for entry in view.transcript.iter().skip(self.transcript_shown) {
            let speaker = match entry.role {
                Role::User => "You",
                Role::Assistant => "Assistant",
            };
            writeln!(out, "{speaker}: {}", entry.content)?;
        }
        self.transcript_shown = view.transcript.len();

        self.last_view = view;
        out.flush()
    }
}

fn write_log_entry(
    entry: &LogEntry,
    arrived: &DateTime<Local>,
    out: &mut impl Write,
) -> io::Result<()> {
    let tag = match entry.kind {
        LogKind::System => "system",
        LogKind::Diagnostic => "diagnostic",
    };
    writeln!(
        out,
        "  [{} {tag}] {}: {}",
        arrived.format("%H:%M:%S"),
        entry.name.as_deref().unwrap_or("-"),
        entry.text.as_deref().unwrap_or("")
    )
}
