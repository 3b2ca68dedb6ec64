//! Fixed-width box-drawing table used by `conduit list`.

use conduit_store::Session;

use crate::color;

pub struct TableFormatter {
    name_width: usize,
    agent_width: usize,
    status_width: usize,
    branch_width: usize,
    project_width: usize,
    created_width: usize,
}

impl TableFormatter {
    pub fn new(sessions: &[Session]) -> Self {
        let name_width = sessions
            .iter()
            .map(|s| s.name.len())
            .max()
            .unwrap_or(12)
            .clamp(4, 40);
        let branch_width = sessions
            .iter()
            .map(|s| s.worktree.as_ref().map(|w| w.branch_name.len()).unwrap_or(1))
            .max()
            .unwrap_or(16)
            .clamp(6, 50);
        let project_width = sessions
            .iter()
            .map(|s| s.project_id.len())
            .max()
            .unwrap_or(13)
            .clamp(6, 30);
        Self {
            name_width,
            agent_width: 8,
            status_width: 8,
            branch_width,
            project_width,
            created_width: 19,
        }
    }

    fn widths(&self) -> [usize; 6] {
        [
            self.name_width,
            self.agent_width,
            self.status_width,
            self.branch_width,
            self.project_width,
            self.created_width,
        ]
    }

    fn border(&self, left: &str, mid: &str, right: &str) -> String {
        let segments: Vec<String> = self.widths().iter().map(|w| "─".repeat(w + 2)).collect();
        format!("{}{}{}", left, segments.join(mid), right)
    }

    fn print_header(&self) {
        println!("{}", self.border("┌", "┬", "┐"));
        println!(
            "│ {:<nw$} │ {:<aw$} │ {:<sw$} │ {:<bw$} │ {:<pw$} │ {:<cw$} │",
            "NAME",
            "AGENT",
            "STATUS",
            "BRANCH",
            "PROJECT",
            "CREATED",
            nw = self.name_width,
            aw = self.agent_width,
            sw = self.status_width,
            bw = self.branch_width,
            pw = self.project_width,
            cw = self.created_width,
        );
        println!("{}", self.border("├", "┼", "┤"));
    }

    fn print_row(&self, session: &Session) {
        let branch = session
            .worktree
            .as_ref()
            .map(|w| w.branch_name.as_str())
            .unwrap_or("-");
        println!(
            "│ {} │ {:<aw$} │ {} │ {} │ {:<pw$} │ {:<cw$} │",
            truncate(&session.name, self.name_width),
            session.agent_type,
            pad_colored(&color::status(session.status.as_str()), session.status.as_str(), self.status_width),
            truncate(branch, self.branch_width),
            truncate(&session.project_id, self.project_width),
            truncate(&session.created_at, self.created_width),
            aw = self.agent_width,
            pw = self.project_width,
            cw = self.created_width,
        );
    }

    fn print_footer(&self) {
        println!("{}", self.border("└", "┴", "┘"));
    }

    pub fn print_table(&self, sessions: &[Session]) {
        self.print_header();
        for session in sessions {
            self.print_row(session);
        }
        self.print_footer();
    }
}

/// Truncate to `max_len` *characters* (not bytes), padding shorter strings.
/// UTF-8 safe: byte-slicing a multi-byte name could panic or split a
/// character in half, so this always walks `chars()`.
pub fn truncate(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_len {
        format!("{:<width$}", s, width = max_len)
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{:<width$}", format!("{}...", truncated), width = max_len)
    }
}

/// Pad a colored string to `width` visible columns using the uncolored
/// source for length accounting, since ANSI escapes would otherwise be
/// counted as padding characters.
fn pad_colored(colored: &str, plain: &str, width: usize) -> String {
    let pad = width.saturating_sub(plain.chars().count());
    format!("{}{}", colored, " ".repeat(pad))
}
