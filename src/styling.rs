//! Terminal styling.
//!
//! Output goes through anstream, which strips styles when stdout isn't a
//! terminal or `NO_COLOR` is set. Styles are used as `{ERROR}text{ERROR:#}`.

use anstyle::{AnsiColor, Color, Style};

pub use anstream::{eprintln, println};

use crate::status::{NavigableNode, NodeList, StatusSnapshot};

/// Error style (red)
pub const ERROR: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red)));

/// Warning style (yellow)
pub const WARNING: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow)));

/// Hint style (dimmed)
pub const HINT: Style = Style::new().dimmed();

/// Success style (green)
pub const SUCCESS: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green)));

/// Repository names (bold)
pub const REPO: Style = Style::new().bold();

/// Unpushed marker (cyan)
const UNPUSHED: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan)));

pub fn error_message(msg: impl std::fmt::Display) -> String {
    format!("{ERROR}error:{ERROR:#} {msg}")
}

pub fn warning_message(msg: impl std::fmt::Display) -> String {
    format!("{WARNING}warning:{WARNING:#} {msg}")
}

pub fn hint_message(msg: impl std::fmt::Display) -> String {
    format!("{HINT}{msg}{HINT:#}")
}

pub fn success_message(msg: impl std::fmt::Display) -> String {
    format!("{SUCCESS}{msg}{SUCCESS:#}")
}

/// The flag columns of [`StatusSnapshot::flags`], each set flag colored.
fn styled_flags(status: &StatusSnapshot) -> String {
    status
        .flags()
        .chars()
        .map(|c| {
            let style = match c {
                '*' => WARNING,
                '?' => HINT,
                '↑' => UNPUSHED,
                '!' => ERROR,
                _ => return c.to_string(),
            };
            format!("{style}{c}{style:#}")
        })
        .collect()
}

/// Colored rendering of a node list, one line per node, in list order.
///
/// Same layout as `NodeList`'s `Display`, plus the branch of working copies.
pub fn render_nodes(nodes: &NodeList) -> String {
    let mut out = String::new();
    for node in nodes {
        let flags = styled_flags(node.status());
        let line = match node {
            NavigableNode::Repository(repo) => {
                let branch = repo
                    .status
                    .branch
                    .as_deref()
                    .map(|b| format!(" {HINT}[{b}]{HINT:#}"))
                    .unwrap_or_default();
                format!(
                    "{flags} {REPO}{}{REPO:#} {HINT}({}){HINT:#}{branch} {}",
                    repo.root.name,
                    repo.kind,
                    repo.root.path.display()
                )
            }
            NavigableNode::Worktree(wt) => format!(
                "{flags} {HINT}{}{HINT:#} {} {}",
                if wt.is_last { "└─" } else { "├─" },
                wt.record.label(),
                wt.record.path.display()
            ),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}
