use anstyle::{AnsiColor, Style};
use is_terminal::IsTerminal;
use std::fmt::Display;
use std::io::{self, Write};

const STATUS_WIDTH: usize = 12;

#[derive(Debug, Clone, Copy)]
enum StatusKind {
    Pending,
    Success,
    Info,
    Warn,
    Error,
}

impl StatusKind {
    fn to_stderr(self) -> bool {
        matches!(self, StatusKind::Warn | StatusKind::Error)
    }
}

fn supports_color(to_stderr: bool) -> bool {
    let is_terminal = if to_stderr {
        io::stderr().is_terminal()
    } else {
        io::stdout().is_terminal()
    };
    is_terminal && std::env::var_os("NO_COLOR").is_none()
}

fn style_for(kind: StatusKind) -> Style {
    let style = Style::new().bold();
    match kind {
        StatusKind::Pending => style.fg_color(Some(AnsiColor::Cyan.into())),
        StatusKind::Success => style.fg_color(Some(AnsiColor::Green.into())),
        StatusKind::Info => style.fg_color(Some(AnsiColor::Blue.into())),
        StatusKind::Warn => style.fg_color(Some(AnsiColor::Yellow.into())),
        StatusKind::Error => style.fg_color(Some(AnsiColor::Red.into())),
    }
}

/// Format a status line: right-aligned label, then the message with
/// continuation lines indented under it.
fn render(label: &str, message: &str, style: Option<Style>) -> String {
    let padded_label = format!("{:>width$}", label, width = STATUS_WIDTH);
    let (prefix, suffix) = match style {
        Some(style) => (style.render().to_string(), style.render_reset().to_string()),
        None => (String::new(), String::new()),
    };

    let mut rendered = String::new();
    for (idx, line) in message.split('\n').enumerate() {
        if idx == 0 {
            rendered.push_str(&format!("{prefix}{padded_label}{suffix} {line}\n"));
        } else {
            rendered.push_str(&format!("{:>width$} {line}\n", "", width = STATUS_WIDTH));
        }
    }
    rendered
}

fn write_status(kind: StatusKind, label: &str, message: &str) {
    let to_stderr = kind.to_stderr();
    let style = supports_color(to_stderr).then(|| style_for(kind));
    let rendered = render(label, message, style);

    let mut handle: Box<dyn Write> = if to_stderr {
        Box::new(io::stderr().lock())
    } else {
        Box::new(io::stdout().lock())
    };
    let _ = handle.write_all(rendered.as_bytes());
    let _ = handle.flush();
}

pub fn status(label: &str, message: impl Display) {
    write_status(StatusKind::Pending, label, &message.to_string());
}

pub fn info(message: impl Display) {
    write_status(StatusKind::Info, "Info", &message.to_string());
}

pub fn warn(message: impl Display) {
    write_status(StatusKind::Warn, "Warning", &message.to_string());
}

pub fn error(message: impl Display) {
    write_status(StatusKind::Error, "Error", &message.to_string());
}

pub fn success(label: &str, message: impl Display) {
    write_status(StatusKind::Success, label, &message.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_plain() {
        assert_eq!(
            render("Registered", "infra -> /srv/infra", None),
            "  Registered infra -> /srv/infra\n"
        );
    }

    #[test]
    fn test_render_continuation_lines() {
        let rendered = render("Warning", "first\nsecond", None);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines, vec!["     Warning first", "             second"]);
    }

    #[test]
    fn test_render_colored() {
        let style = style_for(StatusKind::Success);
        let rendered = render("Ok", "done", Some(style));
        assert!(rendered.starts_with(&style.render().to_string()));
        assert!(rendered.ends_with(" done\n"));
    }
}
