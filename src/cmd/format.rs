/*!
format.rs

Terminal presentation for replies (human output paths).

  - StyleOptions::detect()  NO_COLOR / NO_EMOJI / COLUMNS aware
  - color(role, text, &StyleOptions)
  - emoji(tag, &StyleOptions)
  - box_header(title, subtitle_opt, &StyleOptions)
  - table(headers, rows, &StyleOptions)
  - render_reply(&Reply, &StyleOptions)

Chat markup in replies (`**bold**`, backticks, code fences) is mapped onto
ANSI styles or stripped. These helpers return strings and never print.
JSON output paths do not use them.
*/

use std::borrow::Cow;

use super::response::Reply;

/* -------------------------------------------------------------------------- */
/* Style Options                                                              */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub use_color: bool,
    pub use_emoji: bool,
    pub term_width: usize,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self::detect()
    }
}

impl StyleOptions {
    pub fn detect() -> Self {
        let width = std::env::var("COLUMNS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|w| w.clamp(40, 220))
            .unwrap_or(100);

        StyleOptions {
            use_color: std::env::var_os("NO_COLOR").is_none(),
            use_emoji: std::env::var_os("NO_EMOJI").is_none(),
            term_width: width,
        }
    }

    /// No color, no emoji, fixed width. Used by tests and piped output.
    pub fn plain() -> Self {
        StyleOptions {
            use_color: false,
            use_emoji: false,
            term_width: 100,
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Color / Emoji                                                              */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Primary,
    Secondary,
    Accent,
    Dim,
    Bold,
}

pub fn color(role: Role, text: impl AsRef<str>, style: &StyleOptions) -> String {
    if !style.use_color {
        return text.as_ref().to_string();
    }
    let code = match role {
        Role::Primary => "38;5;45",    // cyan-ish
        Role::Secondary => "38;5;250", // gray
        Role::Accent => "38;5;213",    // magenta/pink
        Role::Dim => "2",
        Role::Bold => "1",
    };
    format!("\x1b[{code}m{}\x1b[0m", text.as_ref())
}

pub fn emoji(tag: &str, style: &StyleOptions) -> &'static str {
    if !style.use_emoji {
        return "";
    }
    match tag {
        "list" => "📜",
        "clock" => "⏱",
        _ => "",
    }
}

/* -------------------------------------------------------------------------- */
/* Box Header                                                                 */
/* -------------------------------------------------------------------------- */

pub fn box_header(
    title: impl AsRef<str>,
    subtitle: Option<impl AsRef<str>>,
    style: &StyleOptions,
) -> String {
    let title_styled = color(Role::Primary, title.as_ref(), style);
    let inner = match subtitle {
        Some(s) => format!("{title_styled}  {}", color(Role::Secondary, s.as_ref(), style)),
        None => title_styled,
    };

    let max_inner = style.term_width.clamp(20, 200) - 4;
    let lines = if display_width(&inner) > max_inner {
        wrap_text(&inner, max_inner)
    } else {
        vec![inner]
    };
    let width = lines.iter().map(|l| display_width(l)).max().unwrap_or(0);

    let mut out = Vec::with_capacity(lines.len() + 2);
    out.push(format!("┌{}┐", "─".repeat(width + 2)));
    for line in lines {
        let pad = width - display_width(&line);
        out.push(format!("│ {line}{} │", " ".repeat(pad)));
    }
    out.push(format!("└{}┘", "─".repeat(width + 2)));
    out.join("\n")
}

/* -------------------------------------------------------------------------- */
/* Table Rendering                                                             */
/* -------------------------------------------------------------------------- */

/// Two-or-more column table; cells may span lines, columns are padded to
/// the widest line and the last column is not padded.
pub fn table(headers: &[&str], rows: &[Vec<String>], style: &StyleOptions) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let col_count = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(col_count) {
            let w = cell.lines().map(display_width).max().unwrap_or(0);
            widths[i] = widths[i].max(w);
        }
    }

    let mut out = String::new();
    let header_line = headers
        .iter()
        .enumerate()
        .map(|(i, h)| pad(h, widths[i], i + 1 == col_count))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(&color(Role::Accent, header_line, style));
    out.push('\n');
    let sep = widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(&color(Role::Dim, sep, style));

    for row in rows {
        let cells: Vec<Vec<&str>> = (0..col_count)
            .map(|c| row.get(c).map(|s| s.lines().collect()).unwrap_or_default())
            .collect();
        let height = cells.iter().map(Vec::len).max().unwrap_or(0).max(1);
        for line_idx in 0..height {
            out.push('\n');
            let line = (0..col_count)
                .map(|c| {
                    let text = cells[c].get(line_idx).copied().unwrap_or("");
                    pad(text, widths[c], c + 1 == col_count)
                })
                .collect::<Vec<_>>()
                .join("  ");
            out.push_str(line.trim_end());
        }
    }
    out
}

fn pad(s: &str, width: usize, last: bool) -> String {
    let len = display_width(s);
    if last || len >= width {
        return s.to_string();
    }
    format!("{s}{}", " ".repeat(width - len))
}

/* -------------------------------------------------------------------------- */
/* Replies                                                                     */
/* -------------------------------------------------------------------------- */

/// Map chat markup onto terminal styling: `**x**` -> bold, code fences and
/// inline backticks dropped.
pub fn chat_markup(text: &str, style: &StyleOptions) -> String {
    let text = text.replace("```", "");
    let mut out = String::with_capacity(text.len());
    for (i, part) in text.split("**").enumerate() {
        if i % 2 == 1 {
            out.push_str(&color(Role::Bold, part, style));
        } else {
            out.push_str(part);
        }
    }
    out.replace('`', "")
}

pub fn render_reply(reply: &Reply, style: &StyleOptions) -> String {
    let mut sections = Vec::new();
    if let Some(title) = &reply.title {
        sections.push(box_header(format!("{} {title}", emoji("list", style)).trim(), None::<&str>, style));
    }
    if let Some(description) = reply.description.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        sections.push(chat_markup(description, style));
    }
    if !reply.fields.is_empty() {
        let rows: Vec<Vec<String>> = reply
            .fields
            .iter()
            .map(|f| vec![chat_markup(&f.name, style), chat_markup(&f.value, style)])
            .collect();
        sections.push(table(&["NAME", "VALUE"], &rows, style));
    }
    if let Some(footer) = &reply.footer {
        sections.push(color(
            Role::Dim,
            format!("{} {footer}", emoji("clock", style)).trim(),
            style,
        ));
    }
    sections.join("\n")
}

/* -------------------------------------------------------------------------- */
/* Text Helpers                                                                */
/* -------------------------------------------------------------------------- */

pub fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in s.split_whitespace() {
        if !current.is_empty() && display_width(&current) + display_width(word) + 1 > max_width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/* -------------------------------------------------------------------------- */
/* ANSI / Width Utilities                                                      */
/* -------------------------------------------------------------------------- */

fn strip_ansi(s: &str) -> Cow<'_, str> {
    // No regex: skip ESC '[' up to the final letter
    if !s.contains('\x1b') {
        return Cow::Borrowed(s);
    }
    let mut buf = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for n in chars.by_ref() {
                if n.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        buf.push(c);
    }
    Cow::Owned(buf)
}

fn display_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

/* -------------------------------------------------------------------------- */
/* Tests                                                                       */
/* -------------------------------------------------------------------------- */
