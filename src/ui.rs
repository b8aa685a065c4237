use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// enable output from `debug!`
pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

#[macro_export]
macro_rules! warning {
    // format string literal (with or without inline formatting)
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stderr(), "{}", format!($fmt $(, $($arg)*)?).yellow());
    }};
    // arbitrary expression (non-literal)
    ($expr:expr) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stderr(), "{}", format!("{}", $expr).yellow());
    }};
}

#[macro_export]
macro_rules! error {
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stderr(), "{}", format!($fmt $(, $($arg)*)?).red());
    }};
    ($expr:expr) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stderr(), "{}", format!("{}", $expr).red());
    }};
}

#[macro_export]
macro_rules! status {
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stdout(), "{}", format!($fmt $(, $($arg)*)?).green());
    }};
    ($expr:expr) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stdout(), "{}", format!("{}", $expr).green());
    }};
}

#[macro_export]
macro_rules! info {
    () => {{
        use std::io::{self, Write};
        let _ = writeln!(io::stdout());
    }};
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        use std::io::{self, Write};
        let _ = writeln!(io::stdout(), $fmt $(, $($arg)*)?);
    }};
    ($expr:expr) => {{
        use std::io::{self, Write};
        let _ = writeln!(io::stdout(), "{}", $expr);
    }};
}

/// dimmed diagnostics on stderr, only with --verbose
#[macro_export]
macro_rules! debug {
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        if $crate::ui::is_verbose() {
            use colored::Colorize;
            use std::io::{self, Write};
            let _ = writeln!(io::stderr(), "{}", format!($fmt $(, $($arg)*)?).dimmed());
        }
    }};
}

/// what happened at a single-key prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    /// lowercased first char of the chosen option
    Choice(char),
    /// esc or ctrl-c
    Cancelled,
    /// no key within the timeout
    TimedOut,
}

/// single-key prompt, enter picks the first option
pub fn prompt(options: &[&str], timeout: Option<Duration>) -> Result<PromptOutcome> {
    use crossterm::{
        event::{self, KeyCode, KeyModifiers},
        terminal::{disable_raw_mode, enable_raw_mode},
    };
    use std::io::{self, Write};

    debug_assert!(!options.is_empty(), "prompt requires at least one option");
    debug_assert!(
        options.iter().all(|opt| !opt.is_empty()),
        "prompt options cannot be empty strings"
    );

    // build prompt string like "[s]tage/[u]nstage/[q]uit"
    let mut prompt_parts = Vec::with_capacity(options.len());
    let mut valid_chars = Vec::with_capacity(options.len());
    for opt in options {
        let mut chars = opt.chars();
        let Some(first) = chars.next() else {
            continue;
        };
        prompt_parts.push(format!("[{first}]{}", chars.as_str()));
        valid_chars.push(first.to_lowercase().next().unwrap_or(first));
    }

    print!("{} ? ", prompt_parts.join("/"));
    let _ = io::stdout().flush();

    enable_raw_mode().context("this command requires an interactive terminal")?;
    let deadline = timeout.map(|timeout| Instant::now() + timeout);

    loop {
        if let Some(deadline) = deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let ready = match event::poll(remaining) {
                Ok(ready) => ready,
                Err(e) => {
                    disable_raw_mode().ok();
                    return Err(e).context("failed to wait for terminal input");
                }
            };
            if !ready {
                // the next prompt reuses this line
                disable_raw_mode().ok();
                let _ = clear_line(&mut io::stdout());
                break Ok(PromptOutcome::TimedOut);
            }
        }

        let key = match key_press(event::read()) {
            Ok(key) => key,
            Err(e) => {
                disable_raw_mode().ok();
                return Err(e);
            }
        };
        let Some((code, modifiers)) = key else {
            continue;
        };

        match code {
            KeyCode::Esc => {
                disable_raw_mode().ok();
                info!("^C");
                break Ok(PromptOutcome::Cancelled);
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                disable_raw_mode().ok();
                info!("^C");
                break Ok(PromptOutcome::Cancelled);
            }
            KeyCode::Enter => {
                disable_raw_mode().ok();
                info!(options[0]);
                break Ok(PromptOutcome::Choice(valid_chars[0]));
            }
            KeyCode::Char(c) => {
                let lower = c.to_lowercase().next().unwrap_or(c);
                if let Some(idx) = valid_chars.iter().position(|&ch| ch == lower) {
                    disable_raw_mode().ok();
                    info!(options[idx]);
                    break Ok(PromptOutcome::Choice(lower));
                }
            }
            _ => {}
        }
    }
}

/// key code and modifiers of a key press, None for any other event
fn key_press(
    event: std::io::Result<crossterm::event::Event>,
) -> Result<Option<(crossterm::event::KeyCode, crossterm::event::KeyModifiers)>> {
    use crossterm::event::{Event, KeyEvent, KeyEventKind};

    match event.context("failed to read terminal input")? {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) => Ok(Some((code, modifiers))),
        _ => Ok(None),
    }
}

/// move to the start of the current line and erase it
fn clear_line(out: &mut impl std::io::Write) -> std::io::Result<()> {
    use crossterm::{
        cursor::MoveToColumn,
        queue,
        terminal::{Clear, ClearType},
    };

    queue!(out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
    out.flush()
}

/// read one line with readline editing, None on ctrl-c or ctrl-d
pub fn read_line(prompt: &str) -> Result<Option<String>> {
    use rustyline::DefaultEditor;

    let mut editor = DefaultEditor::new().context("failed to initialise line editor")?;
    match editor.readline(prompt) {
        Ok(line) => Ok(Some(line.trim().to_string())),
        Err(_) => {
            info!("^C");
            Ok(None)
        }
    }
}

/// split a selection line into words, honouring shell quoting
pub fn split_words(line: &str) -> Option<Vec<String>> {
    shlex::split(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{
        Event, KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers,
    };
    use std::io;

    #[test]
    fn test_key_press_filters_events() {
        let press = Event::Key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::NONE));
        assert_eq!(
            key_press(Ok(press)).unwrap(),
            Some((KeyCode::Char('s'), KeyModifiers::NONE))
        );

        let release = Event::Key(KeyEvent {
            code: KeyCode::Char('s'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });
        assert_eq!(key_press(Ok(release)).unwrap(), None);
        assert_eq!(key_press(Ok(Event::FocusGained)).unwrap(), None);
    }

    #[test]
    fn test_key_press_returns_read_errors() {
        let err = key_press(Err(io::Error::other("tty closed"))).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read terminal input"));
        assert!(format!("{err:#}").contains("tty closed"));
    }

    #[test]
    fn test_clear_line_stays_on_line() {
        let mut out = Vec::new();
        clear_line(&mut out).unwrap();
        let written = String::from_utf8(out).unwrap();

        assert!(written.contains("\x1b[2K"), "erases the line: {written:?}");
        assert!(!written.contains('\n'), "no newline: {written:?}");
    }

    #[test]
    fn test_split_words() {
        assert_eq!(
            split_words(r#"1 a.txt "with space.txt""#),
            Some(vec![
                "1".to_string(),
                "a.txt".to_string(),
                "with space.txt".to_string()
            ])
        );
        assert_eq!(split_words(""), Some(Vec::new()));
        assert_eq!(split_words("\"unterminated"), None);
    }
}
