//! Interpreter stack snapshots for diagnosing failed calls

use std::fmt;

/// One interpreter call frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackFrame {
    pub filename: String,
    pub line: u32,
    /// Source text (or the best description the interpreter has) for the line
    pub code: String,
}

impl StackFrame {
    pub fn new(filename: impl Into<String>, line: u32, code: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            line,
            code: code.into(),
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  File \"{}\", line {}", self.filename, self.line)?;
        if !self.code.is_empty() {
            write!(f, "\n    {}", self.code)?;
        }
        Ok(())
    }
}

/// Render frames as a traceback block, innermost first.
pub fn format_trace(frames: &[StackFrame]) -> String {
    if frames.is_empty() {
        return String::from("<no script stack>");
    }
    let mut out = String::from("Traceback (innermost first):");
    for frame in frames {
        out.push('\n');
        out.push_str(&frame.to_string());
    }
    out
}

/// Parse a JavaScript `Error.stack` string.
///
/// Accepts `at name (file:line)`, `at name (file:line:col)` and `at file:line`
/// lines; anything else is skipped. Frames keep the engine's order, which is
/// innermost first. The function name becomes the frame's code text since the
/// engine does not keep source lines around.
pub fn parse_js_stack(stack: &str) -> Vec<StackFrame> {
    stack
        .lines()
        .filter_map(|line| line.trim().strip_prefix("at "))
        .map(|entry| {
            let (name, location) = match (entry.rfind('('), entry.ends_with(')')) {
                (Some(open), true) => (entry[..open].trim(), &entry[open + 1..entry.len() - 1]),
                _ => ("", entry),
            };
            let (filename, line) = split_location(location);
            StackFrame::new(filename, line, name)
        })
        .collect()
}

fn split_location(location: &str) -> (&str, u32) {
    let Some((head, last)) = location.rsplit_once(':') else {
        return (location, 0);
    };
    let Ok(last) = last.parse::<u32>() else {
        return (location, 0);
    };
    match head.rsplit_once(':') {
        Some((file, line)) => match line.parse::<u32>() {
            Ok(line) => (file, line),
            Err(_) => (head, last),
        },
        None => (head, last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STACK: &str = "Error: boom\n    at explode (hooks.js:12)\n    at onTurn (hooks.js:4:9)\n    at <eval> (eval_script:1)\n    at push (native)\n";

    #[test]
    fn parses_frames_innermost_first() {
        let frames = parse_js_stack(STACK);
        assert_eq!(
            frames,
            vec![
                StackFrame::new("hooks.js", 12, "explode"),
                StackFrame::new("hooks.js", 4, "onTurn"),
                StackFrame::new("eval_script", 1, "<eval>"),
                StackFrame::new("native", 0, "push"),
            ]
        );
    }

    #[test]
    fn parses_anonymous_frames_and_drive_letters() {
        let frames = parse_js_stack("    at C:\\mods\\hooks.js:7");
        assert_eq!(frames, vec![StackFrame::new("C:\\mods\\hooks.js", 7, "")]);
    }

    #[test]
    fn renders_traceback() {
        let frames = vec![
            StackFrame::new("hooks.js", 3, "canFound"),
            StackFrame::new("hooks.js", 9, ""),
        ];
        assert_eq!(
            format_trace(&frames),
            "Traceback (innermost first):\n  File \"hooks.js\", line 3\n    canFound\n  File \"hooks.js\", line 9"
        );
        assert_eq!(format_trace(&[]), "<no script stack>");
    }
}
