use std::{collections::BTreeMap, error::Error, fmt};

use overworld_core::Key;
use overworld_rendering::FrameInput;

/// Parses a timed input script into per-frame input.
///
/// Each non-empty line reads `<seconds> <action>`, where the action is
/// `press <key>`, `release <key>`, `dismiss`, `pause` or `resume`. Text after
/// `#` is ignored.
pub(crate) fn parse(script: &str, fps: u32) -> Result<BTreeMap<u32, FrameInput>, ScriptError> {
    let mut frames: BTreeMap<u32, FrameInput> = BTreeMap::new();
    for (index, raw) in script.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let mut words = line.split_whitespace();
        let seconds = words
            .next()
            .and_then(|word| word.parse::<f32>().ok())
            .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
            .ok_or(ScriptError::InvalidTime { line: line_number })?;
        let action = words
            .next()
            .ok_or(ScriptError::MissingAction { line: line_number })?;

        let mut input = FrameInput::default();
        match action {
            "press" => input.pressed.push(parse_key(words.next(), line_number)?),
            "release" => input.released.push(parse_key(words.next(), line_number)?),
            "dismiss" => input.dismiss = true,
            "pause" => input.pause = Some(true),
            "resume" => input.pause = Some(false),
            other => {
                return Err(ScriptError::UnknownAction {
                    line: line_number,
                    action: other.to_owned(),
                })
            }
        }
        if words.next().is_some() {
            return Err(ScriptError::TrailingInput { line: line_number });
        }

        let frame = (seconds * fps as f32).round() as u32;
        frames.entry(frame).or_default().merge(input);
    }
    Ok(frames)
}

fn parse_key(word: Option<&str>, line: usize) -> Result<Key, ScriptError> {
    let word = word.ok_or(ScriptError::MissingKey { line })?;
    word.parse().map_err(|_| ScriptError::UnknownKey {
        line,
        key: word.to_owned(),
    })
}

/// Errors that can occur while reading an input script.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ScriptError {
    /// The line does not start with a non-negative number of seconds.
    InvalidTime {
        /// One-based line number.
        line: usize,
    },
    /// The line has a time but no action.
    MissingAction {
        /// One-based line number.
        line: usize,
    },
    /// The action is not part of the script vocabulary.
    UnknownAction {
        /// One-based line number.
        line: usize,
        /// Rejected action word.
        action: String,
    },
    /// A press or release names no key.
    MissingKey {
        /// One-based line number.
        line: usize,
    },
    /// A press or release names an unknown key.
    UnknownKey {
        /// One-based line number.
        line: usize,
        /// Rejected key word.
        key: String,
    },
    /// Words follow a complete action.
    TrailingInput {
        /// One-based line number.
        line: usize,
    },
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTime { line } => {
                write!(f, "line {line}: expected a non-negative time in seconds")
            }
            Self::MissingAction { line } => write!(f, "line {line}: missing action"),
            Self::UnknownAction { line, action } => {
                write!(f, "line {line}: unknown action '{action}'")
            }
            Self::MissingKey { line } => write!(f, "line {line}: missing key"),
            Self::UnknownKey { line, key } => write!(f, "line {line}: unknown key '{key}'"),
            Self::TrailingInput { line } => write!(f, "line {line}: unexpected trailing input"),
        }
    }
}

impl Error for ScriptError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_land_on_rounded_frames() {
        let script = "\
            # walk right, then swing\n\
            0 press right\n\
            0.5 release right\n\
            0.5 press attack\n\
            \n\
            1.25 dismiss # close the sign\n\
            2 pause\n";
        let frames = parse(script, 60).expect("script parses");

        assert_eq!(frames.keys().copied().collect::<Vec<_>>(), vec![0, 30, 75, 120]);
        assert_eq!(frames[&0].pressed, vec![Key::Right]);
        assert_eq!(frames[&30].released, vec![Key::Right]);
        assert_eq!(frames[&30].pressed, vec![Key::Attack]);
        assert!(frames[&75].dismiss);
        assert_eq!(frames[&120].pause, Some(true));
    }

    #[test]
    fn press_and_release_in_one_frame_is_a_tap() {
        let frames = parse("1.0 press attack\n1.004 release attack\n", 60).expect("parses");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[&60].pressed, vec![Key::Attack]);
        assert_eq!(frames[&60].tapped, vec![Key::Attack]);
        assert!(frames[&60].released.is_empty());
    }

    #[test]
    fn malformed_lines_report_their_position() {
        assert_eq!(
            parse("soon press left", 60),
            Err(ScriptError::InvalidTime { line: 1 })
        );
        assert_eq!(
            parse("0 press left\n1 jump", 60),
            Err(ScriptError::UnknownAction {
                line: 2,
                action: "jump".to_owned()
            })
        );
        assert_eq!(
            parse("1 press", 60),
            Err(ScriptError::MissingKey { line: 1 })
        );
        assert_eq!(
            parse("1 release sideways", 60),
            Err(ScriptError::UnknownKey {
                line: 1,
                key: "sideways".to_owned()
            })
        );
        assert_eq!(
            parse("1 dismiss now", 60),
            Err(ScriptError::TrailingInput { line: 1 })
        );
    }
}
