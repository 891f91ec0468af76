//! SRT caption resynchronization.
//!
//! When a video is trimmed, its captions must move with it. [`shift_captions`]
//! moves every cue earlier by the trim offset, drops cues that end before the
//! new zero point and clamps the start of cues that straddle it. Output is
//! always canonical SRT (`HH:MM:SS,mmm --> HH:MM:SS,mmm`, blank line between
//! cues), so shifting the output again by zero returns it unchanged.
//!
//! Cues keep their original order and index lines; nothing is renumbered.

use regex::Regex;
use std::fmt::Write as _;
use std::sync::LazyLock;

static TIMING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(\d+):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d+):(\d{2}):(\d{2})[,.](\d{3})(.*)$",
    )
    .unwrap()
});

/// One parsed cue, borrowing text from the source track.
#[derive(Debug, Clone, PartialEq)]
struct Cue<'a> {
    index: Option<&'a str>,
    start_ms: i64,
    end_ms: i64,
    settings: &'a str,
    text: Vec<&'a str>,
}

/// Shift every cue in `track` earlier by `offset_ms`.
///
/// A cue whose shifted end is at or before zero is removed along with its
/// index and text. A cue that starts before the offset but ends after it
/// starts at zero. Blocks without a timing line are not cues and are dropped.
pub fn shift_captions(track: &str, offset_ms: i64) -> String {
    let cues = parse_cues(track)
        .into_iter()
        .filter_map(|cue| shift_cue(cue, offset_ms))
        .collect::<Vec<_>>();
    render(&cues)
}

/// Cut the `[start_ms, end_ms)` window out of `track`, rebased to zero.
///
/// Cues that end before the window or start at or after its end are removed;
/// the rest are clamped to the window.
pub fn window_captions(track: &str, start_ms: u64, end_ms: u64) -> String {
    let window_len = end_ms.saturating_sub(start_ms) as i64;
    let cues = parse_cues(track)
        .into_iter()
        .filter_map(|cue| shift_cue(cue, start_ms as i64))
        .filter(|cue| cue.start_ms < window_len)
        .map(|mut cue| {
            cue.end_ms = cue.end_ms.min(window_len);
            cue
        })
        .collect::<Vec<_>>();
    render(&cues)
}

/// Number of cues in `track`.
pub fn cue_count(track: &str) -> usize {
    parse_cues(track).len()
}

fn shift_cue(mut cue: Cue<'_>, offset_ms: i64) -> Option<Cue<'_>> {
    let end_ms = cue.end_ms.saturating_sub(offset_ms);
    if end_ms <= 0 {
        return None;
    }
    cue.start_ms = cue.start_ms.saturating_sub(offset_ms).max(0);
    cue.end_ms = end_ms;
    Some(cue)
}

fn parse_cues(track: &str) -> Vec<Cue<'_>> {
    let track = track.strip_prefix('\u{feff}').unwrap_or(track);

    let mut blocks: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in track.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks.into_iter().filter_map(parse_block).collect()
}

fn parse_block(block: Vec<&str>) -> Option<Cue<'_>> {
    // The timing line is either first or follows a single index line.
    let (pos, caps) = block
        .iter()
        .copied()
        .take(2)
        .enumerate()
        .find_map(|(i, line)| TIMING_LINE.captures(line).map(|caps| (i, caps)))?;

    let field = |n: usize| -> Option<i64> { caps.get(n)?.as_str().parse().ok() };
    let start_ms = to_ms(field(1)?, field(2)?, field(3)?, field(4)?)?;
    let end_ms = to_ms(field(5)?, field(6)?, field(7)?, field(8)?)?;
    let settings = caps.get(9).map_or("", |m| m.as_str().trim());

    Some(Cue {
        index: (pos == 1).then(|| block[0].trim()),
        start_ms,
        end_ms,
        settings,
        text: block[pos + 1..].to_vec(),
    })
}

/// `None` when the timestamp does not fit in an `i64` of milliseconds.
fn to_ms(h: i64, m: i64, s: i64, ms: i64) -> Option<i64> {
    h.checked_mul(60)?
        .checked_add(m)?
        .checked_mul(60)?
        .checked_add(s)?
        .checked_mul(1000)?
        .checked_add(ms)
}

/// Format milliseconds as an SRT timestamp.
pub fn format_timestamp(ms: u64) -> String {
    let h = ms / 3_600_000;
    let m = (ms % 3_600_000) / 60_000;
    let s = (ms % 60_000) / 1000;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms % 1000)
}

fn render(cues: &[Cue<'_>]) -> String {
    let mut out = String::new();
    for (i, cue) in cues.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if let Some(index) = cue.index {
            out.push_str(index);
            out.push('\n');
        }
        let _ = write!(
            out,
            "{} --> {}",
            format_timestamp(cue.start_ms.max(0) as u64),
            format_timestamp(cue.end_ms.max(0) as u64)
        );
        if !cue.settings.is_empty() {
            out.push(' ');
            out.push_str(cue.settings);
        }
        out.push('\n');
        for line in &cue.text {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}
