//! Throttle scripts: piecewise-linear keyframes plus button presses.
//!
//! ```text
//! # seconds  throttle
//! 0.0   0.0
//! 2.0   0.0
//! 2.15  0.32
//! 2.3   0.0
//! press 5.0 0.2    # short press at 5 s held for 0.2 s
//! ```

use std::fmt;

/// Parse failure with its 1-based line number.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ScriptError {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThrottleScript {
    /// `(seconds, throttle)` sorted by time
    pub keyframes: Vec<(f32, f32)>,
    /// `(start, hold)` in seconds
    pub presses: Vec<(f32, f32)>,
}

impl ThrottleScript {
    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        let mut script = ThrottleScript::default();
        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let content = line.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }
            let fields: Vec<&str> = content.split_whitespace().collect();
            let err = |message: &str| ScriptError {
                line: line_no,
                message: message.to_string(),
            };
            match fields.as_slice() {
                ["press", start, hold] => {
                    let start = parse_secs(start).ok_or_else(|| err("bad press time"))?;
                    let hold = parse_secs(hold).ok_or_else(|| err("bad press duration"))?;
                    script.presses.push((start, hold));
                }
                [time, value] => {
                    let time = parse_secs(time).ok_or_else(|| err("bad time"))?;
                    let value = value
                        .parse::<f32>()
                        .ok()
                        .filter(|v| v.is_finite())
                        .ok_or_else(|| err("bad throttle value"))?;
                    if script.keyframes.last().is_some_and(|&(t, _)| time < t) {
                        return Err(err("keyframes must be in time order"));
                    }
                    script.keyframes.push((time, value.clamp(0.0, 1.0)));
                }
                _ => return Err(err("expected `<seconds> <throttle>` or `press <start> <hold>`")),
            }
        }
        script.presses.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(script)
    }

    /// Throttle at `t` seconds; held flat before the first and after the
    /// last keyframe.
    pub fn value_at(&self, t: f32) -> f32 {
        let Some(&(first_t, first_v)) = self.keyframes.first() else {
            return 0.0;
        };
        if t <= first_t {
            return first_v;
        }
        for pair in self.keyframes.windows(2) {
            let (t0, v0) = pair[0];
            let (t1, v1) = pair[1];
            if t <= t1 {
                if t1 <= t0 {
                    return v1;
                }
                return v0 + (v1 - v0) * (t - t0) / (t1 - t0);
            }
        }
        self.keyframes.last().map_or(0.0, |&(_, v)| v)
    }

    /// Time of the last keyframe or press release.
    pub fn duration(&self) -> f32 {
        let last_key = self.keyframes.last().map_or(0.0, |&(t, _)| t);
        let last_press = self
            .presses
            .iter()
            .map(|&(start, hold)| start + hold)
            .fold(0.0, f32::max);
        last_key.max(last_press)
    }
}

fn parse_secs(field: &str) -> Option<f32> {
    field.parse::<f32>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}
