//! ISO 8601 duration codec for the entity description fields
//! (`LockDuration`, `DefaultMessageTimeToLive`, `AutoDeleteOnIdle`, ...).
//!
//! The service stores durations as .NET `TimeSpan` values, so the largest
//! representable duration is `TimeSpan.MaxValue`. Anything at or above that
//! value is treated as "infinite" and written as the sentinel string the
//! service itself returns.

use std::num::IntErrorKind;
use std::time::Duration;
use thiserror::Error;

/// .NET `TimeSpan.MaxValue`: 10 675 199 days, 2:48:05.4775807.
pub const MAX_DURATION: Duration = Duration::new(922_337_203_685, 477_580_700);

/// Wire form of [`MAX_DURATION`].
pub const MAX_DURATION_ISO8601: &str = "P10675199DT2H48M5.4775807S";

const NANOS_PER_SECOND: u128 = 1_000_000_000;
const MAX_DURATION_NANOS: u128 = 922_337_203_685_477_580_700;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid ISO 8601 duration {value:?}: {reason}")]
pub struct DurationError {
    pub value: String,
    pub reason: &'static str,
}

impl DurationError {
    fn new(value: &str, reason: &'static str) -> Self {
        Self {
            value: value.to_string(),
            reason,
        }
    }
}

/// Encodes an optional duration; `None` stays `None`.
pub fn duration_to_iso8601(duration: Option<Duration>) -> Option<String> {
    duration.map(format_duration)
}

/// Decodes an optional duration string; `None` stays `None`.
pub fn iso8601_to_duration(value: Option<&str>) -> Result<Option<Duration>, DurationError> {
    value.map(parse_duration).transpose()
}

/// Formats `duration` as `PT<total minutes>M<seconds>S`.
///
/// Sub-second precision is kept with trailing zeros trimmed. Durations at or
/// above [`MAX_DURATION`] produce [`MAX_DURATION_ISO8601`].
pub fn format_duration(duration: Duration) -> String {
    if duration >= MAX_DURATION {
        return MAX_DURATION_ISO8601.to_string();
    }

    let total_seconds = duration.as_secs();
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    let nanos = duration.subsec_nanos();

    if nanos == 0 {
        format!("PT{minutes}M{seconds}S")
    } else {
        let fraction = format!("{nanos:09}");
        format!("PT{minutes}M{seconds}.{}S", fraction.trim_end_matches('0'))
    }
}

/// Parses `P[nW][nD][T[nH][nM][n[.f]S]]`.
///
/// Year and month designators are rejected because their length is not fixed.
/// Values at or above [`MAX_DURATION`], including values too large to compute,
/// clamp to [`MAX_DURATION`]. Fractions beyond nanosecond precision are
/// truncated.
pub fn parse_duration(value: &str) -> Result<Duration, DurationError> {
    if value.starts_with('-') {
        return Err(DurationError::new(value, "negative durations are not supported"));
    }
    let body = value
        .strip_prefix('P')
        .ok_or_else(|| DurationError::new(value, "missing 'P' designator"))?;
    if body.is_empty() {
        return Err(DurationError::new(value, "no components"));
    }

    let (date_part, time_part) = match body.split_once('T') {
        Some((date, time)) => {
            if time.is_empty() {
                return Err(DurationError::new(value, "'T' without time components"));
            }
            (date, Some(time))
        }
        None => (body, None),
    };

    let mut total: Option<u128> = Some(0);
    let mut add = |component: Component, unit_seconds: u128| {
        total = total.and_then(|t| component.nanos(unit_seconds).and_then(|n| t.checked_add(n)));
    };

    for component in components(value, date_part, &['W', 'D'])? {
        let unit = match component.unit {
            'W' => 7 * 86_400,
            _ => 86_400,
        };
        add(component, unit);
    }
    if let Some(time) = time_part {
        for component in components(value, time, &['H', 'M', 'S'])? {
            let unit = match component.unit {
                'H' => 3_600,
                'M' => 60,
                _ => 1,
            };
            add(component, unit);
        }
    }

    match total {
        Some(nanos) if nanos < MAX_DURATION_NANOS => Ok(Duration::new(
            (nanos / NANOS_PER_SECOND) as u64,
            (nanos % NANOS_PER_SECOND) as u32,
        )),
        _ => Ok(MAX_DURATION),
    }
}

#[derive(Debug, Clone, Copy)]
struct Component {
    /// Integer part; `None` when it does not fit in `u128`.
    whole: Option<u128>,
    /// Fractional digits, truncated to nanosecond precision.
    fraction: u128,
    fraction_digits: u32,
    unit: char,
}

impl Component {
    fn nanos(&self, unit_seconds: u128) -> Option<u128> {
        let unit_nanos = unit_seconds * NANOS_PER_SECOND;
        let whole = self.whole?.checked_mul(unit_nanos)?;
        let fraction = self.fraction * unit_nanos / 10u128.pow(self.fraction_digits);
        whole.checked_add(fraction)
    }
}

/// Splits `part` into number/designator pairs, enforcing the designator order
/// given in `allowed` and that each appears at most once.
fn components(
    value: &str,
    part: &str,
    allowed: &[char],
) -> Result<Vec<Component>, DurationError> {
    let mut result = Vec::new();
    let mut next_allowed = 0;
    let mut number = String::new();

    for ch in part.chars() {
        if ch.is_ascii_digit() || ch == '.' || ch == ',' {
            number.push(if ch == ',' { '.' } else { ch });
            continue;
        }

        let position = allowed[next_allowed..]
            .iter()
            .position(|unit| *unit == ch)
            .ok_or_else(|| match ch {
                'Y' => DurationError::new(value, "year designators are not supported"),
                'M' if !allowed.contains(&'H') => {
                    DurationError::new(value, "month designators are not supported")
                }
                '-' => DurationError::new(value, "negative durations are not supported"),
                _ => DurationError::new(value, "unexpected or out of order designator"),
            })?;
        next_allowed += position + 1;

        if number.is_empty() {
            return Err(DurationError::new(value, "designator without a number"));
        }
        result.push(parse_component(value, &number, ch)?);
        number.clear();
    }

    if !number.is_empty() {
        return Err(DurationError::new(value, "number without a designator"));
    }
    Ok(result)
}

fn parse_component(value: &str, number: &str, unit: char) -> Result<Component, DurationError> {
    let (whole, fraction) = match number.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (number, ""),
    };
    if whole.is_empty() || fraction.contains('.') {
        return Err(DurationError::new(value, "malformed number"));
    }

    let whole = match whole.parse::<u128>() {
        Ok(n) => Some(n),
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => None,
        Err(_) => return Err(DurationError::new(value, "malformed number")),
    };

    let truncated: String = fraction.chars().take(9).collect();
    let fraction_digits = truncated.len() as u32;
    let fraction = if truncated.is_empty() {
        0
    } else {
        truncated
            .parse::<u128>()
            .map_err(|_| DurationError::new(value, "malformed fraction"))?
    };

    Ok(Component {
        whole,
        fraction,
        fraction_digits,
        unit,
    })
}
