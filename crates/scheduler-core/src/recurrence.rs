//! Recurrence Engine (spec §4.1).
//!
//! Parses the semicolon-separated `KEY=VALUE` rule grammar described in
//! spec §6.1, applies its custom defaults, then — following the same
//! "validate, normalize, hand off to `rrule::RRuleSet`" approach the
//! teacher's `RecurrenceManager::normalize_rrule` uses for real RFC 5545
//! rules — builds a canonical `DTSTART`+`RRULE` string and lets the `rrule`
//! crate do the RFC 5545 heavy lifting (BYDAY/BYMONTHDAY/BYMONTH/BYSETPOS/
//! COUNT/UNTIL). The non-standard `DURATION` token has no RFC 5545
//! equivalent, so it is parsed separately and reattached to every
//! generated start instant.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use rrule::{RRuleSet, Tz as RRuleTz};
use std::collections::HashMap;

use crate::error::CoreError;

const DTSTART_FMT: &str = "%Y%m%dT%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Freq {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Freq {
    fn as_rrule_token(self) -> &'static str {
        match self {
            Freq::Daily => "DAILY",
            Freq::Weekly => "WEEKLY",
            Freq::Monthly => "MONTHLY",
            Freq::Yearly => "YEARLY",
        }
    }
}

/// A single generated start/end pair, with the single-shot flag carried
/// from the rule's nominal `DURATION` (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub single_shot: bool,
}

/// A parsed and validated recurrence rule.
#[derive(Debug, Clone)]
pub struct RecurrenceRule {
    tokens: HashMap<String, String>,
    dtstart: DateTime<Utc>,
    duration_minutes: i64,
    single_shot: bool,
    canonical: String,
}

impl RecurrenceRule {
    /// Parses a rule string per spec §6.1, applying every default in the
    /// table of spec §4.1.
    pub fn parse(rule_str: &str) -> Result<Self, CoreError> {
        Self::parse_for_series(rule_str, 0)
    }

    /// Same as [`parse`](Self::parse) but tags parse failures with the
    /// originating series id, so the Resolver can report which series was
    /// skipped (spec §4.3 failure model).
    pub fn parse_for_series(rule_str: &str, series_id: i64) -> Result<Self, CoreError> {
        let invalid = |reason: String| CoreError::InvalidRule { series_id, reason };

        let mut tokens: HashMap<String, String> = HashMap::new();
        for token in rule_str.split(';') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            if let Some(rest) = token.strip_prefix("DTSTART:") {
                tokens.insert("DTSTART".to_string(), rest.to_string());
                continue;
            }
            match token.split_once('=') {
                Some((k, v)) => {
                    tokens.insert(k.trim().to_uppercase(), v.trim().to_string());
                }
                None => return Err(invalid(format!("unrecognized token '{token}'"))),
            }
        }

        if !tokens.contains_key("FREQ") {
            tokens.insert("FREQ".to_string(), "DAILY".to_string());
        }
        let freq = match tokens["FREQ"].as_str() {
            "DAILY" => Freq::Daily,
            "WEEKLY" => Freq::Weekly,
            "MONTHLY" => Freq::Monthly,
            "YEARLY" => Freq::Yearly,
            other => return Err(invalid(format!("unsupported FREQ '{other}'"))),
        };

        let interval: u32 = match tokens.get("INTERVAL") {
            Some(v) => v
                .parse()
                .map_err(|_| invalid(format!("invalid INTERVAL '{v}'")))?,
            None => 1,
        };
        if interval == 0 {
            return Err(invalid("INTERVAL must be positive".to_string()));
        }

        let byday_explicit = tokens.contains_key("BYDAY");
        let byday = match tokens.get("BYDAY") {
            Some(v) => v.clone(),
            None => "MO,TU,WE,TH,FR".to_string(),
        };
        for d in byday.split(',') {
            if !matches!(d, "SU" | "MO" | "TU" | "WE" | "TH" | "FR" | "SA") {
                return Err(invalid(format!("invalid BYDAY value '{d}'")));
            }
        }

        // BYMONTHDAY defaults to 1 for MONTHLY/YEARLY only when the rule is
        // not already weekday-based (BYDAY given explicitly) — the two are
        // mutually exclusive selectors in a single RRULE.
        let bymonthday: Option<i32> = match tokens.get("BYMONTHDAY") {
            Some(v) => Some(
                v.parse()
                    .map_err(|_| invalid(format!("invalid BYMONTHDAY '{v}'")))?,
            ),
            None if matches!(freq, Freq::Monthly | Freq::Yearly) && !byday_explicit => Some(1),
            None => None,
        };

        let bymonth: Option<u32> = match tokens.get("BYMONTH") {
            Some(v) => Some(
                v.parse()
                    .map_err(|_| invalid(format!("invalid BYMONTH '{v}'")))?,
            ),
            None => None,
        };

        let bysetpos: Option<i32> = match tokens.get("BYSETPOS") {
            Some(v) => Some(
                v.parse()
                    .map_err(|_| invalid(format!("invalid BYSETPOS '{v}'")))?,
            ),
            None => None,
        };

        let byhour: u32 = match tokens.get("BYHOUR") {
            Some(v) => v
                .parse()
                .map_err(|_| invalid(format!("invalid BYHOUR '{v}'")))?,
            None => (Utc::now().hour() + 1) % 24,
        };
        if byhour > 23 {
            return Err(invalid(format!("BYHOUR out of range: {byhour}")));
        }

        let byminute: u32 = match tokens.get("BYMINUTE") {
            Some(v) => v
                .parse()
                .map_err(|_| invalid(format!("invalid BYMINUTE '{v}'")))?,
            None => 0,
        };
        if byminute > 59 {
            return Err(invalid(format!("BYMINUTE out of range: {byminute}")));
        }

        let count: Option<u32> = match tokens.get("COUNT") {
            Some(v) => Some(v.parse().map_err(|_| invalid(format!("invalid COUNT '{v}'")))?),
            None => None,
        };

        let dtstart = match tokens.get("DTSTART") {
            Some(v) => {
                let naive = NaiveDateTime::parse_from_str(v, DTSTART_FMT)
                    .map_err(|e| invalid(format!("invalid DTSTART '{v}': {e}")))?;
                DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)
            }
            None => {
                let today = Utc::now().date_naive();
                let naive = today
                    .and_hms_opt(byhour, byminute, 0)
                    .ok_or_else(|| invalid("could not build default DTSTART".to_string()))?;
                DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)
            }
        };

        let until: Option<DateTime<Utc>> = match tokens.get("UNTIL") {
            Some(v) => {
                let naive = NaiveDateTime::parse_from_str(v, DTSTART_FMT)
                    .map_err(|e| invalid(format!("invalid UNTIL '{v}': {e}")))?;
                Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
            }
            None => None,
        };

        let (duration_minutes, single_shot) = match tokens.get("DURATION") {
            Some(v) => parse_duration(v).map_err(|reason| invalid(reason))?,
            None => (0, true),
        };

        let mut body = format!("FREQ={};INTERVAL={}", freq.as_rrule_token(), interval);
        body.push_str(&format!(";BYHOUR={byhour};BYMINUTE={byminute};BYSECOND=0"));
        body.push_str(&format!(";BYDAY={byday}"));
        if let Some(bmd) = bymonthday {
            body.push_str(&format!(";BYMONTHDAY={bmd}"));
        }
        if let Some(bm) = bymonth {
            body.push_str(&format!(";BYMONTH={bm}"));
        }
        if let Some(bsp) = bysetpos {
            body.push_str(&format!(";BYSETPOS={bsp}"));
        }
        if let Some(c) = count {
            body.push_str(&format!(";COUNT={c}"));
        }
        if let Some(u) = until {
            body.push_str(&format!(";UNTIL={}", u.format("%Y%m%dT%H%M%SZ")));
        }

        let canonical = format!(
            "DTSTART:{}\nRRULE:{}",
            dtstart.format("%Y%m%dT%H%M%SZ"),
            body
        );

        // Validate it parses; the parsed RRuleSet itself is rebuilt per call
        // to `expand`/`next_after` since `rrule::RRuleSet` is not `Sync`-cheap
        // to stash behind a shared cache key, and bounding clones the set.
        canonical
            .parse::<RRuleSet>()
            .map_err(|e| invalid(format!("failed to build RRULE from '{rule_str}': {e}")))?;

        // Re-key the token map to the *resolved* values (not just whatever
        // the caller happened to supply) so `serialize()` is deterministic —
        // several defaults (BYHOUR in particular) depend on wall-clock time
        // at parse time and must not be re-derived on a later round-trip.
        let mut resolved = HashMap::new();
        resolved.insert("FREQ".to_string(), freq.as_rrule_token().to_string());
        resolved.insert("INTERVAL".to_string(), interval.to_string());
        resolved.insert("BYDAY".to_string(), byday.clone());
        if let Some(bmd) = bymonthday {
            resolved.insert("BYMONTHDAY".to_string(), bmd.to_string());
        }
        if let Some(bm) = bymonth {
            resolved.insert("BYMONTH".to_string(), bm.to_string());
        }
        if let Some(bsp) = bysetpos {
            resolved.insert("BYSETPOS".to_string(), bsp.to_string());
        }
        resolved.insert("BYHOUR".to_string(), byhour.to_string());
        resolved.insert("BYMINUTE".to_string(), byminute.to_string());
        if let Some(c) = count {
            resolved.insert("COUNT".to_string(), c.to_string());
        }
        if let Some(u) = until {
            resolved.insert("UNTIL".to_string(), u.format(DTSTART_FMT).to_string());
        }
        resolved.insert(
            "DURATION".to_string(),
            format_duration(duration_minutes, single_shot),
        );

        Ok(Self {
            tokens: resolved,
            dtstart,
            duration_minutes,
            single_shot,
            canonical,
        })
    }

    /// Re-serializes this rule to its canonical token string (spec §8
    /// round-trip property: `parse(serialize(parse(s))) == parse(s)`).
    pub fn serialize(&self) -> String {
        let mut parts = vec![format!("FREQ={}", self.tokens["FREQ"])];
        for key in [
            "INTERVAL",
            "BYDAY",
            "BYMONTHDAY",
            "BYMONTH",
            "BYSETPOS",
            "BYHOUR",
            "BYMINUTE",
            "COUNT",
            "UNTIL",
            "DURATION",
        ] {
            if let Some(v) = self.tokens.get(key) {
                parts.push(format!("{key}={v}"));
            }
        }
        parts.push(format!("DTSTART:{}", self.dtstart.format(DTSTART_FMT)));
        parts.join(";")
    }

    fn rrule_set(&self) -> RRuleSet {
        // Already validated in `parse`.
        self.canonical.parse::<RRuleSet>().expect("canonical RRULE re-parses")
    }

    fn make_occurrence(&self, start: DateTime<Utc>) -> Occurrence {
        let width_minutes = self.duration_minutes.max(1);
        Occurrence {
            start,
            end: start + chrono::Duration::minutes(width_minutes),
            single_shot: self.single_shot,
        }
    }

    /// Enumerates every start instant in the half-open interval `[from, to)`
    /// together with its computed end (spec §4.1 expansion contract).
    pub fn expand(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Occurrence> {
        if to <= from {
            return Vec::new();
        }
        let from_rrule = from.with_timezone(&RRuleTz::UTC);
        let to_rrule = to.with_timezone(&RRuleTz::UTC);

        let bounded = self.rrule_set().after(from_rrule).before(to_rrule);
        let (starts, _) = bounded.all(10_000);

        starts
            .into_iter()
            .map(|dt| self.make_occurrence(dt.with_timezone(&Utc)))
            .collect()
    }

    /// Finds the first start instant strictly after `after`, within `horizon`.
    pub fn next_after(
        &self,
        after: DateTime<Utc>,
        horizon: chrono::Duration,
    ) -> Option<DateTime<Utc>> {
        let after_rrule = after.with_timezone(&RRuleTz::UTC);
        let bound_rrule = (after + horizon).with_timezone(&RRuleTz::UTC);
        let bounded = self.rrule_set().after(after_rrule).before(bound_rrule);
        let (starts, _) = bounded.all(1);
        starts.into_iter().next().map(|dt| dt.with_timezone(&Utc))
    }

    pub fn dtstart(&self) -> DateTime<Utc> {
        self.dtstart
    }

    /// The rule's nominal occurrence width, at least one minute (spec §4.1
    /// `DURATION` contract). Callers widening an expansion window to catch
    /// occurrences that start before it but still overlap it use this as
    /// the lookback margin.
    pub fn duration_minutes(&self) -> i64 {
        self.duration_minutes.max(1)
    }
}

/// Parses the non-standard `DURATION` token: `PT[<n>H][<n>M]`, with at
/// least one of H/M present. Returns `(minutes, single_shot)`.
fn parse_duration(raw: &str) -> Result<(i64, bool), String> {
    let body = raw
        .strip_prefix("PT")
        .ok_or_else(|| format!("DURATION '{raw}' must start with PT"))?;

    let mut hours: i64 = 0;
    let mut minutes: i64 = 0;
    let mut saw_component = false;
    let mut digits = String::new();

    for ch in body.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else if ch == 'H' {
            hours = digits
                .parse()
                .map_err(|_| format!("invalid DURATION '{raw}'"))?;
            digits.clear();
            saw_component = true;
        } else if ch == 'M' {
            minutes = digits
                .parse()
                .map_err(|_| format!("invalid DURATION '{raw}'"))?;
            digits.clear();
            saw_component = true;
        } else {
            return Err(format!("invalid DURATION '{raw}'"));
        }
    }

    if !saw_component || !digits.is_empty() {
        return Err(format!("invalid DURATION '{raw}'"));
    }

    let total_minutes = hours * 60 + minutes;
    let single_shot = total_minutes == 0;
    Ok((total_minutes, single_shot))
}

fn format_duration(total_minutes: i64, single_shot: bool) -> String {
    if single_shot {
        return "PT0M".to_string();
    }
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    let mut out = String::from("PT");
    if hours > 0 {
        out.push_str(&format!("{hours}H"));
    }
    if minutes > 0 || hours == 0 {
        out.push_str(&format!("{minutes}M"));
    }
    out
}
