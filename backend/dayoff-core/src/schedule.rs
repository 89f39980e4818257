// src/schedule.rs
//
// Classification of a work-day set into the named patterns offered by the
// simplified editor, and the inverse expansion back into work days.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::period::{Period, WorkDaySet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScheduleLabel {
    /// No dispatch exists yet: nobody has decided anything for this employee.
    NoneSelected,
    NoDaysOff,
    OffEntirePeriod,
    OffFirstHalf,
    OffSecondHalf,
    /// Arbitrary off-day subset, carried with the explicit off dates.
    Irregular,
}

impl ScheduleLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleLabel::NoneSelected => "none-selected",
            ScheduleLabel::NoDaysOff => "no-days-off",
            ScheduleLabel::OffEntirePeriod => "off-entire-period",
            ScheduleLabel::OffFirstHalf => "off-first-half",
            ScheduleLabel::OffSecondHalf => "off-second-half",
            ScheduleLabel::Irregular => "irregular",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub label: ScheduleLabel,
    /// Only populated for [`ScheduleLabel::Irregular`], in period order.
    pub off_days: Vec<NaiveDate>,
}

impl Classification {
    fn named(label: ScheduleLabel) -> Self {
        Self {
            label,
            off_days: Vec::new(),
        }
    }
}

/// Maps a work-day set to its label. Dates outside the period are ignored.
pub fn classify(period: &Period, work_days: &WorkDaySet, has_any_dispatch: bool) -> Classification {
    if !has_any_dispatch {
        return Classification::named(ScheduleLabel::NoneSelected);
    }

    let work_days = period.restrict(work_days.iter());
    let off_days = period.off_days(&work_days);

    if off_days.is_empty() {
        return Classification::named(ScheduleLabel::NoDaysOff);
    }
    if work_days.is_empty() {
        return Classification::named(ScheduleLabel::OffEntirePeriod);
    }
    if off_days.as_slice() == period.first_half() {
        return Classification::named(ScheduleLabel::OffFirstHalf);
    }
    if off_days.as_slice() == period.second_half() {
        return Classification::named(ScheduleLabel::OffSecondHalf);
    }

    Classification {
        label: ScheduleLabel::Irregular,
        off_days,
    }
}

/// Work days described by a label. `off_days` is only read for
/// [`ScheduleLabel::Irregular`]; off dates outside the period are ignored.
///
/// `NoneSelected` expands to the whole period, the same default the listing uses
/// for display.
pub fn expand(period: &Period, label: ScheduleLabel, off_days: &[NaiveDate]) -> WorkDaySet {
    match label {
        ScheduleLabel::NoneSelected | ScheduleLabel::NoDaysOff => period.all_days(),
        ScheduleLabel::OffEntirePeriod => WorkDaySet::new(),
        ScheduleLabel::OffFirstHalf => period.second_half().iter().copied().collect(),
        ScheduleLabel::OffSecondHalf => period.first_half().iter().copied().collect(),
        ScheduleLabel::Irregular => period
            .dates()
            .iter()
            .copied()
            .filter(|d| !off_days.contains(d))
            .collect(),
    }
}

#[cfg(test)]
mod schedule_tests {
    use super::*;
    use crate::period::DATE_FORMAT;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn campaign() -> Period {
        Period::parse("2025-12-22,2025-12-23,2025-12-29,2025-12-30").unwrap()
    }

    fn set(dates: &[&str]) -> WorkDaySet {
        dates.iter().map(|s| d(s)).collect()
    }

    #[test]
    fn without_dispatches_label_is_none_selected() {
        let period = campaign();
        let result = classify(&period, &period.all_days(), false);
        assert_eq!(result.label, ScheduleLabel::NoneSelected);
        assert!(result.off_days.is_empty());
    }

    #[test]
    fn named_patterns_round_trip() {
        let period = campaign();
        for label in [
            ScheduleLabel::NoDaysOff,
            ScheduleLabel::OffEntirePeriod,
            ScheduleLabel::OffFirstHalf,
            ScheduleLabel::OffSecondHalf,
        ] {
            let work_days = expand(&period, label, &[]);
            assert_eq!(
                classify(&period, &work_days, true),
                Classification::named(label),
                "label {}",
                label.as_str()
            );
        }
    }

    #[test]
    fn halves_are_by_index_not_by_date_value() {
        let period = Period::parse("2025-12-30,2025-12-29,2025-12-23,2025-12-22").unwrap();
        let result = classify(&period, &set(&["2025-12-23", "2025-12-22"]), true);
        assert_eq!(result.label, ScheduleLabel::OffFirstHalf);
    }

    #[test]
    fn irregular_carries_exact_off_days_and_expands_back() {
        let period = campaign();
        let work_days = set(&["2025-12-22", "2025-12-29"]);
        let result = classify(&period, &work_days, true);
        assert_eq!(result.label, ScheduleLabel::Irregular);
        assert_eq!(result.off_days, vec![d("2025-12-23"), d("2025-12-30")]);

        // order of the supplied off list does not matter
        let reversed: Vec<NaiveDate> = result.off_days.iter().rev().copied().collect();
        assert_eq!(expand(&period, ScheduleLabel::Irregular, &reversed), work_days);
    }

    #[test]
    fn single_off_day_is_irregular() {
        let period = campaign();
        let result = classify(&period, &set(&["2025-12-22", "2025-12-23", "2025-12-29"]), true);
        assert_eq!(result.label, ScheduleLabel::Irregular);
        assert_eq!(result.off_days, vec![d("2025-12-30")]);
    }

    #[test]
    fn dates_outside_period_are_ignored() {
        let period = campaign();
        let mut work_days = period.all_days();
        work_days.insert(d("2026-01-02"));
        assert_eq!(classify(&period, &work_days, true).label, ScheduleLabel::NoDaysOff);
    }

    #[test]
    fn label_serializes_kebab_case() {
        let json = serde_json::to_string(&ScheduleLabel::OffFirstHalf).unwrap();
        assert_eq!(json, "\"off-first-half\"");
        let back: ScheduleLabel = serde_json::from_str("\"irregular\"").unwrap();
        assert_eq!(back, ScheduleLabel::Irregular);
    }
}
