use chrono::{Datelike, Local, NaiveDate, TimeZone};

use crate::models::Timestamp;

/// Display language for date labels. `Settings.language == "auto"` resolves
/// through the system locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    En,
    Zh,
}

pub fn resolve_language(setting: &str) -> Language {
    match setting {
        "en" => Language::En,
        "zh" => Language::Zh,
        _ => {
            let locale = sys_locale::get_locale().unwrap_or_default();
            if locale.to_lowercase().starts_with("zh") {
                Language::Zh
            } else {
                Language::En
            }
        }
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Calendar day of an epoch timestamp in the local timezone.
pub fn day_of(ts: Timestamp) -> Option<NaiveDate> {
    day_in(ts, &Local)
}

fn day_in<Tz: TimeZone>(ts: Timestamp, tz: &Tz) -> Option<NaiveDate> {
    tz.timestamp_opt(ts, 0).single().map(|dt| dt.date_naive())
}

pub fn is_today(date: NaiveDate, today: NaiveDate) -> bool {
    date == today
}

pub fn is_yesterday(date: NaiveDate, today: NaiveDate) -> bool {
    today.pred_opt() == Some(date)
}

pub fn is_past(date: NaiveDate, today: NaiveDate) -> bool {
    date < today
}

/// Stable wire form of a date group key (`YYYY-MM-DD`).
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}

pub fn today_label(language: Language) -> &'static str {
    match language {
        Language::En => "Today",
        Language::Zh => "今天",
    }
}

pub fn no_date_label(language: Language) -> &'static str {
    match language {
        Language::En => "No Date",
        Language::Zh => "无日期",
    }
}

/// Long-form date, e.g. "June 1, 2024" / "2024年6月1日".
pub fn long_date(date: NaiveDate, language: Language) -> String {
    match language {
        Language::En => date.format("%B %-d, %Y").to_string(),
        Language::Zh => format!("{}年{}月{}日", date.year(), date.month(), date.day()),
    }
}

/// Label shown as a date-group header and in report titles.
pub fn day_label(date: Option<NaiveDate>, today: NaiveDate, language: Language) -> String {
    let Some(date) = date else {
        return no_date_label(language).to_string();
    };
    if is_today(date, today) {
        return today_label(language).to_string();
    }
    if is_yesterday(date, today) {
        return match language {
            Language::En => "Yesterday".to_string(),
            Language::Zh => "昨天".to_string(),
        };
    }
    long_date(date, language)
}

/// Collapses runs of whitespace and commas into a single hyphen, for use in
/// exported file names.
pub fn sanitize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_hyphen = false;
    for ch in label.chars() {
        if ch.is_whitespace() || ch == ',' {
            pending_hyphen = !out.is_empty();
        } else {
            if pending_hyphen {
                out.push('-');
                pending_hyphen = false;
            }
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_derivation_respects_timezone() {
        // 2024-06-01 23:30 UTC is already 2024-06-02 in Tokyo.
        let ts = chrono::Utc
            .with_ymd_and_hms(2024, 6, 1, 23, 30, 0)
            .unwrap()
            .timestamp();
        assert_eq!(
            day_in(ts, &chrono_tz::Asia::Tokyo),
            Some(date(2024, 6, 2))
        );
        assert_eq!(day_in(ts, &chrono::Utc), Some(date(2024, 6, 1)));
    }

    #[test]
    fn calendar_day_predicates() {
        let today = date(2024, 6, 2);
        assert!(is_today(date(2024, 6, 2), today));
        assert!(is_yesterday(date(2024, 6, 1), today));
        assert!(!is_yesterday(date(2024, 5, 31), today));
        assert!(is_past(date(2024, 5, 31), today));
        assert!(!is_past(date(2024, 6, 2), today));
    }

    #[test]
    fn day_key_round_trips() {
        let d = date(2024, 6, 1);
        assert_eq!(day_key(d), "2024-06-01");
        assert_eq!(parse_day_key("2024-06-01"), Some(d));
        assert_eq!(parse_day_key("not-a-date"), None);
    }

    #[test]
    fn labels_for_today_yesterday_and_older_days() {
        let today = date(2024, 6, 2);
        assert_eq!(day_label(Some(today), today, Language::En), "Today");
        assert_eq!(
            day_label(Some(date(2024, 6, 1)), today, Language::En),
            "Yesterday"
        );
        assert_eq!(
            day_label(Some(date(2024, 5, 20)), today, Language::En),
            "May 20, 2024"
        );
        assert_eq!(day_label(None, today, Language::En), "No Date");

        assert_eq!(day_label(Some(today), today, Language::Zh), "今天");
        assert_eq!(
            day_label(Some(date(2024, 5, 20)), today, Language::Zh),
            "2024年5月20日"
        );
        assert_eq!(day_label(None, today, Language::Zh), "无日期");
    }

    #[test]
    fn explicit_language_settings_bypass_locale_detection() {
        assert_eq!(resolve_language("en"), Language::En);
        assert_eq!(resolve_language("zh"), Language::Zh);
    }

    #[test]
    fn sanitize_collapses_whitespace_and_commas() {
        assert_eq!(sanitize_label("June 1, 2024"), "June-1-2024");
        assert_eq!(sanitize_label("  No   Date "), "No-Date");
        assert_eq!(sanitize_label("today"), "today");
        assert_eq!(sanitize_label(""), "");
    }
}
