//! Time helpers (JST based).

use chrono::{DateTime, FixedOffset, Utc};

const JST_OFFSET_SECS: i32 = 9 * 3600;

fn jst() -> Option<FixedOffset> {
    FixedOffset::east_opt(JST_OFFSET_SECS)
}

/// Format a Unix timestamp (seconds) as `HH:MM:SS` in JST.
///
/// Returns `None` when the timestamp is out of chrono's range.
pub fn format_unix_secs_jst(secs: i64) -> Option<String> {
    let offset = jst()?;
    let utc = DateTime::<Utc>::from_timestamp(secs, 0)?;
    Some(utc.with_timezone(&offset).format("%H:%M:%S").to_string())
}

/// Current wall clock in JST as `HH:MM:SS`.
pub fn now_jst_clock() -> String {
    format_unix_secs_jst(Utc::now().timestamp()).unwrap_or_else(|| "--:--:--".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_unix_secs_jst() {
        // テスト項目: Unix 秒が JST の時刻文字列に変換される
        // given (前提条件):
        let epoch = 0;

        // when (操作):
        let formatted = format_unix_secs_jst(epoch);

        // then (期待する結果):
        assert_eq!(formatted.as_deref(), Some("09:00:00"));
    }

    #[test]
    fn test_format_unix_secs_out_of_range() {
        // テスト項目: 範囲外の値は None になる
        // given (前提条件):
        let secs = i64::MAX;

        // when (操作):
        let formatted = format_unix_secs_jst(secs);

        // then (期待する結果):
        assert!(formatted.is_none());
    }

    #[test]
    fn test_now_jst_clock_shape() {
        // テスト項目: 現在時刻が HH:MM:SS 形式で返る
        // when (操作):
        let clock = now_jst_clock();

        // then (期待する結果):
        assert_eq!(clock.len(), 8);
        assert_eq!(clock.as_bytes()[2], b':');
        assert_eq!(clock.as_bytes()[5], b':');
    }
}
