//! Conversion between the receiver's dB scale and a 0-100 percentage.

/// Quietest volume the receiver accepts.
pub const MIN_VOLUME_DB: i32 = -90;

/// Loudest volume the receiver accepts.
pub const MAX_VOLUME_DB: i32 = 0;

const DB_RANGE: f64 = (MAX_VOLUME_DB - MIN_VOLUME_DB) as f64;

/// Clamps a dB value into the receiver's range.
pub fn clamp_db(db: i32) -> i32 {
    db.clamp(MIN_VOLUME_DB, MAX_VOLUME_DB)
}

/// Converts a percentage into dB, rounding to the nearest step.
///
/// Percentages at or below 0 give -90, at or above 100 give 0.
pub fn percentage_to_db(pct: f64) -> i32 {
    if pct.is_nan() {
        return MIN_VOLUME_DB;
    }
    let db = (pct * DB_RANGE / 100.0).round() + f64::from(MIN_VOLUME_DB);
    clamp_db(db.clamp(f64::from(MIN_VOLUME_DB), f64::from(MAX_VOLUME_DB)) as i32)
}

/// Converts dB into a percentage in `[0, 100]`.
pub fn db_to_percentage(db: i32) -> f64 {
    let pct = f64::from(db - MIN_VOLUME_DB) / DB_RANGE * 100.0;
    pct.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_bounds() {
        assert_eq!(percentage_to_db(0.0), -90);
        assert_eq!(percentage_to_db(-25.0), -90);
        assert_eq!(percentage_to_db(100.0), 0);
        assert_eq!(percentage_to_db(250.0), 0);
        assert_eq!(percentage_to_db(f64::NAN), -90);
    }

    #[test]
    fn percentage_rounds() {
        assert_eq!(percentage_to_db(50.0), -45);
        // 33 * 0.9 = 29.7 -> 30
        assert_eq!(percentage_to_db(33.0), -60);
        // 1 * 0.9 = 0.9 -> 1
        assert_eq!(percentage_to_db(1.0), -89);
    }

    #[test]
    fn never_outside_range() {
        let mut pct = -50.0;
        while pct <= 150.0 {
            let db = percentage_to_db(pct);
            assert!((MIN_VOLUME_DB..=MAX_VOLUME_DB).contains(&db), "{pct} -> {db}");
            pct += 0.5;
        }
    }

    #[test]
    fn db_to_percentage_bounds() {
        assert_eq!(db_to_percentage(-90), 0.0);
        assert_eq!(db_to_percentage(0), 100.0);
        assert_eq!(db_to_percentage(-45), 50.0);
        assert_eq!(db_to_percentage(-120), 0.0);
        assert_eq!(db_to_percentage(10), 100.0);
    }
}
