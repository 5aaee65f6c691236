//! Pure transforms from backend results to chart-ready rows.
//!
//! Nothing in here mutates its input: unit conversions and gap filling only
//! exist in the produced rows.

pub mod daily;
pub mod dates;
pub mod format;
pub mod hourly;

pub use daily::{
    COVERAGE_WARNING_THRESHOLD, DailyDataset, DailyRow, DailyStats, DailyVariable,
    build_daily_dataset, build_rows, daily_stats, focus_index, is_incomplete, relative_position,
};
pub use dates::{build_dates, parse_range_date, range_start};
pub use format::{
    format_hour, format_nasa_date, format_percent, format_probability, mps_to_kmh,
    range_to_dates, round_value,
};
pub use hourly::{
    BEST_HOURS_SHOWN, BestHourMark, HourlyDataset, HourlyRow, HourlyUnits, WindUnit,
    build_hourly_dataset, build_hourly_rows, hourly_units, top_best_hours,
};
