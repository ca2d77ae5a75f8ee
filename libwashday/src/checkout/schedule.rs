//! Pickup and delivery scheduling
//!
//! Dates are chosen with a two-click range gesture: the first click picks
//! the pickup date, a later second click picks the delivery date. Time
//! slots come from a fixed list of two-hour windows.

use chrono::{Days, NaiveDate};

use crate::error::CheckoutError;

/// Bookable two-hour windows
pub const TIME_SLOTS: [&str; 5] = [
    "09:00 - 11:00",
    "11:00 - 13:00",
    "13:00 - 15:00",
    "15:00 - 17:00",
    "17:00 - 19:00",
];

pub const DEFAULT_PICKUP_SLOT: &str = "13:00 - 15:00";
pub const DEFAULT_DELIVERY_SLOT: &str = "15:00 - 17:00";

/// Length of the quick-pick date strip
pub const AVAILABLE_DAYS: u64 = 7;

/// How far ahead the calendar reaches
pub const MAX_DAYS_AHEAD: u64 = 30;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(input: &str) -> Result<NaiveDate, CheckoutError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .map_err(|_| CheckoutError::InvalidDate(input.to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Match `slot` against [`TIME_SLOTS`], tolerating missing spaces around the dash
pub fn validate_slot(slot: &str) -> Result<&'static str, CheckoutError> {
    let compact: String = slot.chars().filter(|c| !c.is_whitespace()).collect();
    TIME_SLOTS
        .iter()
        .find(|s| s.replace(' ', "") == compact)
        .copied()
        .ok_or_else(|| CheckoutError::UnknownTimeSlot(slot.to_string()))
}

/// The seven dates starting today
pub fn available_dates(today: NaiveDate) -> Vec<NaiveDate> {
    (0..AVAILABLE_DAYS)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .collect()
}

/// Pickup/delivery range built by successive clicks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Apply one click
    ///
    /// With no start, or a closed range, the click restarts the range. With
    /// only a start, a later date closes it and any other date restarts it.
    pub fn select(self, date: NaiveDate) -> Self {
        match (self.start, self.end) {
            (Some(start), None) if date > start => Self {
                start: Some(start),
                end: Some(date),
            },
            _ => Self {
                start: Some(date),
                end: None,
            },
        }
    }

    pub fn is_closed(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }
}

/// Date and slot choices of the time slot step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSelection {
    today: NaiveDate,
    range: DateRange,
    pickup_slot: Option<&'static str>,
    delivery_slot: Option<&'static str>,
}

impl ScheduleSelection {
    /// Defaults: pickup tomorrow, delivery the day after, popular slots
    pub fn new(today: NaiveDate) -> Self {
        let dates = available_dates(today);
        let pickup = dates.get(1).or_else(|| dates.first()).copied();
        let delivery = dates.get(2).or_else(|| dates.get(1)).copied();

        Self {
            today,
            range: DateRange::new(pickup, delivery),
            pickup_slot: Some(DEFAULT_PICKUP_SLOT),
            delivery_slot: Some(DEFAULT_DELIVERY_SLOT),
        }
    }

    /// Start with nothing chosen
    pub fn empty(today: NaiveDate) -> Self {
        Self {
            today,
            range: DateRange::default(),
            pickup_slot: None,
            delivery_slot: None,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    /// Click a calendar day; only tomorrow up to thirty days ahead is bookable
    pub fn select_date(&mut self, date: NaiveDate) -> Result<DateRange, CheckoutError> {
        let first = self.today.checked_add_days(Days::new(1));
        let last = self.today.checked_add_days(Days::new(MAX_DAYS_AHEAD));
        let bookable = first.is_some_and(|f| date >= f) && last.is_some_and(|l| date <= l);
        if !bookable {
            return Err(CheckoutError::InvalidDate(format_date(date)));
        }

        self.range = self.range.select(date);
        Ok(self.range)
    }

    /// Set both dates at once, as two clicks would
    pub fn select_dates(&mut self, pickup: NaiveDate, delivery: NaiveDate) -> Result<(), CheckoutError> {
        self.range = DateRange::default();
        self.select_date(pickup)?;
        let range = self.select_date(delivery)?;
        if range.end != Some(delivery) {
            return Err(CheckoutError::InvalidDate(format!(
                "delivery {} must be after pickup {}",
                format_date(delivery),
                format_date(pickup)
            )));
        }
        Ok(())
    }

    pub fn set_pickup_slot(&mut self, slot: &str) -> Result<(), CheckoutError> {
        self.pickup_slot = Some(validate_slot(slot)?);
        Ok(())
    }

    pub fn set_delivery_slot(&mut self, slot: &str) -> Result<(), CheckoutError> {
        self.delivery_slot = Some(validate_slot(slot)?);
        Ok(())
    }

    pub fn pickup_date(&self) -> Option<NaiveDate> {
        self.range.start
    }

    /// Only set once the range is closed, so always after pickup
    pub fn delivery_date(&self) -> Option<NaiveDate> {
        self.range.end
    }

    pub fn pickup_slot(&self) -> Option<&'static str> {
        self.pickup_slot
    }

    pub fn delivery_slot(&self) -> Option<&'static str> {
        self.delivery_slot
    }

    /// All four of pickup date/slot and delivery date/slot are set
    pub fn is_complete(&self) -> bool {
        self.range.is_closed() && self.pickup_slot.is_some() && self.delivery_slot.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_range_first_click_sets_start() {
        let range = DateRange::default().select(date("2024-06-05"));
        assert_eq!(range.start, Some(date("2024-06-05")));
        assert_eq!(range.end, None);
    }

    #[test]
    fn test_range_later_click_closes() {
        let range = DateRange::default()
            .select(date("2024-06-05"))
            .select(date("2024-06-07"));
        assert_eq!(range.start, Some(date("2024-06-05")));
        assert_eq!(range.end, Some(date("2024-06-07")));
    }

    #[test]
    fn test_range_earlier_click_restarts() {
        let range = DateRange::default()
            .select(date("2024-06-05"))
            .select(date("2024-06-03"));
        assert_eq!(range.start, Some(date("2024-06-03")));
        assert_eq!(range.end, None);
    }

    #[test]
    fn test_range_same_day_click_restarts() {
        let range = DateRange::default()
            .select(date("2024-06-05"))
            .select(date("2024-06-05"));
        assert_eq!(range.start, Some(date("2024-06-05")));
        assert_eq!(range.end, None);
    }

    #[test]
    fn test_range_click_on_closed_range_restarts() {
        let range = DateRange::new(Some(date("2024-06-05")), Some(date("2024-06-07")))
            .select(date("2024-06-09"));
        assert_eq!(range.start, Some(date("2024-06-09")));
        assert_eq!(range.end, None);
    }

    #[test]
    fn test_available_dates_start_today() {
        let dates = available_dates(date("2024-12-28"));
        assert_eq!(dates.len(), 7);
        assert_eq!(dates[0], date("2024-12-28"));
        assert_eq!(dates[6], date("2025-01-03"));
    }

    #[test]
    fn test_schedule_defaults() {
        let schedule = ScheduleSelection::new(date("2024-06-01"));
        assert_eq!(schedule.pickup_date(), Some(date("2024-06-02")));
        assert_eq!(schedule.delivery_date(), Some(date("2024-06-03")));
        assert_eq!(schedule.pickup_slot(), Some("13:00 - 15:00"));
        assert_eq!(schedule.delivery_slot(), Some("15:00 - 17:00"));
        assert!(schedule.is_complete());
    }

    #[test]
    fn test_open_range_is_incomplete() {
        let mut schedule = ScheduleSelection::new(date("2024-06-01"));
        schedule.select_date(date("2024-06-04")).unwrap();
        assert_eq!(schedule.delivery_date(), None);
        assert!(!schedule.is_complete());

        schedule.select_date(date("2024-06-06")).unwrap();
        assert!(schedule.is_complete());
    }

    #[test]
    fn test_select_date_bounds() {
        let mut schedule = ScheduleSelection::empty(date("2024-06-01"));
        assert!(matches!(
            schedule.select_date(date("2024-06-01")),
            Err(CheckoutError::InvalidDate(_))
        ));
        assert!(schedule.select_date(date("2024-07-01")).is_ok());
        assert!(schedule.select_date(date("2024-07-02")).is_err());
    }

    #[test]
    fn test_select_dates_requires_order() {
        let mut schedule = ScheduleSelection::empty(date("2024-06-01"));
        assert!(schedule
            .select_dates(date("2024-06-05"), date("2024-06-03"))
            .is_err());
        assert!(schedule
            .select_dates(date("2024-06-03"), date("2024-06-05"))
            .is_ok());
        assert!(schedule.range().is_closed());
    }

    #[test]
    fn test_validate_slot() {
        assert_eq!(validate_slot("09:00 - 11:00").unwrap(), "09:00 - 11:00");
        assert_eq!(validate_slot("17:00-19:00").unwrap(), "17:00 - 19:00");
        assert_eq!(
            validate_slot("19:00 - 21:00"),
            Err(CheckoutError::UnknownTimeSlot("19:00 - 21:00".to_string()))
        );
    }

    #[test]
    fn test_empty_schedule_needs_slots() {
        let mut schedule = ScheduleSelection::empty(date("2024-06-01"));
        schedule
            .select_dates(date("2024-06-02"), date("2024-06-03"))
            .unwrap();
        assert!(!schedule.is_complete());

        schedule.set_pickup_slot("09:00 - 11:00").unwrap();
        schedule.set_delivery_slot("11:00 - 13:00").unwrap();
        assert!(schedule.is_complete());
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(matches!(parse_date("06/01/2024"), Err(CheckoutError::InvalidDate(_))));
    }
}
