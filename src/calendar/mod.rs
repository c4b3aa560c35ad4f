//! External Shabbat calendar, consulted when no upcoming times are stored.

mod hebcal;

pub use hebcal::{HebcalClient, DEFAULT_HEBCAL_BASE_URL};

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::board_store::{ShabbatTimes, TimeOfDay};
use crate::selection::{
    select_current_shabbat, CurrentShabbatTimes, DefaultShabbatTimes, Moment, ShabbatSource,
};

/// One Shabbat as published by a calendar service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarShabbat {
    pub candle_lighting: TimeOfDay,
    pub shabbat_ends: TimeOfDay,
    pub parsha: String,
    /// The Saturday.
    pub date: NaiveDate,
}

impl From<CalendarShabbat> for CurrentShabbatTimes {
    fn from(value: CalendarShabbat) -> Self {
        CurrentShabbatTimes {
            source: ShabbatSource::Hebcal,
            id: None,
            candle_lighting: value.candle_lighting,
            shabbat_ends: value.shabbat_ends,
            parsha: value.parsha,
            date: Some(value.date),
        }
    }
}

#[async_trait]
pub trait ShabbatCalendar: Send + Sync {
    /// The first Shabbat ending on or after `today`.
    async fn upcoming_shabbat(&self, today: NaiveDate) -> Result<CalendarShabbat>;
}

/// Stored record first, then the calendar, then the configured default.
pub async fn resolve_current_shabbat(
    moment: &Moment,
    records: &[ShabbatTimes],
    default: &DefaultShabbatTimes,
    calendar: Option<&dyn ShabbatCalendar>,
) -> CurrentShabbatTimes {
    let selected = select_current_shabbat(moment, records, default);
    let calendar = match calendar {
        Some(calendar) if selected.source == ShabbatSource::Default => calendar,
        _ => return selected,
    };

    match calendar.upcoming_shabbat(moment.today).await {
        Ok(found) if found.date >= moment.today => {
            debug!("Using calendar Shabbat times for {}", found.date);
            found.into()
        }
        Ok(found) => {
            warn!(
                "Calendar returned a past Shabbat ({}), using default times",
                found.date
            );
            selected
        }
        Err(err) => {
            warn!("Shabbat calendar lookup failed, using default times: {:#}", err);
            selected
        }
    }
}
