//! Restaurant profile, one per owner.

use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use restodash_core::RestaurantId;

/// A restaurant row. Its ID equals the owner's user ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Restaurant {
    pub id: RestaurantId,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cuisine_type: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub opening_hours: OpeningHours,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub delivery_fee: Decimal,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub minimum_order: Decimal,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub accepts_cards: bool,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub accepts_pix: bool,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub accepts_cash: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Partial restaurant update. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestaurantPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuisine_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<OpeningHours>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_fee: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_order: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepts_cards: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepts_pix: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepts_cash: Option<bool>,
}

/// Opening hours for one weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    #[serde(with = "hh_mm")]
    pub open: NaiveTime,
    #[serde(with = "hh_mm")]
    pub close: NaiveTime,
    pub closed: bool,
}

impl DayHours {
    /// Open between the given hours.
    #[must_use]
    pub const fn open(open: NaiveTime, close: NaiveTime) -> Self {
        Self {
            open,
            close,
            closed: false,
        }
    }

    /// Whether the restaurant is open at `time` on this day.
    ///
    /// A closing time at or before the opening time wraps past midnight.
    #[must_use]
    pub fn is_open_at(&self, time: NaiveTime) -> bool {
        if self.closed {
            return false;
        }
        if self.close > self.open {
            time >= self.open && time < self.close
        } else {
            time >= self.open || time < self.close
        }
    }
}

impl Default for DayHours {
    fn default() -> Self {
        let at = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap_or_default();
        Self::open(at(9), at(22))
    }
}

/// Weekly opening hours keyed by lowercase English weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningHours {
    pub monday: DayHours,
    pub tuesday: DayHours,
    pub wednesday: DayHours,
    pub thursday: DayHours,
    pub friday: DayHours,
    pub saturday: DayHours,
    pub sunday: DayHours,
}

impl Default for OpeningHours {
    /// 09:00 to 22:00 every day, closed on Sunday.
    fn default() -> Self {
        let day = DayHours::default();
        Self {
            monday: day,
            tuesday: day,
            wednesday: day,
            thursday: day,
            friday: day,
            saturday: day,
            sunday: DayHours {
                closed: true,
                ..day
            },
        }
    }
}

impl OpeningHours {
    /// Hours for a given weekday.
    #[must_use]
    pub const fn day(&self, weekday: chrono::Weekday) -> &DayHours {
        use chrono::Weekday;
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    /// Mutable hours for a given weekday.
    pub const fn day_mut(&mut self, weekday: chrono::Weekday) -> &mut DayHours {
        use chrono::Weekday;
        match weekday {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        }
    }
}

/// `HH:MM` time-of-day encoding used in the opening hours column.
mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}
