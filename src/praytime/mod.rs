//! Astronomical prayer-time computation (Muslim World League parameters).
//!
//! A pure function of (coordinates, UTC date) to six UTC instants, using the
//! standard solar-position equations: declination and equation of time from
//! the Julian day, then hour-angle inversion for each twilight/elevation
//! angle, with two refinement iterations. Cheap enough to recompute on every
//! scheduler tick, which sidesteps per-user midnight-rollover bookkeeping.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::BotError;
use crate::types::Prayer;

const FAJR_ANGLE: f64 = 18.0;
const ISHA_ANGLE: f64 = 17.0;
/// Horizon dip for sunrise/sunset, including refraction.
const HORIZON_ANGLE: f64 = 0.833;
/// Shafi convention: asr when the shadow equals the object's length.
const ASR_SHADOW_FACTOR: f64 = 1.0;

/// The six instants for one user and one calendar date, all UTC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrayerTimesSet {
    pub fajr: DateTime<Utc>,
    pub sunrise: DateTime<Utc>,
    pub dhuhr: DateTime<Utc>,
    pub asr: DateTime<Utc>,
    pub maghrib: DateTime<Utc>,
    pub isha: DateTime<Utc>,
}

impl PrayerTimesSet {
    pub fn get(&self, prayer: Prayer) -> DateTime<Utc> {
        match prayer {
            Prayer::Fajr => self.fajr,
            Prayer::Sunrise => self.sunrise,
            Prayer::Dhuhr => self.dhuhr,
            Prayer::Asr => self.asr,
            Prayer::Maghrib => self.maghrib,
            Prayer::Isha => self.isha,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Prayer, DateTime<Utc>)> + '_ {
        Prayer::ALL.iter().map(move |&p| (p, self.get(p)))
    }
}

/// Compute the six prayer instants for `date` at the given coordinates.
///
/// Fails with `SunNeverReaches` at extreme latitudes/dates where a required
/// solar angle is never attained; callers are expected to isolate that per
/// user rather than abort a whole sweep.
pub fn compute(latitude: f64, longitude: f64, date: NaiveDate) -> Result<PrayerTimesSet, BotError> {
    // Longitude-adjusted Julian date so the solar position is evaluated
    // close to the local solar time the result describes.
    let jdate = julian_day(date) - longitude / (15.0 * 24.0);

    // Rough local-solar-hour guesses, refined twice.
    let mut fajr = 5.0;
    let mut sunrise = 6.0;
    let mut dhuhr = 12.0;
    let mut asr = 13.0;
    let mut maghrib = 18.0;
    let mut isha = 18.0;

    for _ in 0..2 {
        fajr = sun_angle_time(jdate, latitude, FAJR_ANGLE, fajr, true)
            .ok_or(BotError::SunNeverReaches { prayer: "fajr" })?;
        sunrise = sun_angle_time(jdate, latitude, HORIZON_ANGLE, sunrise, true)
            .ok_or(BotError::SunNeverReaches { prayer: "sunrise" })?;
        dhuhr = mid_day(jdate, dhuhr);
        asr = asr_time(jdate, latitude, ASR_SHADOW_FACTOR, asr)
            .ok_or(BotError::SunNeverReaches { prayer: "asr" })?;
        maghrib = sun_angle_time(jdate, latitude, HORIZON_ANGLE, maghrib, false)
            .ok_or(BotError::SunNeverReaches { prayer: "maghrib" })?;
        isha = sun_angle_time(jdate, latitude, ISHA_ANGLE, isha, false)
            .ok_or(BotError::SunNeverReaches { prayer: "isha" })?;
    }

    // Local solar hours to UTC.
    let to_utc = |hours: f64| instant(date, hours - longitude / 15.0);

    Ok(PrayerTimesSet {
        fajr: to_utc(fajr),
        sunrise: to_utc(sunrise),
        dhuhr: to_utc(dhuhr),
        asr: to_utc(asr),
        maghrib: to_utc(maghrib),
        isha: to_utc(isha),
    })
}

fn instant(date: NaiveDate, utc_hours: f64) -> DateTime<Utc> {
    let midnight = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    midnight + Duration::seconds((utc_hours * 3600.0).round() as i64)
}

fn julian_day(date: NaiveDate) -> f64 {
    use chrono::Datelike;
    let (mut y, mut m) = (date.year() as f64, date.month() as f64);
    let d = date.day() as f64;
    if m <= 2.0 {
        y -= 1.0;
        m += 12.0;
    }
    let a = (y / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();
    (365.25 * (y + 4716.0)).floor() + (30.6001 * (m + 1.0)).floor() + d + b - 1524.5
}

/// Solar declination (degrees) and equation of time (hours) at a Julian day.
fn sun_position(jd: f64) -> (f64, f64) {
    let d = jd - 2451545.0;
    let g = fix_angle(357.529 + 0.98560028 * d);
    let q = fix_angle(280.459 + 0.98564736 * d);
    let l = fix_angle(q + 1.915 * dsin(g) + 0.020 * dsin(2.0 * g));
    let e = 23.439 - 0.00000036 * d;

    let ra = fix_hour(datan2(dcos(e) * dsin(l), dcos(l)) / 15.0);
    let declination = darcsin(dsin(e) * dsin(l));
    let equation_of_time = q / 15.0 - ra;
    (declination, equation_of_time)
}

/// Local solar hour of solar noon, evaluated at guess hour `t`.
fn mid_day(jdate: f64, t: f64) -> f64 {
    let (_, eqt) = sun_position(jdate + t / 24.0);
    fix_hour(12.0 - eqt)
}

/// Local solar hour at which the sun is `angle` degrees below the horizon,
/// before noon when `ccw` is set. None if the angle is never reached.
fn sun_angle_time(jdate: f64, latitude: f64, angle: f64, t: f64, ccw: bool) -> Option<f64> {
    let (decl, _) = sun_position(jdate + t / 24.0);
    let noon = mid_day(jdate, t);
    let cos_ha =
        (-dsin(angle) - dsin(decl) * dsin(latitude)) / (dcos(decl) * dcos(latitude));
    if !(-1.0..=1.0).contains(&cos_ha) {
        return None;
    }
    let half_arc = darccos(cos_ha) / 15.0;
    Some(if ccw { noon - half_arc } else { noon + half_arc })
}

fn asr_time(jdate: f64, latitude: f64, shadow_factor: f64, t: f64) -> Option<f64> {
    let (decl, _) = sun_position(jdate + t / 24.0);
    let angle = -darccot(shadow_factor + dtan((latitude - decl).abs()));
    sun_angle_time(jdate, latitude, angle, t, false)
}

fn fix_angle(a: f64) -> f64 {
    let a = a % 360.0;
    if a < 0.0 { a + 360.0 } else { a }
}

fn fix_hour(h: f64) -> f64 {
    let h = h % 24.0;
    if h < 0.0 { h + 24.0 } else { h }
}

fn dsin(d: f64) -> f64 {
    d.to_radians().sin()
}

fn dcos(d: f64) -> f64 {
    d.to_radians().cos()
}

fn dtan(d: f64) -> f64 {
    d.to_radians().tan()
}

fn darcsin(x: f64) -> f64 {
    x.asin().to_degrees()
}

fn darccos(x: f64) -> f64 {
    x.acos().to_degrees()
}

fn darccot(x: f64) -> f64 {
    (1.0 / x).atan().to_degrees()
}

fn datan2(y: f64, x: f64) -> f64 {
    y.atan2(x).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn minutes_of_day(t: DateTime<Utc>) -> i64 {
        (t.hour() * 60 + t.minute()) as i64
    }

    #[test]
    fn times_are_ordered() {
        let date = NaiveDate::from_ymd_opt(2024, 8, 24).unwrap();
        let times = compute(30.0444, 31.2357, date).unwrap();
        assert!(times.fajr < times.sunrise);
        assert!(times.sunrise < times.dhuhr);
        assert!(times.dhuhr < times.asr);
        assert!(times.asr < times.maghrib);
        assert!(times.maghrib < times.isha);
    }

    #[test]
    fn equator_equinox_matches_known_values() {
        // lat 0, lon 0, March equinox: solar noon ~12:07 UTC, sunrise and
        // sunset a hair over six hours either side. Wide tolerances; the
        // point is catching sign/unit mistakes, not arc-second accuracy.
        let date = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let times = compute(0.0, 0.0, date).unwrap();

        let noon = minutes_of_day(times.dhuhr);
        assert!((noon - (12 * 60 + 7)).abs() <= 10, "noon was {} minutes", noon);

        let sunrise = minutes_of_day(times.sunrise);
        assert!((sunrise - (6 * 60 + 4)).abs() <= 15, "sunrise was {} minutes", sunrise);

        let maghrib = minutes_of_day(times.maghrib);
        assert!((maghrib - (18 * 60 + 11)).abs() <= 15, "maghrib was {} minutes", maghrib);

        // Fajr at 18 degrees is roughly 72 minutes before sunrise here.
        let fajr = minutes_of_day(times.fajr);
        assert!(sunrise - fajr > 60 && sunrise - fajr < 90, "fajr gap was {}", sunrise - fajr);
    }

    #[test]
    fn longitude_shifts_times_in_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let west = compute(0.0, -30.0, date).unwrap();
        let east = compute(0.0, 30.0, date).unwrap();
        // 60 degrees of longitude is four hours of UTC offset.
        let delta = west.dhuhr - east.dhuhr;
        assert!((delta.num_minutes() - 240).abs() <= 10, "delta {}", delta.num_minutes());
    }

    #[test]
    fn polar_summer_has_no_isha() {
        // Tromso in late June: the sun never gets 17 degrees below horizon.
        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let result = compute(69.6492, 18.9553, date);
        assert!(result.is_err());
    }
}
