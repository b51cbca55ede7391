//! User records, read from the university followers CSV or generated at random.
//!
//! The CSV has one row per (university, follower) pair with the columns
//! `university,id,username,tweets,friends,followers,created_at`. A user following several
//! universities appears on several rows, and [`read_users`] merges them into one [`User`].

use std::{
    collections::{HashMap, HashSet},
    fmt,
    io::BufRead,
};

use rand::Rng;

use crate::error::RecordError;

/// Most universities kept per user
pub const MAX_UNIVERSITIES: usize = 11;

/// University handles used for synthetic users
const UNIVERSITIES: [&str; MAX_UNIVERSITIES] = [
    "MIT",
    "Harvard",
    "Stanford",
    "UCBerkeley",
    "Cambridge_Uni",
    "UniofOxford",
    "Princeton",
    "Yale",
    "Columbia",
    "UChicago",
    "Caltech",
];

/// Month abbreviations in calendar order
const MONTHS: [&str; 12] =
    ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];

/// A follower of one or more universities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Account id
    pub id: u64,
    /// Account handle
    pub username: String,
    /// Tweets count
    pub tweets: u32,
    /// Friends count
    pub friends: u32,
    /// Followers count
    pub followers: u32,
    /// Account creation time in unix seconds
    pub created_at: i64,
    /// Handles of the universities this user follows, without duplicates
    pub universities: Vec<String>,
}

impl User {
    /// Creates a user that follows no university yet
    #[must_use]
    pub fn new(
        id: u64,
        username: impl Into<String>,
        tweets: u32,
        friends: u32,
        followers: u32,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            tweets,
            friends,
            followers,
            created_at,
            universities: Vec::new(),
        }
    }

    /// Replaces the counters with the ones from a newer row
    pub fn update_stats(&mut self, tweets: u32, friends: u32, followers: u32) {
        self.tweets = tweets;
        self.friends = friends;
        self.followers = followers;
    }

    /// Records that the user follows `university`.
    ///
    /// Returns false when it was already recorded or the user already follows
    /// [`MAX_UNIVERSITIES`].
    pub fn add_university(&mut self, university: &str) -> bool {
        if self.universities.len() >= MAX_UNIVERSITIES
            || self.universities.iter().any(|u| u == university)
        {
            return false;
        }
        self.universities.push(university.to_owned());
        true
    }
}

/// Tab separated id, username, counts, UTC creation time (`2011-03-29T08:11:25Z`) and the
/// followed universities joined by `", "`
impl fmt::Display for User {
    #[allow(clippy::arithmetic_side_effects)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (year, month, day) = civil_from_days(self.created_at.div_euclid(86_400));
        let seconds = self.created_at.rem_euclid(86_400);
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}Z\t{}",
            self.id,
            self.username,
            self.tweets,
            self.friends,
            self.followers,
            seconds / 3_600,
            seconds % 3_600 / 60,
            seconds % 60,
            self.universities.join(", ")
        )
    }
}

/// One parsed CSV row
struct Row<'a> {
    /// University handle
    university: &'a str,
    /// Account id
    id: u64,
    /// Account handle
    username: &'a str,
    /// Tweets count
    tweets: u32,
    /// Friends count
    friends: u32,
    /// Followers count
    followers: u32,
    /// Creation time in unix seconds
    created_at: i64,
}

impl<'a> Row<'a> {
    /// Splits and parses a data line
    fn parse(text: &'a str, line: usize) -> Result<Self, RecordError> {
        let mut fields = text.split(',');
        let mut next = |field: &'static str| {
            fields.next().map(str::trim).ok_or(RecordError::MissingField { line, field })
        };

        let university = next("university")?;
        let id = parse_id(next("id")?, line)?;
        let username = next("username")?;
        let tweets = parse_count(next("tweets")?, "tweets", line)?;
        let friends = parse_count(next("friends")?, "friends", line)?;
        let followers = parse_count(next("followers")?, "followers", line)?;
        let created_at = parse_timestamp(next("created_at")?, line)?;

        Ok(Self { university, id, username, tweets, friends, followers, created_at })
    }
}

/// Reads every user from CSV input, merging the rows that share an id.
///
/// The first line is a header and is skipped, as are blank lines. Later rows carry newer
/// counters, so a repeated id takes the latest counters and adds its university to the
/// list. Users come back in the order their id first appeared.
///
/// # Errors
///
/// Returns a [`RecordError`] for a failed read or a malformed row.
pub fn read_users(reader: impl BufRead) -> Result<Vec<User>, RecordError> {
    let mut users: Vec<User> = Vec::new();
    let mut position: HashMap<u64, usize> = HashMap::new();

    for (index, text) in reader.lines().enumerate().skip(1) {
        let text = text?;
        if text.trim().is_empty() {
            continue;
        }
        let row = Row::parse(&text, index.saturating_add(1))?;

        if let Some(user) = position.get(&row.id).and_then(|&at| users.get_mut(at)) {
            user.update_stats(row.tweets, row.friends, row.followers);
            user.add_university(row.university);
            continue;
        }

        let mut user =
            User::new(row.id, row.username, row.tweets, row.friends, row.followers, row.created_at);
        user.add_university(row.university);
        position.insert(row.id, users.len());
        users.push(user);
    }

    Ok(users)
}

/// Generates `n` users with distinct ids and distinct usernames.
///
/// Half of the ids are short and half are long, as in the real data, so both branches of
/// [`folding_hash`](crate::hashers::folding_hash) see use.
pub fn synthetic_users(n: usize, rng: &mut impl Rng) -> Vec<User> {
    let mut ids = HashSet::with_capacity(n);
    let mut names = HashSet::with_capacity(n);
    let mut users = Vec::with_capacity(n);

    while users.len() < n {
        let id = if rng.random_bool(0.5) {
            rng.random_range(1_000..1_000_000_000)
        } else {
            rng.random_range(1_000_000_000_000_000..u64::MAX / 2)
        };
        if !ids.insert(id) {
            continue;
        }

        let mut username = random_handle(rng);
        while !names.insert(username.clone()) {
            username = random_handle(rng);
        }

        let mut user = User::new(
            id,
            username,
            rng.random_range(0..200_000),
            rng.random_range(0..5_000),
            rng.random_range(0..50_000),
            rng.random_range(1_167_609_600..1_640_995_200),
        );
        for _ in 0..rng.random_range(1..=3) {
            let at = rng.random_range(0..UNIVERSITIES.len());
            if let Some(university) = UNIVERSITIES.get(at) {
                user.add_university(university);
            }
        }
        users.push(user);
    }

    users
}

/// Lowercase handle of 4 to 15 characters
fn random_handle(rng: &mut impl Rng) -> String {
    let len = rng.random_range(4..=15);
    (0..len).map(|_| char::from(rng.random_range(b'a'..=b'z'))).collect()
}

/// Parses an id, accepting the scientific notation some exports use
fn parse_id(value: &str, line: usize) -> Result<u64, RecordError> {
    let invalid = || RecordError::InvalidNumber { line, field: "id", value: value.to_owned() };

    if let Ok(id) = value.parse::<u64>() {
        return Ok(id);
    }
    let float = value.parse::<f64>().map_err(|_| invalid())?;
    #[allow(clippy::cast_precision_loss)]
    let in_range = float.is_finite() && float >= 0.0 && float < u64::MAX as f64;
    if !in_range {
        return Err(invalid());
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let id = float as u64;
    Ok(id)
}

/// Parses one of the counter columns
fn parse_count(value: &str, field: &'static str, line: usize) -> Result<u32, RecordError> {
    value
        .parse()
        .map_err(|_| RecordError::InvalidNumber { line, field, value: value.to_owned() })
}

/// Parses `Www Mmm dd HH:MM:SS ±hhmm YYYY` into unix seconds
#[allow(clippy::arithmetic_side_effects)]
fn parse_timestamp(value: &str, line: usize) -> Result<i64, RecordError> {
    let invalid = || RecordError::InvalidTimestamp { line, value: value.to_owned() };

    let parts: Vec<&str> = value.split_whitespace().collect();
    let [_weekday, month, day, time, offset, year] = parts.as_slice() else {
        return Err(invalid());
    };

    let month = MONTHS.iter().position(|m| m == month).ok_or_else(invalid)?;
    let month = i64::try_from(month).map_err(|_| invalid())? + 1;
    let day: i64 = day.parse().map_err(|_| invalid())?;
    let year: i64 = year.parse().map_err(|_| invalid())?;

    let mut clock = time.split(':').map(|part| part.parse::<i64>());
    let (Some(Ok(hour)), Some(Ok(minute)), Some(Ok(second)), None) =
        (clock.next(), clock.next(), clock.next(), clock.next())
    else {
        return Err(invalid());
    };

    if !(1..=31).contains(&day)
        || !(0..24).contains(&hour)
        || !(0..60).contains(&minute)
        || !(0..=60).contains(&second)
        || !(0..=9999).contains(&year)
    {
        return Err(invalid());
    }

    let offset = parse_offset(offset).ok_or_else(invalid)?;
    let days = days_from_civil(year, month, day);
    Ok(days * 86_400 + hour * 3_600 + minute * 60 + second - offset)
}

/// Seconds east of UTC for a `±hhmm` offset
#[allow(clippy::arithmetic_side_effects)]
fn parse_offset(offset: &str) -> Option<i64> {
    let (sign, digits) = match offset.split_at_checked(1)? {
        ("+", digits) => (1, digits),
        ("-", digits) => (-1, digits),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hhmm: i64 = digits.parse().ok()?;
    Some(sign * ((hhmm / 100) * 3_600 + (hhmm % 100) * 60))
}

/// Days between 1970-01-01 and the given proleptic Gregorian date
#[allow(clippy::arithmetic_side_effects)]
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let year_of_era = year - era * 400;
    // March is month 0 so the leap day falls at the end of the year
    let month_from_march = (month + 9) % 12;
    let day_of_year = (153 * month_from_march + 2) / 5 + day - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
    era * 146_097 + day_of_era - 719_468
}

/// Proleptic Gregorian `(year, month, day)` of a day count since 1970-01-01
#[allow(clippy::arithmetic_side_effects)]
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let days = days + 719_468;
    let era = days.div_euclid(146_097);
    let day_of_era = days - era * 146_097;
    let year_of_era =
        (day_of_era - day_of_era / 1_460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let month_from_march = (5 * day_of_year + 2) / 153;
    let day = day_of_year - (153 * month_from_march + 2) / 5 + 1;
    let month = if month_from_march < 10 { month_from_march + 3 } else { month_from_march - 9 };
    let year = year_of_era + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
