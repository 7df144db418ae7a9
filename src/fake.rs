// Fabricated values for mock billing rows
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::{Rng, SeedableRng, rngs::SmallRng, seq::IndexedRandom};
use serde_json::{Map, Value};

use crate::focus::TIMESTAMP_FORMAT;

const COMPANY_STEMS: [&str; 16] = [
    "Acme", "Globex", "Initech", "Umbrella", "Hooli", "Vandelay", "Stark", "Wayne",
    "Cyberdyne", "Tyrell", "Soylent", "Wonka", "Gringotts", "Oscorp", "Aperture", "Massive",
];
const COMPANY_SUFFIXES: [&str; 6] = ["Inc", "LLC", "Group", "and Sons", "Ltd", "PLC"];

const WORDS: [&str; 32] = [
    "alpha", "bucket", "cluster", "daily", "edge", "flow", "gateway", "host",
    "index", "job", "kernel", "ledger", "metric", "node", "origin", "pool",
    "queue", "replica", "shard", "tenant", "usage", "volume", "worker", "zone",
    "backup", "cache", "stream", "table", "batch", "engine", "proxy", "vault",
];

const CITIES: [&str; 10] = [
    "Ashburn", "Portland", "Frankfurt", "Dublin", "Singapore",
    "Tokyo", "Sydney", "Sao Paulo", "Mumbai", "Montreal",
];

const JOB_DESCRIPTORS: [&str; 8] = [
    "Lead", "Senior", "Direct", "Corporate", "Dynamic", "Future", "Product", "Regional",
];

/// Fake value source over a caller-supplied RNG.
pub struct Faker<'a, R: Rng> {
    rng: &'a mut R,
}

impl<'a, R: Rng> Faker<'a, R> {
    pub fn new(rng: &'a mut R) -> Self {
        Faker { rng }
    }

    pub fn element<'b>(&mut self, elements: &[&'b str]) -> &'b str {
        elements.choose(self.rng).copied().unwrap_or_default()
    }

    pub fn company(&mut self) -> String {
        let stem = self.element(&COMPANY_STEMS);
        let suffix = self.element(&COMPANY_SUFFIXES);
        format!("{stem} {suffix}")
    }

    pub fn word(&mut self) -> &'static str {
        self.element(&WORDS)
    }

    pub fn sentence(&mut self, words: usize) -> String {
        let mut s = (0..words.max(1))
            .map(|_| self.word())
            .collect::<Vec<_>>()
            .join(" ");
        if let Some(first) = s.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        s.push('.');
        s
    }

    pub fn city(&mut self) -> &'static str {
        self.element(&CITIES)
    }

    pub fn job_descriptor(&mut self) -> &'static str {
        self.element(&JOB_DESCRIPTORS)
    }

    /// Fixed-width digit string with a non-zero leading digit.
    pub fn digits(&mut self, len: usize) -> String {
        (0..len.max(1))
            .map(|i| {
                let d = if i == 0 {
                    self.rng.random_range(1..10u8)
                } else {
                    self.rng.random_range(0..10u8)
                };
                char::from(b'0' + d)
            })
            .collect()
    }

    pub fn uuid(&mut self) -> String {
        uuid::Builder::from_random_bytes(self.rng.random())
            .into_uuid()
            .to_string()
    }

    /// Uniform value in `[low, high)` rendered with `places` decimals.
    pub fn amount(&mut self, low: f64, high: f64, places: usize) -> String {
        let v: f64 = self.rng.random_range(low..high);
        format!("{v:.places$}")
    }

    pub fn date_time_in_year(&mut self, year: i32) -> String {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        let days = if NaiveDate::from_ymd_opt(year, 2, 29).is_some() { 366 } else { 365 };
        let offset = self.rng.random_range(0..days * 86_400);

        timestamp(start + Duration::seconds(offset))
    }

    /// Small JSON object of tag key/value pairs.
    pub fn tags(&mut self) -> String {
        let n = self.rng.random_range(1..=4);
        let mut map = Map::new();
        for _ in 0..n {
            let key = self.word().to_string();
            let value = Value::String(self.word().to_string());
            map.insert(key, value);
        }
        Value::Object(map).to_string()
    }
}

/// RNG for one run: fixed by `seed`, or drawn from OS entropy when unset.
pub fn seeded_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    }
}

pub fn timestamp(t: NaiveDateTime) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_have_fixed_width() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut fake = Faker::new(&mut rng);
        let id = fake.digits(13);

        assert_eq!(id.len(), 13);
        assert!(id.chars().all(|c| c.is_ascii_digit()));
        assert_ne!(id.chars().next(), Some('0'));
    }

    #[test]
    fn values_parse_back() {
        let mut rng = SmallRng::seed_from_u64(11);
        let mut fake = Faker::new(&mut rng);

        let ts = fake.date_time_in_year(2024);
        assert!(ts.starts_with("2024-"));
        assert!(NaiveDateTime::parse_from_str(&ts, TIMESTAMP_FORMAT).is_ok());

        let tags: Value = serde_json::from_str(&fake.tags()).unwrap();
        assert!(tags.is_object());

        assert_eq!(fake.uuid().len(), 36);
        let cost: f64 = fake.amount(0.0, 1.0, 10).parse().unwrap();
        assert!((0.0..1.0).contains(&cost));
    }

    #[test]
    fn sentences_are_capitalized() {
        let mut rng = SmallRng::seed_from_u64(2);
        let s = Faker::new(&mut rng).sentence(6);

        assert_eq!(s.split(' ').count(), 6);
        assert!(s.ends_with('.'));
        assert!(s.chars().next().unwrap().is_ascii_uppercase());
    }
}
