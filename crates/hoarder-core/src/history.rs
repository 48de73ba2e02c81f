//! The date-keyed history of one source repository.
//!
//! [`History::merge`] is the single place the date-collision policy lives:
//! the last record written for a date wins, and it keeps the position of the
//! record it replaces.

use chrono::NaiveDate;

use crate::record::DailyRecord;

/// Ordered collection of [`DailyRecord`]s with at most one record per date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    records: Vec<DailyRecord>,
}

impl History {
    /// An empty history, used when the hoard has no file yet.
    pub const fn empty() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Upsert `record` by date.
    ///
    /// Replaces the existing record for the same date in place, otherwise
    /// appends.
    #[must_use]
    pub fn merge(mut self, record: DailyRecord) -> Self {
        match self.records.iter_mut().find(|r| r.date == record.date) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
        self
    }

    /// Records in storage order.
    pub fn records(&self) -> &[DailyRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up the record for `date`.
    pub fn get(&self, date: NaiveDate) -> Option<&DailyRecord> {
        self.records.iter().find(|r| r.date == date)
    }
}

impl FromIterator<DailyRecord> for History {
    /// Builds a history by merging each record in turn, so duplicate dates
    /// collapse to the last one.
    fn from_iter<I: IntoIterator<Item = DailyRecord>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::merge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(d: u32, views: u64) -> DailyRecord {
        DailyRecord {
            date: NaiveDate::from_ymd_opt(2024, 5, d).unwrap(),
            stargazers: 10,
            commits: 100,
            contributors: 3,
            traffic_views: views,
            traffic_uniques: 1,
            clones_count: 0,
            clones_uniques: 0,
        }
    }

    #[test]
    fn merge_appends_new_date() {
        let history = History::empty().merge(record(1, 5)).merge(record(2, 6));
        assert_eq!(history.len(), 2);
        assert_eq!(history.records()[1], record(2, 6));
    }

    #[test]
    fn merge_replaces_same_date_in_place() {
        let history = History::empty()
            .merge(record(1, 5))
            .merge(record(2, 6))
            .merge(record(3, 7))
            .merge(record(2, 99));

        assert_eq!(history.len(), 3);
        assert_eq!(history.records()[1], record(2, 99));
        assert_eq!(history.records()[2], record(3, 7));
    }

    #[test]
    fn merge_twice_keeps_one_record() {
        let base: History = (1..=4).map(|d| record(d, u64::from(d))).collect();
        for r in [record(2, 50), record(9, 50)] {
            let once = base.clone().merge(r.clone());
            let twice = once.clone().merge(r.clone());

            assert!(once.len() <= base.len() + 1);
            assert_eq!(twice, once);
            let matching: Vec<_> = twice.records().iter().filter(|x| x.date == r.date).collect();
            assert_eq!(matching, vec![&r]);
        }
    }

    #[test]
    fn from_iter_collapses_duplicates() {
        let history: History = [record(1, 1), record(1, 2)].into_iter().collect();
        assert_eq!(history.len(), 1);
        assert_eq!(
            history
                .get(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
                .map(|r| r.traffic_views),
            Some(2)
        );
    }

    #[test]
    fn empty_history_has_no_records() {
        let history = History::empty();
        assert!(history.is_empty());
        assert_eq!(history.len(), 0);
    }
}
