use std::collections::{HashMap, VecDeque};

use crate::request::{Attempt, RequestSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryVerdict {
    /// Budget was left; the spec is back at the end of the queue.
    Requeued { next_attempt: u32 },
    /// No budget left; the spec is now terminal.
    Exhausted { attempts: u32 },
}

#[derive(Debug)]
struct Entry {
    retries_left: u32,
    attempts: u32,
    terminal: bool,
}

/// Worklist and retry bookkeeping for one run. Keyed by URL.
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<RequestSpec>,
    entries: HashMap<String, Entry>,
    admitted: usize,
    skipped: usize,
}

impl Frontier {
    /// Admits at most `max_requests` distinct URLs (0 = no limit) in input
    /// order. Repeated URLs are dropped.
    pub fn new<I>(requests: I, max_requests: usize, max_retries: u32) -> Self
    where
        I: IntoIterator<Item = RequestSpec>,
    {
        let mut queue = VecDeque::new();
        let mut entries = HashMap::new();
        let mut skipped = 0;
        for spec in requests {
            if entries.contains_key(spec.url()) {
                tracing::debug!(url = spec.url(), "dropping duplicate request");
                continue;
            }
            if max_requests > 0 && entries.len() >= max_requests {
                skipped += 1;
                continue;
            }
            entries.insert(
                spec.url().to_string(),
                Entry {
                    retries_left: max_retries,
                    attempts: 0,
                    terminal: false,
                },
            );
            queue.push_back(spec);
        }
        if skipped > 0 {
            tracing::info!(skipped, max_requests, "request limit reached, ignoring the rest");
        }
        let admitted = entries.len();
        Self {
            queue,
            entries,
            admitted,
            skipped,
        }
    }

    /// Pops the next runnable spec and records the attempt.
    pub fn take_next(&mut self) -> Option<Attempt> {
        while let Some(spec) = self.queue.pop_front() {
            let Some(entry) = self.entries.get_mut(spec.url()) else {
                continue;
            };
            if entry.terminal {
                continue;
            }
            let attempt_number = entry.attempts;
            entry.attempts += 1;
            return Some(Attempt::new(spec, attempt_number));
        }
        None
    }

    /// Books a retryable failure for `attempt`.
    pub fn retry(&mut self, attempt: &Attempt) -> RetryVerdict {
        let Some(entry) = self.entries.get_mut(attempt.url()) else {
            return RetryVerdict::Exhausted {
                attempts: attempt.attempt_number + 1,
            };
        };
        if entry.retries_left > 0 && !entry.terminal {
            entry.retries_left -= 1;
            let next_attempt = entry.attempts;
            self.queue.push_back(attempt.spec.clone());
            RetryVerdict::Requeued { next_attempt }
        } else {
            entry.terminal = true;
            RetryVerdict::Exhausted {
                attempts: entry.attempts,
            }
        }
    }

    /// Returns false if the spec was already terminal.
    pub fn mark_terminal(&mut self, url: &str) -> bool {
        match self.entries.get_mut(url) {
            Some(entry) if !entry.terminal => {
                entry.terminal = true;
                true
            }
            _ => false,
        }
    }

    pub fn attempts(&self, url: &str) -> u32 {
        self.entries.get(url).map(|e| e.attempts).unwrap_or(0)
    }

    pub fn retries_left(&self, url: &str) -> Option<u32> {
        self.entries.get(url).map(|e| e.retries_left)
    }

    pub fn admitted(&self) -> usize {
        self.admitted
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn completed(&self) -> usize {
        self.entries.values().filter(|e| e.terminal).count()
    }

    /// Specs that were admitted but never reached a terminal outcome.
    pub fn pending(&self) -> usize {
        self.admitted - self.completed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(urls: &[&str]) -> Vec<RequestSpec> {
        urls.iter().map(|u| RequestSpec::get(*u)).collect()
    }

    #[test]
    fn admits_at_most_max_requests() {
        let mut frontier = Frontier::new(specs(&["a", "b", "c", "d"]), 2, 0);
        assert_eq!(frontier.admitted(), 2);
        assert_eq!(frontier.skipped(), 2);
        assert_eq!(frontier.take_next().unwrap().url(), "a");
        assert_eq!(frontier.take_next().unwrap().url(), "b");
        assert!(frontier.take_next().is_none());
    }

    #[test]
    fn zero_max_requests_means_unlimited() {
        let frontier = Frontier::new(specs(&["a", "b", "c"]), 0, 0);
        assert_eq!(frontier.admitted(), 3);
        assert_eq!(frontier.skipped(), 0);
    }

    #[test]
    fn duplicate_urls_are_admitted_once() {
        let mut frontier = Frontier::new(specs(&["a", "a", "b"]), 2, 0);
        assert_eq!(frontier.admitted(), 2);
        assert_eq!(frontier.skipped(), 0);
        assert_eq!(frontier.take_next().unwrap().url(), "a");
        assert_eq!(frontier.take_next().unwrap().url(), "b");
        assert!(frontier.take_next().is_none());
    }

    #[test]
    fn retried_spec_goes_to_the_back() {
        let mut frontier = Frontier::new(specs(&["a", "b"]), 0, 1);
        let a = frontier.take_next().unwrap();
        assert_eq!(a.attempt_number, 0);
        assert_eq!(
            frontier.retry(&a),
            RetryVerdict::Requeued { next_attempt: 1 }
        );
        assert_eq!(frontier.retries_left("a"), Some(0));

        assert_eq!(frontier.take_next().unwrap().url(), "b");
        let a = frontier.take_next().unwrap();
        assert_eq!(a.url(), "a");
        assert_eq!(a.attempt_number, 1);
    }

    #[test]
    fn budget_allows_max_retries_plus_one_attempts() {
        let mut frontier = Frontier::new(specs(&["a"]), 0, 2);
        let mut verdicts = Vec::new();
        while let Some(attempt) = frontier.take_next() {
            verdicts.push(frontier.retry(&attempt));
        }
        assert_eq!(frontier.attempts("a"), 3);
        assert_eq!(
            verdicts.last(),
            Some(&RetryVerdict::Exhausted { attempts: 3 })
        );
        assert_eq!(frontier.completed(), 1);
        assert_eq!(frontier.pending(), 0);
    }

    #[test]
    fn no_retries_means_single_attempt() {
        let mut frontier = Frontier::new(specs(&["a"]), 0, 0);
        let a = frontier.take_next().unwrap();
        assert_eq!(frontier.retry(&a), RetryVerdict::Exhausted { attempts: 1 });
        assert!(frontier.take_next().is_none());
    }

    #[test]
    fn terminal_outcome_is_recorded_once() {
        let mut frontier = Frontier::new(specs(&["a"]), 0, 3);
        let a = frontier.take_next().unwrap();
        assert!(frontier.mark_terminal(a.url()));
        assert!(!frontier.mark_terminal("a"));
        assert!(!frontier.mark_terminal("unknown"));
        assert_eq!(frontier.retries_left("a"), Some(3));
    }
}
