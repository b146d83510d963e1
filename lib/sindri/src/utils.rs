use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub fn is_truthy(value: &str) -> bool {
    let v = value.trim().to_ascii_lowercase();
    v == "1" || v == "true" || v == "yes" || v == "on"
}

/// `None` when the value does not parse.
pub fn parse_trimmed<T: FromStr>(value: &str) -> Option<T> {
    value.trim().parse::<T>().ok()
}

pub fn cpu_count() -> usize { num_cpus::get().max(1) }

/// Task panics are caught before they can cross a lock, so a poisoned guard is still consistent.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_values() {
        for v in ["1", "true", "YES", " on "] {
            assert!(is_truthy(v), "{v}");
        }
        for v in ["", "0", "false", "nope"] {
            assert!(!is_truthy(v), "{v}");
        }
    }

    #[test]
    fn parse_trimmed_ignores_garbage() {
        assert_eq!(parse_trimmed::<usize>(" 12\n"), Some(12));
        assert_eq!(parse_trimmed::<usize>("twelve"), None);
    }

    #[test]
    fn cpu_count_is_positive() {
        assert!(cpu_count() >= 1);
    }
}
