use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};

use super::config::RequestKind;
use super::error::{Error, Result};
use super::input::InputSet;
use super::invoker::Call;

/// Smallest batch sent by the batched request kind (before capping at the input size).
pub const BATCH_MIN: usize = 5;
/// Largest batch sent by the batched request kind.
pub const BATCH_MAX: usize = 15;

/// Per-worker view over the shared input set.
///
/// Worker `w` of `c` starts at `w % len` and moves `c` positions per call, so when
/// `c <= len` no two workers share a starting identifier and together they cover the
/// whole set over time.
#[derive(Debug)]
pub struct InputCursor {
    input: InputSet,
    position: usize,
    stride: usize,
    shape: Shape,
}

#[derive(Debug)]
enum Shape {
    AccountInfo,
    ProgramAccounts,
    Batch { rng: StdRng, buf: Vec<Arc<str>> },
}

impl InputCursor {
    /// Fails with [`Error::EmptyInput`] when there is nothing to cycle over.
    pub fn new(
        kind: RequestKind,
        input: InputSet,
        worker_id: u64,
        concurrency: u64,
    ) -> Result<Self> {
        Self::with_rng(kind, input, worker_id, concurrency, StdRng::from_entropy())
    }

    pub fn seeded(
        kind: RequestKind,
        input: InputSet,
        worker_id: u64,
        concurrency: u64,
        seed: u64,
    ) -> Result<Self> {
        Self::with_rng(
            kind,
            input,
            worker_id,
            concurrency,
            StdRng::seed_from_u64(seed),
        )
    }

    fn with_rng(
        kind: RequestKind,
        input: InputSet,
        worker_id: u64,
        concurrency: u64,
        rng: StdRng,
    ) -> Result<Self> {
        if input.is_empty() {
            return Err(Error::EmptyInput);
        }
        let len = input.len();
        let position = (worker_id % len as u64) as usize;
        let stride = (concurrency % len as u64) as usize;

        let shape = match kind {
            RequestKind::AccountInfo => Shape::AccountInfo,
            RequestKind::ProgramAccounts => Shape::ProgramAccounts,
            RequestKind::MultipleAccounts => Shape::Batch {
                rng,
                buf: Vec::with_capacity(BATCH_MAX),
            },
        };

        Ok(Self {
            input,
            position,
            stride,
            shape,
        })
    }

    /// Index of the identifier the next call starts from.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn next_call(&mut self) -> Call<'_> {
        let len = self.input.len();
        let start = self.position;
        self.position = (self.position + self.stride) % len;

        match &mut self.shape {
            Shape::AccountInfo => Call::AccountInfo {
                account: self.input.at(start),
            },
            Shape::ProgramAccounts => Call::ProgramAccounts {
                program: self.input.at(start),
            },
            Shape::Batch { rng, buf } => {
                let size = rng.gen_range(BATCH_MIN..=BATCH_MAX).min(len);
                buf.clear();
                buf.extend((0..size).map(|i| self.input.at(start + i).clone()));
                Call::MultipleAccounts { accounts: buf }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::collections::HashSet;

    fn starts(len: usize, concurrency: u64) -> Vec<usize> {
        let input = InputSet::new((0..len).map(|i| format!("A{i}")));
        (0..concurrency)
            .map(|w| {
                InputCursor::new(RequestKind::AccountInfo, input.clone(), w, concurrency)
                    .unwrap()
                    .position()
            })
            .collect()
    }

    #[test]
    fn distinct_start_indices_when_concurrency_fits() {
        for (len, c) in [(3, 3), (10, 4), (7, 1), (5, 5)] {
            let got = starts(len, c);
            let unique: HashSet<usize> = got.iter().copied().collect();
            assert_eq!(unique.len(), c as usize, "len={len} c={c} starts={got:?}");
        }
    }

    #[test]
    fn shared_start_indices_when_concurrency_exceeds_input() {
        assert_eq!(starts(2, 5), vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn single_cursor_strides_by_concurrency() {
        let input = InputSet::new(["A", "B", "C", "D", "E"]);
        let mut cursor = InputCursor::new(RequestKind::AccountInfo, input, 1, 2).unwrap();

        let mut seen = Vec::new();
        for _ in 0..5 {
            match cursor.next_call() {
                Call::AccountInfo { account } => seen.push(account.to_string()),
                other => panic!("unexpected call {other:?}"),
            }
        }
        assert_eq!(seen, vec!["B", "D", "A", "C", "E"]);
    }

    #[test]
    fn empty_input_has_no_cursor() {
        for kind in [
            RequestKind::AccountInfo,
            RequestKind::MultipleAccounts,
            RequestKind::ProgramAccounts,
        ] {
            let input = InputSet::new(Vec::<String>::new());
            assert!(matches!(
                InputCursor::new(kind, input, 0, 1),
                Err(Error::EmptyInput)
            ));
        }
    }

    #[test]
    fn program_kind_yields_program_calls() {
        let input = InputSet::new(["P1"]);
        let mut cursor = InputCursor::new(RequestKind::ProgramAccounts, input, 0, 1).unwrap();
        assert_eq!(cursor.next_call(), Call::ProgramAccounts { program: "P1" });
    }

    #[test]
    fn batches_stay_in_range_and_rotate() {
        let input = InputSet::new((0..40).map(|i| format!("A{i}")));
        let mut cursor =
            InputCursor::seeded(RequestKind::MultipleAccounts, input, 3, 4, 7).unwrap();

        let mut firsts = Vec::new();
        for _ in 0..50 {
            match cursor.next_call() {
                Call::MultipleAccounts { accounts } => {
                    assert!((BATCH_MIN..=BATCH_MAX).contains(&accounts.len()));
                    firsts.push(accounts[0].to_string());
                }
                other => panic!("unexpected call {other:?}"),
            }
        }
        assert_eq!(firsts[0], "A3");
        assert_eq!(firsts[1], "A7");
    }

    #[test]
    fn batches_are_capped_at_input_size_without_repeats() {
        let input = InputSet::new(["A", "B", "C"]);
        let mut cursor =
            InputCursor::new(RequestKind::MultipleAccounts, input, 1, 1).unwrap();
        match cursor.next_call() {
            Call::MultipleAccounts { accounts } => {
                let got: Vec<&str> = accounts.iter().map(|s| &**s).collect();
                assert_eq!(got, vec!["B", "C", "A"]);
            }
            other => panic!("unexpected call {other:?}"),
        }
    }
}
